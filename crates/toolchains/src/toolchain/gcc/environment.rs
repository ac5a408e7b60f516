use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use itertools::Itertools;
use snafu::prelude::*;

use super::{
    recipe::mingw_helper_prefixes,
    GccLayout,
    LibgccIncludeNotFoundSnafu,
    Library,
    LibraryNotFoundSnafu,
    PythonDllAmbiguousSnafu,
    PythonDllNotFoundSnafu,
};
use crate::{
    shell::{CopyOptions, DirGuard, RunOptions},
    toolchain::{compress, ldscript},
    Directories,
    Shell,
    ToolchainType,
    Triplet,
};

/// Directories of glibc that are useless inside a toolchain.
const UNUSED_GLIBC_DIRS: [&str; 7] = ["etc", "libexec", "sbin", "share", "var", "lib/gconv", "lib/audit"];

/// A [`GccLayout`] bound to resolved source trees and registered on `PATH`.
#[derive(Debug)]
pub struct GccEnvironment {
    layout: GccLayout,
    directories: Directories,
    jobs: usize,
    compress_level: u8,
    lib_dirs: IndexMap<Library, Utf8PathBuf>,
}

impl GccEnvironment {
    /// Resolves the source tree of every library and puts the toolchains this one
    /// depends on, then itself, on the shell's `PATH`.
    ///
    /// Only `required` libraries must exist. Glibc and Linux prefer a
    /// `home/{lib}-{vendor}` tree when the target names a vendor.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(shell, directories)))]
    pub fn new(
        shell: &Shell,
        layout: GccLayout,
        directories: Directories,
        jobs: usize,
        compress_level: u8,
        required: &[Library],
    ) -> Result<Self, super::Error> {
        let target = layout.target.normalize();
        let mut lib_dirs = IndexMap::new();
        for library in Library::ALL {
            let required = required.contains(&library);
            let lib_dir = resolve_library(shell, &directories, &target, library, required)?;
            lib_dirs.insert(library, lib_dir);
        }
        for toolchain in layout.chain() {
            toolchain.register_in_env(shell);
        }
        Ok(Self {
            layout,
            directories,
            jobs,
            compress_level,
            lib_dirs,
        })
    }

    #[must_use]
    pub fn layout(&self) -> &GccLayout {
        &self.layout
    }

    #[must_use]
    pub fn directories(&self) -> &Directories {
        &self.directories
    }

    #[must_use]
    pub fn lib_dir(&self, library: Library) -> Utf8PathBuf {
        self.lib_dirs
            .get(&library)
            .cloned()
            .unwrap_or_else(|| self.directories.source_dir(library.name()))
    }

    /// Enters the build directory of `library`, recreating it when `remove` is set.
    pub fn enter_build_dir<'s>(
        &self,
        shell: &'s Shell,
        library: Library,
        remove: bool,
    ) -> Result<DirGuard<'s>, super::Error> {
        let source_dir = self.lib_dir(library);
        let guard = match library.build_dir(&source_dir) {
            Some(build_dir) => {
                shell.mkdir(&build_dir, remove)?;
                shell.enter(&build_dir)?
            },
            None => shell.enter(&source_dir)?,
        };
        if library == Library::Binutils {
            shell.set_env("ORIGIN", "$$ORIGIN");
            shell.set_env("PYTHON_EMBED_PACKAGE", self.lib_dir(Library::PythonEmbed).as_str());
        }
        Ok(guard)
    }

    /// `LD_LIBRARY_PATH` is cleared since glibc refuses to configure with the
    /// current directory in it.
    pub fn configure(&self, shell: &Shell, options: &[&str]) -> Result<(), super::Error> {
        let command = ["../configure", shell.quiet().command_option()]
            .into_iter()
            .chain(options.iter().copied())
            .chain(["LD_LIBRARY_PATH="])
            .filter(|part| !part.is_empty())
            .join(" ");
        shell.run(&command)?;
        Ok(())
    }

    pub fn make(&self, shell: &Shell, targets: &[&str]) -> Result<(), super::Error> {
        shell.run(&self.make_command(shell, targets))?;
        Ok(())
    }

    /// Installs `targets`, `install-strip` when empty.
    pub fn install(&self, shell: &Shell, targets: &[&str]) -> Result<(), super::Error> {
        let targets: &[&str] = if targets.is_empty() { &["install-strip"] } else { targets };
        shell.run(&self.make_command(shell, targets))?;
        Ok(())
    }

    /// Like [`GccEnvironment::install`] but a failing install only warns.
    pub fn install_ignore_errors(&self, shell: &Shell, targets: &[&str]) -> Result<(), super::Error> {
        shell.run_with(&self.make_command(shell, targets), RunOptions::default().ignore_errors())?;
        Ok(())
    }

    fn make_command(&self, shell: &Shell, targets: &[&str]) -> String {
        let jobs = self.jobs.to_string();
        let command = ["make", shell.quiet().command_option()]
            .into_iter()
            .chain(targets.iter().copied())
            .chain(["-j", jobs.as_str()])
            .filter(|part| !part.is_empty())
            .join(" ");
        command
    }

    /// Trims, strips and relinks a freshly installed glibc.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, shell)))]
    pub fn adjust_glibc(&self, shell: &Shell, arch: Option<&str>) -> Result<(), super::Error> {
        let lib_prefix = &self.layout.lib_prefix;
        for dir in UNUSED_GLIBC_DIRS {
            shell.remove_if_exists(&lib_prefix.join(dir))?;
        }

        let lib_dir = lib_prefix.join("lib");
        let strip = format!("{}strip {}", self.layout.tool_prefix, lib_dir.join("*.so.*"));
        shell.run_with(&strip, RunOptions::default().ignore_errors())?;

        let arch = arch.unwrap_or_else(|| self.layout.target.arch());
        ldscript::install(shell, self.directories.script_dir(), arch, &lib_dir)?;

        let libmvec = lib_dir.join("libmvec_nonshared.a");
        if !shell.exists(&libmvec) {
            shell.symlink_if_exists(Utf8Path::new("libmvec.a"), &libmvec)?;
        }
        Ok(())
    }

    /// Works around libgcc's `limits.h` defining a too small `MB_LEN_MAX`.
    pub fn solve_libgcc_limits(&self, shell: &Shell) -> Result<(), super::Error> {
        let libgcc_prefix = self.layout.prefix.join("lib").join("gcc").join(self.layout.target.as_str());
        let Some(version_dir) = shell.read_dir(&libgcc_prefix)?.into_iter().next() else {
            ensure!(shell.dry_run(), LibgccIncludeNotFoundSnafu { dir: libgcc_prefix });
            return Ok(());
        };
        let limits = version_dir.join("include").join("limits.h");
        shell.append_file(&limits, "#undef MB_LEN_MAX\n#define MB_LEN_MAX 16\n")?;
        Ok(())
    }

    /// Copies the C library, libstdc++, kernel headers and libgcc from the cross
    /// toolchain for the same target. Returns whether gdbserver was copied too.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, shell)))]
    pub fn copy_from_other_toolchain(&self, shell: &Shell, need_gdbserver: bool) -> Result<bool, super::Error> {
        let toolchain = self.layout.build_hosted(&self.layout.target);
        if !shell.dry_run() && !shell.exists(&toolchain.lib_prefix) {
            shell.warning(&format!(
                "Cannot find toolchain \"{}\", nothing is copied from it.",
                toolchain.prefix
            ))?;
            return Ok(false);
        }
        for entry in shell.read_dir(&toolchain.lib_prefix)? {
            let Some(name) = entry.file_name() else { continue };
            if name != "bin" {
                shell.copy(&entry, &self.layout.lib_prefix.join(name))?;
            }
        }
        shell.copy_if_exists(
            &toolchain.prefix.join("lib").join("gcc"),
            &self.layout.prefix.join("lib").join("gcc"),
            CopyOptions::default(),
        )?;

        if !need_gdbserver {
            return Ok(false);
        }
        let gdbserver = if self.layout.target.os() == "linux" { "gdbserver" } else { "gdbserver.exe" };
        let copied = shell.copy_if_exists(
            &toolchain.bin_dir.join(gdbserver),
            &self.layout.bin_dir.join(gdbserver),
            CopyOptions::default(),
        )?;
        if !copied {
            shell.warning(&format!("Cannot find {gdbserver} in \"{}\", build it instead.", toolchain.bin_dir))?;
        }
        Ok(copied)
    }

    /// Copies the libstdc++ pretty printers from the native toolchain.
    pub fn copy_pretty_printer(&self, shell: &Shell) -> Result<(), super::Error> {
        let native = self.layout.native();
        let printer =
            if shell.exists(&native.share_dir) {
                shell.read_dir(&native.share_dir)?.into_iter().find(|dir| {
                    dir.file_name().is_some_and(|name| name.starts_with("gcc")) && dir.is_dir()
                })
            } else {
                None
            };
        match printer {
            Some(src) => {
                let name = src.file_name().unwrap_or("gcc");
                shell.copy(&src, &self.layout.share_dir.join(name))?;
            },
            None => shell.warning(&format!(
                "Cannot find pretty printers in \"{}\", skip copying them.",
                native.share_dir
            ))?,
        }
        Ok(())
    }

    /// Copies the shared runtime a cross-compiled gdb needs from the toolchain
    /// built for its host.
    pub fn copy_gdb_runtime(&self, shell: &Shell) -> Result<(), super::Error> {
        let host_gcc = self.layout.build_hosted(&self.layout.host);
        if self.layout.host.os() == "linux" {
            let follow = CopyOptions {
                follow_symlinks: true,
                ..CopyOptions::default()
            };
            for dll in ["libstdc++.so.6", "libgcc_s.so.1"] {
                shell.copy_with(&host_gcc.rpath_dir.join(dll), &self.layout.rpath_dir.join(dll), follow)?;
            }
        } else {
            for dll in ["libstdc++-6.dll", "libgcc_s_seh-1.dll"] {
                shell.copy(&host_gcc.lib_prefix.join("lib").join(dll), &self.layout.bin_dir.join(dll))?;
            }
        }
        Ok(())
    }

    /// Generates `libpython.a` from the embeddable package's `python*.dll`.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, shell)))]
    pub fn build_libpython(&self, shell: &Shell) -> Result<(), super::Error> {
        let lib_dir = self.lib_dir(Library::PythonEmbed);
        let lib_path = lib_dir.join("libpython.a");
        let def_path = lib_dir.join("libpython.def");
        if shell.exists(&lib_path) {
            return Ok(());
        }
        let dlls = shell
            .read_dir(&lib_dir)?
            .into_iter()
            .filter(|path| {
                path.file_name()
                    .is_some_and(|name| name.starts_with("python") && name.ends_with(".dll"))
            })
            .collect::<Vec<_>>();
        let dll = match dlls.as_slice() {
            [dll] => dll,
            [] if shell.dry_run() => {
                shell.note(&format!("Skip creating {lib_path} for dry run."))?;
                return Ok(());
            },
            [] => return PythonDllNotFoundSnafu { dir: lib_dir }.fail(),
            _ => {
                return PythonDllAmbiguousSnafu {
                    dir: lib_dir,
                    count: dlls.len(),
                }
                .fail()
            },
        };
        let host = &self.layout.host;
        shell.run(&format!("{host}-pexports {dll} > {def_path}"))?;
        shell.run(&format!("{host}-dlltool -D {dll} -d {def_path} -l {lib_path}"))?;
        Ok(())
    }

    /// Builds the static gmp, expat and mpfr gdb links against on mingw hosts.
    /// A library whose `.host` marker names this host is reused.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, shell)))]
    pub fn build_mingw_gdb_requirements(&self, shell: &Shell) -> Result<(), super::Error> {
        let prefixes = mingw_helper_prefixes(&self.directories);
        let gmp_prefix = prefixes[0].1.clone();
        let host = self.layout.host.as_str();
        for (library, prefix) in prefixes {
            let host_file = prefix.join(".host");
            if shell.read_to_string(&host_file).as_deref() == Some(host) {
                shell.note(&format!("{library} for {host} is already built, skip it."))?;
                continue;
            }
            let _dir = self.enter_build_dir(shell, library, true)?;
            let host_option = format!("--host={host}");
            let prefix_option = format!("--prefix={prefix}");
            let gmp_option = format!("--with-gmp={gmp_prefix}");
            let mut options = vec![host_option.as_str(), "--disable-shared", "--enable-static", prefix_option.as_str()];
            if library == Library::Mpfr {
                options.push(gmp_option.as_str());
            }
            options.extend(["CFLAGS=\"-O3 -std=c11\"", "CXXFLAGS=\"-O3\""]);
            self.configure(shell, &options)?;
            self.make(shell, &[])?;
            self.install(shell, &[])?;
            shell.write_file(&host_file, host)?;
        }
        Ok(())
    }

    pub fn copy_gdbinit(&self, shell: &Shell) -> Result<(), super::Error> {
        shell.copy(&self.directories.script_dir().join(".gdbinit"), &self.layout.gdbinit_path)?;
        Ok(())
    }

    pub fn copy_python_embed_package(&self, shell: &Shell) -> Result<(), super::Error> {
        for file in shell.read_dir(&self.lib_dir(Library::PythonEmbed))? {
            let Some(name) = file.file_name() else { continue };
            if name.starts_with("python") {
                shell.copy(&file, &self.layout.bin_dir.join(name))?;
            }
        }
        Ok(())
    }

    /// Finishes the install tree and packs it into `{name}.tar.zst`.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, shell)))]
    pub fn package(&self, shell: &Shell, gdbinit: bool, python_embed_package: bool) -> Result<(), super::Error> {
        if self.layout.toolchain_type.contains(ToolchainType::NATIVE) {
            shell.symlink(Utf8Path::new("gcc"), &self.layout.bin_dir.join("cc"), true)?;
        }
        if gdbinit {
            self.copy_gdbinit(shell)?;
        }
        if python_embed_package {
            self.copy_python_embed_package(shell)?;
        }
        compress(
            shell,
            &self.layout.prefix_dir,
            &self.layout.name,
            self.compress_level,
            self.jobs,
        )?;
        Ok(())
    }
}

fn resolve_library(
    shell: &Shell,
    directories: &Directories,
    target: &Triplet,
    library: Library,
    required: bool,
) -> Result<Utf8PathBuf, super::Error> {
    let common_dir = directories.source_dir(library.name());
    if library.vendor_specific() && target.vendor() != "unknown" {
        let vendor_dir = directories.source_dir(&format!("{library}-{}", target.vendor()));
        if shell.exists(&vendor_dir) {
            shell.info(&format!("Checking {library} in \"{vendor_dir}\" ... yes"))?;
            return Ok(vendor_dir);
        }
        if required {
            shell.warning(&format!(
                "Cannot find custom lib \"{library}\" in \"{vendor_dir}\", fallback to use common lib."
            ))?;
        }
    }
    if required {
        check_library(shell, library, &common_dir)?;
    }
    Ok(common_dir)
}

/// A missing tree is fatal unless the run is a dry run.
fn check_library(shell: &Shell, library: Library, path: &Utf8Path) -> Result<(), super::Error> {
    if shell.exists(path) {
        shell.info(&format!("Checking {library} in \"{path}\" ... yes"))?;
        return Ok(());
    }
    ensure!(
        shell.dry_run(),
        LibraryNotFoundSnafu {
            library,
            path
        }
    );
    shell.note(&format!("Checking {library} in \"{path}\" ... skip for dry run"))?;
    Ok(())
}
