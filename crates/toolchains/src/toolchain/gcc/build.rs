use camino::Utf8PathBuf;

use super::{BuildFlags, GccEnvironment, GccLayout, Library, Recipe, RecipeOptions};
use crate::{
    config::GccConfig,
    toolchain::{
        modifier,
        platform::{self, PlatformRole},
    },
    Directories,
    Shell,
    ToolchainType,
    Triplet,
};

/// Concatenates option lists and literal extras into configure arguments.
fn options<'a>(lists: &[&'a Vec<String>], extra: &[&'a str]) -> Vec<&'a str> {
    lists
        .iter()
        .flat_map(|list| list.iter().map(String::as_str))
        .chain(extra.iter().copied())
        .collect()
}

/// Builds one GCC toolchain with the recipe its topology calls for.
///
/// Every check that can reject the request runs in [`GccBuild::new`], so a
/// constructed build issues no command before it is known to be valid.
#[derive(Debug)]
pub struct GccBuild<'s> {
    shell: &'s Shell,
    env: GccEnvironment,
    options: RecipeOptions,
    recipe: Recipe,
    flags: BuildFlags,
    glibc_arch: Option<&'static str>,
}

impl<'s> GccBuild<'s> {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(shell, directories)))]
    pub fn new(
        shell: &'s Shell,
        directories: &Directories,
        config: &GccConfig,
        build: &Triplet,
        host: &Triplet,
        target: &Triplet,
    ) -> Result<Self, super::Error> {
        platform::check_supported(host, PlatformRole::Host)?;
        platform::check_supported(target, PlatformRole::Target)?;

        let flags = config.flags();
        let layout = GccLayout::new(build, host, target, directories.prefix_dir());
        let mut options = RecipeOptions::new(&layout, directories, flags)?;
        let modifier = modifier::lookup(target);
        if let Some(modifier) = modifier {
            options.apply(modifier);
        }
        let recipe = Recipe::select(&layout)?;
        let libraries = recipe.libraries(&layout, flags);

        shell.info(&format!("Building {}: {} ({recipe}).", layout.toolchain_type, layout.name))?;
        let env = GccEnvironment::new(
            shell,
            layout,
            directories.clone(),
            config.build_config.jobs,
            config.build_config.compress_level,
            &libraries,
        )?;
        Ok(Self {
            shell,
            env,
            options,
            recipe,
            flags,
            glibc_arch: modifier.and_then(|modifier| modifier.glibc_arch),
        })
    }

    #[must_use]
    pub fn recipe(&self) -> Recipe {
        self.recipe
    }

    #[must_use]
    pub fn options(&self) -> &RecipeOptions {
        &self.options
    }

    #[must_use]
    pub fn environment(&self) -> &GccEnvironment {
        &self.env
    }

    fn layout(&self) -> &GccLayout {
        self.env.layout()
    }

    fn host_is_mingw(&self) -> bool {
        self.layout().host.os() == "w64"
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub fn build(&self) -> Result<(), super::Error> {
        if self.flags.gdb && self.host_is_mingw() {
            self.env.build_mingw_gdb_requirements(self.shell)?;
            self.env.build_libpython(self.shell)?;
        }
        match self.recipe {
            Recipe::NativeLinux => self.native_build_linux()?,
            Recipe::FullBuildLinux => self.full_build_linux()?,
            Recipe::FullBuildMingw => self.full_build_mingw()?,
            Recipe::FullBuildFreestanding => self.full_build_freestanding()?,
            Recipe::PartialBuild => self.partial_build()?,
        }
        self.shell.success(&format!("Build {} successfully.", self.layout().name))?;
        Ok(())
    }

    /// Configures, makes and installs `library` in a fresh build directory.
    fn step(&self, library: Library, configure: &[&str], make: &[&str], install: &[&str]) -> Result<(), super::Error> {
        let _dir = self.env.enter_build_dir(self.shell, library, true)?;
        self.env.configure(self.shell, configure)?;
        self.env.make(self.shell, make)?;
        self.env.install(self.shell, install)
    }

    fn build_binutils(&self) -> Result<(), super::Error> {
        let o = &self.options;
        self.step(Library::Binutils, &options(&[&o.basic, &o.gdb], &[]), &[], &[])
    }

    fn install_linux_headers(&self) -> Result<(), super::Error> {
        let _dir = self.env.enter_build_dir(self.shell, Library::Linux, true)?;
        self.env.make(self.shell, &options(&[&self.options.linux], &[]))
    }

    fn build_glibc(&self) -> Result<(), super::Error> {
        self.step(Library::Glibc, &options(&[&self.options.libc], &[]), &[], &["install"])?;
        self.env.adjust_glibc(self.shell, self.glibc_arch)
    }

    fn build_full_gcc(&self) -> Result<(), super::Error> {
        let o = &self.options;
        self.step(Library::Gcc, &options(&[&o.basic, &o.gcc], &[]), &[], &[])
    }

    fn native_build_linux(&self) -> Result<(), super::Error> {
        self.build_full_gcc()?;
        self.install_linux_headers()?;
        self.build_glibc()?;
        self.build_binutils()?;
        self.after_build_gcc(true)
    }

    fn full_build_linux(&self) -> Result<(), super::Error> {
        let o = &self.options;
        self.build_binutils()?;
        self.step(
            Library::Gcc,
            &options(&[&o.basic, &o.gcc], &["--disable-shared"]),
            &["all-gcc"],
            &["install-strip-gcc"],
        )?;
        self.install_linux_headers()?;

        {
            let _dir = self.env.enter_build_dir(self.shell, Library::Glibc, true)?;
            self.env
                .configure(self.shell, &options(&[&o.libc], &["libc_cv_forced_unwind=yes"]))?;
            self.env.make(self.shell, &["install-headers"])?;
            // Written directly instead of with mknod so no device node is needed.
            self.shell.write_file(&self.glibc_phony_stubs_path(), "")?;
        }

        {
            let _dir = self.env.enter_build_dir(self.shell, Library::Gcc, false)?;
            self.env.make(self.shell, &["all-target-libgcc"])?;
            self.env.install(self.shell, &["install-target-libgcc"])?;
        }

        self.build_glibc()?;
        self.build_full_gcc()?;
        self.after_build_gcc(false)
    }

    fn full_build_mingw(&self) -> Result<(), super::Error> {
        let o = &self.options;
        self.build_binutils()?;
        self.step(Library::Mingw, &options(&[&o.libc], &["--without-crt"]), &[], &[])?;
        self.step(
            Library::Gcc,
            &options(&[&o.basic, &o.gcc], &["--disable-shared"]),
            &["all-gcc", "all-target-libgcc"],
            &["install-strip-gcc", "install-target-libgcc"],
        )?;
        self.step(Library::Mingw, &options(&[&o.libc], &[]), &[], &[])?;
        self.build_full_gcc()?;
        self.build_pexports()?;
        self.after_build_gcc(false)
    }

    fn full_build_freestanding(&self) -> Result<(), super::Error> {
        let o = &self.options;
        self.build_binutils()?;
        if self.flags.newlib {
            self.step(
                Library::Gcc,
                &options(&[&o.basic, &o.gcc], &[]),
                &["all-gcc"],
                &["install-strip-gcc"],
            )?;
            self.step(Library::Newlib, &options(&[&o.libc], &[]), &[], &[])?;
            let _dir = self.env.enter_build_dir(self.shell, Library::Gcc, false)?;
            self.env.make(self.shell, &[])?;
            self.env.install(self.shell, &[])?;
        } else {
            self.build_full_gcc()?;
        }
        self.after_build_gcc(false)
    }

    /// Canadian toolchains only build the compiler. The C library and runtime
    /// are copied from the cross toolchain built for the same target.
    fn partial_build(&self) -> Result<(), super::Error> {
        let o = &self.options;
        self.build_binutils()?;
        self.step(
            Library::Gcc,
            &options(&[&o.basic, &o.gcc], &[]),
            &["all-gcc"],
            &["install-strip-gcc"],
        )?;
        if self.layout().target.os() == "w64" {
            self.build_pexports()?;
        }
        self.after_build_gcc(false)
    }

    fn build_pexports(&self) -> Result<(), super::Error> {
        let layout = self.layout();
        let prefix = format!("--prefix={}", layout.prefix);
        let host = format!("--host={}", layout.host);
        self.step(Library::Pexports, &[prefix.as_str(), host.as_str(), "CFLAGS=-O3", "CXXFLAGS=-O3"], &[], &[])?;
        if !layout.toolchain_type.intersects(ToolchainType::NATIVE_OR_CANADIAN) {
            let pexports = if self.host_is_mingw() { "pexports.exe" } else { "pexports" };
            self.shell.rename(
                &layout.bin_dir.join(pexports),
                &layout.bin_dir.join(format!("{}-{pexports}", layout.target)),
            )?;
        }
        Ok(())
    }

    fn glibc_phony_stubs_path(&self) -> Utf8PathBuf {
        self.layout().lib_prefix.join("include").join("gnu").join("stubs.h")
    }

    /// Copy-forward, gdbserver, gdb runtime and packaging common to every recipe.
    fn after_build_gcc(&self, skip_gdbserver: bool) -> Result<(), super::Error> {
        let layout = self.layout();
        let mut need_gdbserver = self.flags.gdbserver && !skip_gdbserver;
        if !layout.toolchain_type.full_build() {
            let copied = self.env.copy_from_other_toolchain(self.shell, need_gdbserver)?;
            need_gdbserver &= !copied;
        }
        if self.flags.gdb && layout.toolchain_type.is_freestanding() && !self.flags.newlib {
            self.env.copy_pretty_printer(self.shell)?;
        }

        if need_gdbserver {
            self.env.solve_libgcc_limits(self.shell)?;
            let _dir = self.env.enter_build_dir(self.shell, Library::Binutils, true)?;
            let o = &self.options;
            self.env.configure(self.shell, &options(&[&o.basic, &o.gdbserver], &[]))?;
            self.env.make(self.shell, &[])?;
            self.env.install_ignore_errors(self.shell, &["install-strip-gdbserver"])?;
        }

        if self.flags.gdb && !layout.toolchain_type.intersects(ToolchainType::NATIVE_OR_CANADIAN) {
            self.env.copy_gdb_runtime(self.shell)?;
        }

        self.env
            .package(self.shell, self.flags.gdb, self.flags.gdb && self.host_is_mingw())
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8Path;

    use super::*;
    use crate::{QuietLevel, ToolchainsLogger};

    fn config(gdbserver: bool) -> GccConfig {
        GccConfig {
            gdbserver,
            ..GccConfig::default()
        }
    }

    fn triplet(triplet: &str) -> Triplet {
        Triplet::parse(triplet).unwrap()
    }

    #[test]
    fn freestanding_gdbserver_is_rejected_before_any_command() {
        let shell = Shell::new(ToolchainsLogger::Silent, true, QuietLevel::default(), Utf8Path::new("/"));
        let directories = Directories::new(Utf8Path::new("/src"), Utf8Path::new("/opt"), None);
        let gnu = triplet("x86_64-linux-gnu");
        let error = GccBuild::new(&shell, &directories, &config(true), &gnu, &gnu, &triplet("arm-none-eabi"))
            .unwrap_err();
        assert!(matches!(error, super::super::Error::GdbserverForFreestanding { .. }));
        assert!(shell.journal().is_empty());
    }

    #[test]
    fn unsupported_target_is_rejected() {
        let shell = Shell::new(ToolchainsLogger::Silent, true, QuietLevel::default(), Utf8Path::new("/"));
        let directories = Directories::new(Utf8Path::new("/src"), Utf8Path::new("/opt"), None);
        let gnu = triplet("x86_64-linux-gnu");
        let error = GccBuild::new(&shell, &directories, &config(false), &gnu, &gnu, &triplet("sparc-linux-gnu"))
            .unwrap_err();
        assert!(matches!(error, super::super::Error::Platform { .. }));
    }

    #[test]
    fn modifier_sets_glibc_arch() {
        let shell = Shell::new(ToolchainsLogger::Silent, true, QuietLevel::default(), Utf8Path::new("/"));
        let directories = Directories::new(Utf8Path::new("/src"), Utf8Path::new("/opt"), None);
        let gnu = triplet("x86_64-linux-gnu");
        let build = GccBuild::new(&shell, &directories, &config(true), &gnu, &gnu, &triplet("arm-linux-gnueabihf"))
            .unwrap();
        assert_eq!(build.recipe(), Recipe::FullBuildLinux);
        assert_eq!(build.glibc_arch, Some("arm-hf"));
        assert_eq!(build.options().linux[0], "ARCH=arm");
    }
}
