use camino::Utf8Path;

use super::{LlvmEnvironment, Project};
use crate::{
    shell::CopyOptions,
    toolchain::{gcc::GccLayout, platform::TargetSystem, GCC_VERSION},
    Shell,
};

/// Entries of a GCC library prefix that do not belong in a sysroot.
const SKIPPED_GCC_ENTRIES: [&str; 2] = ["bin", "lib32"];

#[must_use]
pub fn need_origin_sysroot(shell: &Shell, env: &LlvmEnvironment) -> bool {
    !shell.exists(env.sysroot_dir())
}

/// Recreates the sysroot from the GCC toolchains already built on this machine,
/// one per hosted target. Missing toolchains are skipped with a warning.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(shell, env)))]
pub fn build_origin_sysroot(shell: &Shell, env: &LlvmEnvironment) -> Result<(), super::Error> {
    let sysroot_dir = env.sysroot_dir();
    shell.mkdir(sysroot_dir, true)?;
    let build = env.build();
    for (target, _) in env.systems() {
        let gcc = GccLayout::new(build, build, target, env.directories().prefix_dir());
        if !shell.exists(&gcc.prefix) {
            shell.warning(&format!("Cannot find gcc in \"{}\", skip it.", gcc.prefix))?;
            continue;
        }
        for entry in shell.read_dir(&gcc.lib_prefix)? {
            let Some(name) = entry.file_name() else { continue };
            if !SKIPPED_GCC_ENTRIES.contains(&name) {
                shell.copy(&entry, &sysroot_dir.join(target.as_str()).join(name))?;
            }
        }

        let libgcc_dst = sysroot_dir
            .join("lib")
            .join("gcc")
            .join(target.as_str())
            .join(GCC_VERSION);
        shell.mkdir(&libgcc_dst, true)?;
        for entry in shell.read_dir(&gcc.libgcc_dir())? {
            let Some(name) = entry.file_name() else { continue };
            if name.ends_with(".o") || name.ends_with(".a") || name.ends_with("include") {
                shell.copy(&entry, &libgcc_dst.join(name))?;
            }
        }
    }
    Ok(())
}

/// Moves the runtimes installed for `target` into the sysroot. compiler-rt goes
/// into the toolchain's resource directory instead.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(shell, env)))]
pub fn build_sysroot(shell: &Shell, env: &LlvmEnvironment, target: &crate::Triplet) -> Result<(), super::Error> {
    let system = env.system_of(target)?;
    let target_dir = env.sysroot_dir().join(target.as_str());
    let lib_dir = target_dir.join("lib");
    for src_dir in shell.read_dir(&env.prefix(Project::Runtimes))? {
        match src_dir.file_name() {
            Some("bin") => {
                for file in shell.read_dir(&src_dir)? {
                    let Some(name) = file.file_name() else { continue };
                    if name.ends_with("dll") {
                        shell.copy(&file, &lib_dir.join(name))?;
                    }
                }
            },
            Some("lib") => {
                let compiler_rt_dir = env.compiler_rt_dir();
                shell.mkdir(&compiler_rt_dir, false)?;
                for item in shell.read_dir(&src_dir)? {
                    let Some(name) = item.file_name() else { continue };
                    if name == system.runtime_dir_name() {
                        let rt_dir = compiler_rt_dir.join(name);
                        shell.mkdir(&rt_dir, false)?;
                        for file in shell.read_dir(&item)? {
                            let Some(file_name) = file.file_name() else { continue };
                            shell.copy(&file, &rt_dir.join(file_name))?;
                        }
                    } else {
                        shell.copy(&item, &lib_dir.join(name))?;
                    }
                }
            },
            Some("include") => {
                shell.copy(
                    &src_dir.join("c++").join("v1").join("__config_site"),
                    &target_dir.join("include").join("__config_site"),
                )?;
                // Windows targets look up the shared libc++ headers below the sysroot.
                shell.copy_with(
                    &env.prefix(Project::Llvm).join("include").join("c++"),
                    &env.sysroot_dir().join("include").join("c++"),
                    CopyOptions {
                        overwrite: false,
                        ..CopyOptions::default()
                    },
                )?;
            },
            _ => {},
        }
    }
    Ok(())
}

/// Copies the libc++ and libunwind runtime the toolchain itself links against.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(shell, env)))]
pub fn copy_llvm_libs(shell: &Shell, env: &LlvmEnvironment) -> Result<(), super::Error> {
    let llvm_prefix = env.prefix(Project::Llvm);
    let host_system = env.system_of(env.host())?;
    let src_prefix = env.sysroot_dir().join(env.host().as_str()).join("lib");
    let dst_prefix = llvm_prefix.join(if host_system == TargetSystem::Windows { "bin" } else { "lib" });
    for file in shell.read_dir(&src_prefix)? {
        let Some(name) = file.file_name() else { continue };
        let runtime = name.starts_with("libc++") || name.starts_with("libunwind");
        if runtime && !name.ends_with(".a") && !name.ends_with(".json") {
            shell.copy(&file, &dst_prefix.join(name))?;
        }
    }

    let include_src = env.native_dir().join("include");
    let include_dst = llvm_prefix.join("include");
    // A single stage native build is its own native toolchain.
    if include_src != include_dst {
        for item in shell.read_dir(&include_src)? {
            let Some(name) = item.file_name() else { continue };
            if name.contains("unwind") || name == "c++" {
                shell.copy(&item, &include_dst.join(name))?;
            }
        }
    }

    if env.is_cross() {
        shell.copy(&env.native_compiler_rt_dir(), &env.compiler_rt_dir())?;
        copy_libxml2(shell, &env.prefix(Project::Libxml2), &llvm_prefix)?;
    }
    Ok(())
}

fn copy_libxml2(shell: &Shell, libxml2_prefix: &Utf8Path, llvm_prefix: &Utf8Path) -> Result<(), super::Error> {
    shell.copy(
        &libxml2_prefix.join("bin").join("libxml2.dll"),
        &llvm_prefix.join("lib").join("libxml2.dll"),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;

    use super::*;
    use crate::{Directories, QuietLevel, ToolchainsLogger, Triplet};

    struct Fixture {
        _dir: tempfile::TempDir,
        root: Utf8PathBuf,
        shell: Shell,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
            for project in ["llvm/llvm", "llvm/runtimes"] {
                std::fs::create_dir_all(root.join("home").join(project)).unwrap();
            }
            let shell = Shell::new(ToolchainsLogger::Silent, false, QuietLevel::default(), &root);
            Self { _dir: dir, root, shell }
        }

        fn env(&self, bootstrap: bool) -> LlvmEnvironment {
            let gnu = Triplet::parse("x86_64-linux-gnu").unwrap();
            let directories = Directories::new(&self.root.join("home"), &self.root.join("prefix"), None);
            LlvmEnvironment::new(&self.shell, directories, &gnu, &gnu, 4, 17, bootstrap).unwrap()
        }

        fn touch(&self, path: &Utf8Path) {
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "").unwrap();
        }
    }

    #[test]
    fn origin_sysroot_collects_gcc_toolchains() {
        let fixture = Fixture::new();
        let env = fixture.env(false);
        let gnu = Triplet::parse("x86_64-linux-gnu").unwrap();
        let aarch64 = Triplet::parse("aarch64-linux-gnu").unwrap();
        let gcc = GccLayout::new(&gnu, &gnu, &aarch64, &fixture.root.join("prefix"));
        fixture.touch(&gcc.lib_prefix.join("lib").join("libc.so.6"));
        fixture.touch(&gcc.lib_prefix.join("bin").join("ld"));
        fixture.touch(&gcc.libgcc_dir().join("crtbegin.o"));
        fixture.touch(&gcc.libgcc_dir().join("libgcc.a"));
        fixture.touch(&gcc.libgcc_dir().join("plugin").join("gtype.state"));

        assert!(need_origin_sysroot(&fixture.shell, &env));
        build_origin_sysroot(&fixture.shell, &env).unwrap();

        let sysroot = env.sysroot_dir();
        assert!(sysroot.join("aarch64-linux-gnu/lib/libc.so.6").exists());
        assert!(!sysroot.join("aarch64-linux-gnu/bin").exists());
        let libgcc = sysroot.join("lib/gcc/aarch64-linux-gnu").join(GCC_VERSION);
        assert!(libgcc.join("crtbegin.o").exists());
        assert!(libgcc.join("libgcc.a").exists());
        assert!(!libgcc.join("plugin").exists());
        assert!(!need_origin_sysroot(&fixture.shell, &env));
    }

    #[test]
    fn runtimes_are_split_between_sysroot_and_resource_dir() {
        let fixture = Fixture::new();
        let env = fixture.env(false);
        let runtimes = env.prefix(Project::Runtimes);
        fixture.touch(&runtimes.join("lib/linux/libclang_rt.builtins-x86_64.a"));
        fixture.touch(&runtimes.join("lib/libc++.so.1"));
        fixture.touch(&runtimes.join("include/c++/v1/__config_site"));
        fixture.touch(&env.prefix(Project::Llvm).join("include/c++/v1/vector"));

        let target = Triplet::parse("x86_64-linux-gnu").unwrap();
        build_sysroot(&fixture.shell, &env, &target).unwrap();

        let sysroot = env.sysroot_dir();
        assert!(env.compiler_rt_dir().join("linux/libclang_rt.builtins-x86_64.a").exists());
        assert!(sysroot.join("x86_64-linux-gnu/lib/libc++.so.1").exists());
        assert!(!sysroot.join("x86_64-linux-gnu/lib/linux").exists());
        assert!(sysroot.join("x86_64-linux-gnu/include/__config_site").exists());
        assert!(sysroot.join("include/c++/v1/vector").exists());
    }

    #[test]
    fn toolchain_receives_shared_runtime_only() {
        let fixture = Fixture::new();
        let mut env = fixture.env(true);
        env.next_stage(&fixture.shell);
        let host_lib = env.sysroot_dir().join("x86_64-linux-gnu/lib");
        fixture.touch(&host_lib.join("libc++.so.1"));
        fixture.touch(&host_lib.join("libc++.a"));
        fixture.touch(&host_lib.join("libc++.modules.json"));
        fixture.touch(&host_lib.join("libunwind.so.1"));
        fixture.touch(&host_lib.join("libm.so.6"));
        fixture.touch(&env.native_dir().join("include/c++/v1/vector"));
        fixture.touch(&env.native_dir().join("include/libunwind.h"));
        fixture.touch(&env.native_dir().join("include/clang-c/Index.h"));

        copy_llvm_libs(&fixture.shell, &env).unwrap();

        let lib = env.prefix(Project::Llvm).join("lib");
        assert!(lib.join("libc++.so.1").exists());
        assert!(lib.join("libunwind.so.1").exists());
        assert!(!lib.join("libc++.a").exists());
        assert!(!lib.join("libc++.modules.json").exists());
        assert!(!lib.join("libm.so.6").exists());
        let include = env.prefix(Project::Llvm).join("include");
        assert!(include.join("c++/v1/vector").exists());
        assert!(include.join("libunwind.h").exists());
        assert!(!include.join("clang-c").exists());
    }
}
