use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;
use snafu::prelude::*;

use super::{CMakeOptions, CrossPrefixes, ProjectNotFoundSnafu, StageOptions, UnsupportedRuntimeTargetSnafu};
use crate::{
    toolchain::{
        compress,
        major_version,
        platform::{self, PlatformRole, TargetSystem},
        LLVM_VERSION,
    },
    triplet::gnu_to_llvm,
    Directories,
    Shell,
    Triplet,
};

/// A CMake project the LLVM build configures.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Project {
    Llvm,
    Runtimes,
    Zlib,
    Libxml2,
}

impl Project {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Project::Llvm => "llvm",
            Project::Runtimes => "runtimes",
            Project::Zlib => "zlib",
            Project::Libxml2 => "libxml2",
        }
    }

    /// Subprojects of the LLVM monorepo, as opposed to dependency libraries.
    #[must_use]
    pub fn is_subproject(self) -> bool {
        matches!(self, Project::Llvm | Project::Runtimes)
    }
}

impl core::fmt::Display for Project {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

const COMPILERS: [(&str, &str); 3] = [("C", "clang"), ("CXX", "clang++"), ("ASM", "clang")];

/// Paths and CMake invocations of a staged LLVM build.
///
/// The install prefix depends on the stage: stage 1 installs into
/// `prefix_dir/{name}`, later stages into `prefix_dir/{name}-new`.
#[derive(Debug)]
pub struct LlvmEnvironment {
    build: Triplet,
    host: Triplet,
    directories: Directories,
    jobs: usize,
    compress_level: u8,
    bootstrap: bool,
    stage: u8,
    name: String,
    llvm_prefix: Utf8PathBuf,
    sysroot_dir: Utf8PathBuf,
    systems: Vec<(Triplet, TargetSystem)>,
    options: StageOptions,
}

impl LlvmEnvironment {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(shell, directories)))]
    pub fn new(
        shell: &Shell,
        directories: Directories,
        build: &Triplet,
        host: &Triplet,
        jobs: usize,
        compress_level: u8,
        bootstrap: bool,
    ) -> Result<Self, super::Error> {
        platform::check_supported(host, PlatformRole::Host)?;
        let name = format!("{host}-clang{}", major_version(LLVM_VERSION));
        let prefix_dir = directories.prefix_dir().to_path_buf();
        let mut env = Self {
            build: build.clone(),
            host: host.clone(),
            jobs,
            compress_level,
            bootstrap,
            stage: 1,
            llvm_prefix: prefix_dir.join(&name),
            sysroot_dir: prefix_dir.join("sysroot"),
            systems: platform::hosted_targets(),
            options: StageOptions::new(jobs, bootstrap, None),
            name,
            directories,
        };

        let required = if env.is_cross() {
            vec![Project::Llvm, Project::Runtimes, Project::Zlib, Project::Libxml2]
        } else {
            vec![Project::Llvm, Project::Runtimes]
        };
        for project in required {
            env.check_project(shell, project)?;
        }

        if env.is_cross() {
            let (zlib, libxml2, native_bin) = (
                env.prefix(Project::Zlib),
                env.prefix(Project::Libxml2),
                env.native_dir().join("bin"),
            );
            env.options = StageOptions::new(jobs, bootstrap, Some(CrossPrefixes {
                zlib: &zlib,
                libxml2: &libxml2,
                native_bin: &native_bin,
            }));
            shell.prepend_path(&native_bin);
        }
        shell.prepend_path(&env.bin_dir());
        Ok(env)
    }

    fn check_project(&self, shell: &Shell, project: Project) -> Result<(), super::Error> {
        let path = self.source_dir(project);
        if shell.exists(&path) {
            shell.info(&format!("Checking {project} in \"{path}\" ... yes"))?;
            return Ok(());
        }
        ensure!(shell.dry_run(), ProjectNotFoundSnafu { project, path });
        shell.note(&format!("Checking {project} in \"{path}\" ... skip for dry run"))?;
        Ok(())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn build(&self) -> &Triplet {
        &self.build
    }

    #[must_use]
    pub fn host(&self) -> &Triplet {
        &self.host
    }

    #[must_use]
    pub fn directories(&self) -> &Directories {
        &self.directories
    }

    #[must_use]
    pub fn bootstrap(&self) -> bool {
        self.bootstrap
    }

    #[must_use]
    pub fn stage(&self) -> u8 {
        self.stage
    }

    #[must_use]
    pub fn options(&self) -> &StageOptions {
        &self.options
    }

    /// Whether the compiler is built to run on another machine.
    #[must_use]
    pub fn is_cross(&self) -> bool {
        self.build.as_str() != self.host.as_str()
    }

    #[must_use]
    pub fn bin_dir(&self) -> Utf8PathBuf {
        self.llvm_prefix.join("bin")
    }

    #[must_use]
    pub fn sysroot_dir(&self) -> &Utf8Path {
        &self.sysroot_dir
    }

    /// `lib/clang/{major}/lib` of the current install prefix.
    #[must_use]
    pub fn compiler_rt_dir(&self) -> Utf8PathBuf {
        compiler_rt_dir(&self.llvm_prefix)
    }

    /// The native LLVM toolchain of the build machine.
    #[must_use]
    pub fn native_dir(&self) -> Utf8PathBuf {
        self.directories
            .prefix_dir()
            .join(format!("{}-clang{}", self.build, major_version(LLVM_VERSION)))
    }

    #[must_use]
    pub fn native_compiler_rt_dir(&self) -> Utf8PathBuf {
        compiler_rt_dir(&self.native_dir())
    }

    #[must_use]
    pub fn prefix(&self, project: Project) -> Utf8PathBuf {
        match project {
            Project::Llvm => self.llvm_prefix.clone(),
            Project::Runtimes => self.llvm_prefix.join("install"),
            Project::Zlib | Project::Libxml2 => self.directories.helper_install_dir(project.name()),
        }
    }

    #[must_use]
    pub fn source_dir(&self, project: Project) -> Utf8PathBuf {
        if project.is_subproject() {
            self.directories.source_dir("llvm").join(project.name())
        } else {
            self.directories.source_dir(project.name())
        }
    }

    #[must_use]
    pub fn build_dir(&self, project: Project) -> Utf8PathBuf {
        if project.is_subproject() {
            self.directories
                .source_dir("llvm")
                .join(format!("build-{}-{project}", self.host))
        } else {
            self.source_dir(project).join("build")
        }
    }

    /// Hosted targets runtimes are built for, with the system each runs.
    #[must_use]
    pub fn systems(&self) -> &[(Triplet, TargetSystem)] {
        &self.systems
    }

    pub fn system_of(&self, target: &Triplet) -> Result<TargetSystem, super::Error> {
        self.systems
            .iter()
            .find(|(candidate, _)| candidate.weak_eq(target))
            .map(|(_, system)| *system)
            .context(UnsupportedRuntimeTargetSnafu {
                target: target.to_string(),
            })
    }

    /// Compiler selection arguments building for `target` with extra `flags`.
    pub fn get_compiler(&self, target: &Triplet, flags: &[&str]) -> Result<Vec<String>, super::Error> {
        let system = self.system_of(target)?;
        let flags = flags.join(" ");
        let gcc_toolchain = format!("--gcc-toolchain={}", self.sysroot_dir);
        let mut args = Vec::new();
        for (lang, compiler) in COMPILERS {
            let lang_flags = ["-Wno-unused-command-line-argument", gcc_toolchain.as_str(), flags.as_str()]
                .into_iter()
                .filter(|flag| !flag.is_empty())
                .join(" ");
            args.extend([
                format!("-DCMAKE_{lang}_COMPILER=\"{compiler}\""),
                format!("-DCMAKE_{lang}_COMPILER_TARGET={target}"),
                format!("-DCMAKE_{lang}_FLAGS=\"{lang_flags}\""),
                format!("-DCMAKE_{lang}_COMPILER_WORKS=ON"),
            ]);
        }
        if target.as_str() != self.build.as_str() {
            args.extend([
                format!("-DCMAKE_SYSTEM_NAME={system}"),
                format!("-DCMAKE_SYSTEM_PROCESSOR={}", target.arch()),
                format!("-DCMAKE_SYSROOT=\"{}\"", self.sysroot_dir),
                "-DCMAKE_CROSSCOMPILING=TRUE".to_owned(),
            ]);
        }
        args.extend([
            format!("-DLLVM_RUNTIMES_TARGET={target}"),
            format!("-DLLVM_DEFAULT_TARGET_TRIPLE={}", gnu_to_llvm(target.as_str())),
            format!("-DLLVM_HOST_TRIPLE={}", gnu_to_llvm(self.host.as_str())),
            format!("-DCMAKE_LINK_FLAGS=\"{flags}\""),
        ]);
        Ok(args)
    }

    /// Configures `project` for `target` in a fresh build directory.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, shell, options)))]
    pub fn config(
        &self,
        shell: &Shell,
        project: Project,
        target: &Triplet,
        flags: &[&str],
        options: &CMakeOptions,
    ) -> Result<(), super::Error> {
        let build_dir = self.build_dir(project);
        shell.remove_if_exists(&build_dir)?;
        let command = [
            "cmake -G Ninja".to_owned(),
            format!("--install-prefix {}", self.prefix(project)),
            format!("-B {build_dir}"),
            format!("-S {}", self.source_dir(project)),
        ]
        .into_iter()
        .chain(self.get_compiler(target, flags)?)
        .chain(options.to_args())
        .join(" ");
        shell.run(&command)?;
        Ok(())
    }

    pub fn make(&self, shell: &Shell, project: Project) -> Result<(), super::Error> {
        shell.run(&format!("ninja -C {} -j{}", self.build_dir(project), self.jobs))?;
        Ok(())
    }

    pub fn install(&self, shell: &Shell, project: Project) -> Result<(), super::Error> {
        shell.run(&format!("ninja -C {} install/strip -j{}", self.build_dir(project), self.jobs))?;
        Ok(())
    }

    /// Configures, builds and installs `project` for `target`.
    pub fn build_project(
        &self,
        shell: &Shell,
        project: Project,
        target: &Triplet,
        options: &CMakeOptions,
    ) -> Result<(), super::Error> {
        self.config(shell, project, target, &[], options)?;
        self.make(shell, project)?;
        self.install(shell, project)
    }

    /// Advances to the next stage. Its install prefix takes precedence on `PATH`.
    pub fn next_stage(&mut self, shell: &Shell) {
        self.stage += 1;
        self.llvm_prefix = self.directories.prefix_dir().join(format!("{}-new", self.name));
        shell.prepend_path(&self.bin_dir());
    }

    /// Removes the build tree of `project`. The runtimes install tree goes too
    /// since its content has been moved into the sysroot.
    pub fn remove_build_dir(&self, shell: &Shell, project: Project) -> Result<(), super::Error> {
        shell.remove_if_exists(&self.build_dir(project))?;
        if project == Project::Runtimes {
            shell.remove_if_exists(&self.prefix(Project::Runtimes))?;
        }
        Ok(())
    }

    /// Swaps the bootstrapped toolchain in: `name` becomes `name-old` and
    /// `name-new` becomes `name`. Nothing happens when `name-old` exists.
    pub fn change_name(&self, shell: &Shell) -> Result<(), super::Error> {
        let prefix_dir = self.directories.prefix_dir();
        let old_path = prefix_dir.join(format!("{}-old", self.name));
        if !self.bootstrap || shell.exists(&old_path) {
            return Ok(());
        }
        let path = prefix_dir.join(&self.name);
        shell.rename(&path, &old_path)?;
        shell.rename(&self.llvm_prefix, &path)?;
        Ok(())
    }

    /// Packs the toolchain, and the sysroot when it was built natively.
    pub fn package(&self, shell: &Shell) -> Result<(), super::Error> {
        let prefix_dir = self.directories.prefix_dir();
        compress(shell, prefix_dir, &self.name, self.compress_level, self.jobs)?;
        if !self.is_cross() {
            compress(shell, prefix_dir, "sysroot", self.compress_level, self.jobs)?;
        }
        Ok(())
    }
}

fn compiler_rt_dir(prefix: &Utf8Path) -> Utf8PathBuf {
    prefix
        .join("lib")
        .join("clang")
        .join(major_version(LLVM_VERSION))
        .join("lib")
}
