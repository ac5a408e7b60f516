use super::{
    sysroot::{build_origin_sysroot, build_sysroot, copy_llvm_libs, need_origin_sysroot},
    CMakeOptions,
    LlvmEnvironment,
    Project,
};
use crate::{config::LlvmConfig, toolchain::platform::TargetSystem, Directories, Shell, Triplet};

/// Drives an LLVM build through its stages:
///
/// 1. the compiler, built by the clang found on `PATH`, plus the runtimes of every
///    hosted target when building natively;
/// 2. with bootstrap, the compiler rebuilt by stage 1;
/// 3. with bootstrap, the runtimes rebuilt by stage 2.
#[derive(Debug)]
pub struct LlvmBuild<'s> {
    shell: &'s Shell,
    env: LlvmEnvironment,
}

impl<'s> LlvmBuild<'s> {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(shell, directories)))]
    pub fn new(
        shell: &'s Shell,
        directories: &Directories,
        config: &LlvmConfig,
        build: &Triplet,
        host: &Triplet,
    ) -> Result<Self, super::Error> {
        let env = LlvmEnvironment::new(
            shell,
            directories.clone(),
            build,
            host,
            config.build_config.jobs,
            config.build_config.compress_level,
            config.bootstrap,
        )?;
        shell.info(&format!("Building {} (bootstrap: {}).", env.name(), env.bootstrap()))?;
        Ok(Self { shell, env })
    }

    #[must_use]
    pub fn environment(&self) -> &LlvmEnvironment {
        &self.env
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub fn build(mut self) -> Result<(), super::Error> {
        let shell = self.shell;
        let host = self.env.host().clone();

        if !self.env.is_cross() && need_origin_sysroot(shell, &self.env) {
            build_origin_sysroot(shell, &self.env)?;
        }
        if self.env.is_cross() {
            for project in [Project::Zlib, Project::Libxml2] {
                self.env.build_project(shell, project, &host, &self.env.options().lib)?;
            }
        }

        let options = self.env.options();
        let stage_1 = options.stage_1.merged(&options.dylib).merged(&options.cross);
        self.env.build_project(shell, Project::Llvm, &host, &stage_1)?;
        let (runtimes, w32) = (options.stage_1.clone(), options.w32_1.clone());
        self.build_runtimes(&runtimes, &w32)?;

        if self.env.bootstrap() {
            self.env.next_stage(shell);
            let options = self.env.options();
            let stage_2 = options.stage_2.merged(&options.dylib).merged(&options.cross);
            self.env.build_project(shell, Project::Llvm, &host, &stage_2)?;

            self.env.next_stage(shell);
            let (runtimes, w32) = (self.env.options().stage_3.clone(), self.env.options().w32_3.clone());
            self.build_runtimes(&runtimes, &w32)?;
            self.env.change_name(shell)?;
        }

        copy_llvm_libs(shell, &self.env)?;
        self.env.package(shell)?;
        shell.success(&format!("Build {} successfully.", self.env.name()))?;
        Ok(())
    }

    /// Builds the runtimes of every hosted target into the sysroot. A compiler
    /// built for another host reuses the native runtimes.
    fn build_runtimes(&self, options: &CMakeOptions, w32_options: &CMakeOptions) -> Result<(), super::Error> {
        if self.env.is_cross() {
            return Ok(());
        }
        for (target, system) in self.env.systems() {
            let options = if *system == TargetSystem::Windows { w32_options } else { options };
            self.env.build_project(self.shell, Project::Runtimes, target, options)?;
            build_sysroot(self.shell, &self.env, target)?;
            self.env.remove_build_dir(self.shell, Project::Runtimes)?;
        }
        Ok(())
    }
}
