#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::result_large_err)]

use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;
use snafu::prelude::*;

pub use crate::{
    config::{BasicConfig, BuildConfig, ConfigFile, GccConfig, LlvmConfig},
    directories::Directories,
    logging::{MessageKind, QuietLevel, StatusCounter, ToolchainsLogger},
    shell::{CommandOutput, CopyOptions, RunOptions, Shell, ShellAction},
    toolchain::{
        gcc::{GccBuild, GccLayout, Recipe},
        llvm::LlvmBuild,
        platform::{HOST_LIST, TARGET_LIST},
        ToolchainType,
        GCC_VERSION,
        LLVM_VERSION,
    },
    triplet::{gnu_to_llvm, PartialTriplet, Triplet, TripletCompleter},
};

pub mod config;
pub mod directories;
pub mod logging;
pub mod shell;
pub mod toolchain;
pub mod triplet;

#[derive(Debug, Snafu)]
pub enum Error {
    ToolchainsConfig {
        source: crate::config::Error,
    },
    ToolchainsDirectories {
        source: crate::directories::Error,
    },
    ToolchainsGcc {
        source: crate::toolchain::gcc::Error,
    },
    ToolchainsLlvm {
        source: crate::toolchain::llvm::Error,
    },
    ToolchainsLogging {
        source: crate::logging::Error,
    },
    ToolchainsShell {
        source: crate::shell::Error,
    },
    ToolchainsTriplet {
        source: crate::triplet::Error,
    },
}

/// Entry point tying a [`Shell`] to the GCC and LLVM builders.
#[cfg_attr(feature = "debug", derive(Debug))]
pub struct Toolchains {
    shell: Shell,
    script_dir: Option<Utf8PathBuf>,
}

impl Toolchains {
    #[must_use]
    pub fn builder() -> ToolchainsBuilder {
        ToolchainsBuilder::default()
    }

    #[must_use]
    pub fn shell(&self) -> &Shell {
        &self.shell
    }

    fn directories(&self, basic: &BasicConfig, build_config: &BuildConfig) -> Directories {
        Directories::new(&basic.home, &build_config.prefix_dir, self.script_dir.as_deref())
    }

    /// Builds a GCC toolchain. `host` defaults to the build platform and `target`
    /// to the host.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub fn build_gcc(&self, config: &GccConfig, host: Option<&str>, target: Option<&str>) -> Result<(), crate::Error> {
        config.check()?;
        let build = config.build_config.build_triplet()?;
        let host = host.map_or_else(|| Ok(build.clone()), Triplet::parse)?;
        let target = target.map_or_else(|| Ok(host.clone()), Triplet::parse)?;
        let directories = self.directories(&config.basic, &config.build_config);
        GccBuild::new(&self.shell, &directories, config, &build, &host, &target)?.build()?;
        self.shell.show_status()?;
        Ok(())
    }

    /// Builds an LLVM toolchain running on `host`, the build platform by default.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub fn build_llvm(&self, config: &LlvmConfig, host: Option<&str>) -> Result<(), crate::Error> {
        config.check()?;
        let build = config.build_config.build_triplet()?;
        let host = host.map_or_else(|| Ok(build.clone()), Triplet::parse)?;
        let directories = self.directories(&config.basic, &config.build_config);
        LlvmBuild::new(&self.shell, &directories, config, &build, &host)?.build()?;
        self.shell.show_status()?;
        Ok(())
    }
}

#[derive(Default)]
#[cfg_attr(feature = "debug", derive(Debug))]
pub struct ToolchainsBuilder {
    logger: ToolchainsLogger,
    dry_run: bool,
    quiet: QuietLevel,
    script_dir: Option<Utf8PathBuf>,
    cwd: Option<Utf8PathBuf>,
}

impl ToolchainsBuilder {
    #[must_use]
    pub fn logger(mut self, logger: ToolchainsLogger) -> Self {
        self.logger = logger;
        self
    }

    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn quiet(mut self, quiet: QuietLevel) -> Self {
        self.quiet = quiet;
        self
    }

    #[must_use]
    pub fn script_dir(mut self, script_dir: Option<&Utf8Path>) -> Self {
        self.script_dir = script_dir.map(Utf8Path::to_path_buf);
        self
    }

    #[must_use]
    pub fn cwd(mut self, cwd: &Utf8Path) -> Self {
        self.cwd = Some(cwd.to_path_buf());
        self
    }

    pub fn build(self) -> Result<Toolchains, crate::Error> {
        let cwd = match self.cwd {
            Some(cwd) => cwd,
            None => crate::directories::current_dir()?,
        };
        let shell = Shell::new(self.logger, self.dry_run, self.quiet, &cwd);
        Ok(Toolchains {
            shell,
            script_dir: self.script_dir,
        })
    }
}

/// Listing of the hosts and targets a GCC toolchain can be built for.
#[must_use]
pub fn supported_platforms() -> String {
    format!(
        "Supported hosts:\n{}\nSupported targets:\n{}\n",
        HOST_LIST.iter().map(|host| format!("  {host}")).join("\n"),
        TARGET_LIST.iter().map(|target| format!("  {target}")).join("\n"),
    )
}

/// Completes a triplet over every supported platform plus the given options.
pub fn completer<'a>(options: impl IntoIterator<Item = &'a str>) -> Result<TripletCompleter, crate::Error> {
    let candidates = HOST_LIST.iter().chain(TARGET_LIST.iter()).copied().unique();
    Ok(TripletCompleter::new(candidates, options)?)
}
