//! Staged LLVM/Clang builds and the sysroot their runtimes are assembled into.

use camino::Utf8PathBuf;
use snafu::prelude::*;

mod build;
mod environment;
mod options;
mod sysroot;

pub use build::LlvmBuild;
pub use environment::{LlvmEnvironment, Project};
pub use options::{CMakeOptions, CrossPrefixes, StageOptions};
pub use sysroot::{build_origin_sysroot, build_sysroot, copy_llvm_libs, need_origin_sysroot};

#[derive(Debug, Snafu)]
pub enum Error {
    Platform {
        source: crate::toolchain::platform::Error,
    },
    ProjectNotFound {
        project: Project,
        path: Utf8PathBuf,
    },
    Shell {
        source: crate::shell::Error,
    },
    UnsupportedRuntimeTarget {
        target: String,
    },
}

impl From<crate::shell::Error> for self::Error {
    fn from(source: crate::shell::Error) -> Self {
        self::Error::Shell { source }
    }
}

impl From<crate::logging::Error> for self::Error {
    fn from(source: crate::logging::Error) -> Self {
        self::Error::Shell {
            source: source.into(),
        }
    }
}

impl From<crate::toolchain::platform::Error> for self::Error {
    fn from(source: crate::toolchain::platform::Error) -> Self {
        self::Error::Platform { source }
    }
}

impl From<self::Error> for crate::Error {
    fn from(source: self::Error) -> Self {
        crate::Error::ToolchainsLlvm { source }
    }
}
