//! Bootstrapping GCC toolchains: binutils, gcc, the C library, gdb and gdbserver
//! for every supported (build, host, target) topology.

use camino::Utf8PathBuf;
use snafu::prelude::*;

mod build;
mod environment;
mod layout;
mod library;
mod recipe;

pub use build::GccBuild;
pub use environment::GccEnvironment;
pub use layout::GccLayout;
pub use library::Library;
pub use recipe::{BuildFlags, Recipe, RecipeOptions};

#[derive(Debug, Snafu)]
pub enum Error {
    GdbserverForFreestanding {
        target: String,
    },
    LibgccIncludeNotFound {
        dir: Utf8PathBuf,
    },
    LibraryNotFound {
        library: Library,
        path: Utf8PathBuf,
    },
    Platform {
        source: crate::toolchain::platform::Error,
    },
    PythonDllAmbiguous {
        dir: Utf8PathBuf,
        count: usize,
    },
    PythonDllNotFound {
        dir: Utf8PathBuf,
    },
    Shell {
        source: crate::shell::Error,
    },
    UnsupportedHostOs {
        host: String,
        os: String,
    },
    UnsupportedKernelArch {
        arch: String,
    },
    UnsupportedTargetOs {
        target: String,
        os: String,
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
        crate::Error::ToolchainsGcc { source }
    }
}
