use camino::{Utf8Path, Utf8PathBuf};
use snafu::prelude::*;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
pub enum Error {
    CaminoUtf8PathBufTryFrom {
        source: camino::FromPathBufError,
    },
    HomeDirNotFound,
    InvalidUtf8Path {
        path: PathBuf,
        source: camino::FromPathError,
    },
    StdEnvCurrentDir {
        source: std::io::Error,
    },
}

impl From<self::Error> for crate::Error {
    fn from(source: self::Error) -> Self {
        crate::Error::ToolchainsDirectories { source }
    }
}

/// Where source trees are searched, where toolchains are installed and where
/// the auxiliary scripts (`.gdbinit`, linker scripts, `python_config.sh`) live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Directories {
    home: Utf8PathBuf,
    prefix_dir: Utf8PathBuf,
    script_dir: Utf8PathBuf,
}

impl Directories {
    #[must_use]
    #[cfg_attr(feature = "tracing", tracing::instrument)]
    pub fn new(home: &Utf8Path, prefix_dir: &Utf8Path, script_dir: Option<&Utf8Path>) -> Self {
        let script_dir =
            if let Some(script_dir) = script_dir {
                script_dir.to_path_buf()
            } else {
                home.join("script")
            };
        Self {
            home: home.to_path_buf(),
            prefix_dir: prefix_dir.to_path_buf(),
            script_dir,
        }
    }

    #[must_use]
    pub fn home(&self) -> &Utf8Path {
        &self.home
    }

    #[must_use]
    pub fn prefix_dir(&self) -> &Utf8Path {
        &self.prefix_dir
    }

    #[must_use]
    pub fn script_dir(&self) -> &Utf8Path {
        &self.script_dir
    }

    /// The common source tree of a dependency, e.g. `home/glibc`.
    #[must_use]
    pub fn source_dir(&self, name: &str) -> Utf8PathBuf {
        self.home.join(name)
    }

    /// Static install prefix of a helper library built into the home directory.
    #[must_use]
    pub fn helper_install_dir(&self, name: &str) -> Utf8PathBuf {
        self.home.join(name).join("install")
    }
}

#[cfg_attr(feature = "tracing", tracing::instrument)]
pub fn default_home() -> Result<Utf8PathBuf, self::Error> {
    let user_dirs = ::directories::UserDirs::new().context(HomeDirNotFoundSnafu)?;
    let home_dir = user_dirs.home_dir();
    let home_dir = <&Utf8Path>::try_from(home_dir).with_context(|_| InvalidUtf8PathSnafu {
        path: home_dir.to_path_buf(),
    })?;
    Ok(home_dir.to_path_buf())
}

pub fn current_dir() -> Result<Utf8PathBuf, self::Error> {
    let cwd = std::env::current_dir().context(StdEnvCurrentDirSnafu)?;
    Utf8PathBuf::try_from(cwd).context(CaminoUtf8PathBufTryFromSnafu)
}

/// Makes `path` absolute against `base`. Existing paths are canonicalized, missing
/// ones are only joined so that not-yet-created prefixes resolve too.
#[must_use]
pub fn resolve_path(path: &Utf8Path, base: &Utf8Path) -> Utf8PathBuf {
    let joined =
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        };
    dunce::canonicalize(&joined)
        .ok()
        .and_then(|canonical| Utf8PathBuf::try_from(canonical).ok())
        .unwrap_or(joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_dir_defaults_below_home() {
        let directories = Directories::new(Utf8Path::new("/src"), Utf8Path::new("/opt"), None);
        assert_eq!(directories.script_dir(), "/src/script");
        assert_eq!(directories.source_dir("glibc"), "/src/glibc");
        assert_eq!(directories.helper_install_dir("gmp"), "/src/gmp/install");
        let directories =
            Directories::new(Utf8Path::new("/src"), Utf8Path::new("/opt"), Some(Utf8Path::new("/scripts")));
        assert_eq!(directories.script_dir(), "/scripts");
    }

    #[test]
    fn resolve_path_joins_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let base = Utf8PathBuf::try_from(dunce::canonicalize(dir.path()).unwrap()).unwrap();
        std::fs::create_dir(base.join("home")).unwrap();
        assert_eq!(resolve_path(Utf8Path::new("home"), &base), base.join("home"));
        assert_eq!(resolve_path(Utf8Path::new("missing"), &base), base.join("missing"));
        assert_eq!(resolve_path(&base.join("home"), Utf8Path::new("/elsewhere")), base.join("home"));
    }
}
