use camino::{Utf8Path, Utf8PathBuf};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use snafu::prelude::*;

use crate::{
    directories::{current_dir, resolve_path},
    toolchain::gcc::BuildFlags,
    Shell,
    Triplet,
};

#[derive(Debug, Snafu)]
pub enum Error {
    BuildPlatformUnknown,
    HomeNotFound {
        path: Utf8PathBuf,
    },
    InvalidBuildPlatform {
        build: String,
        source: crate::triplet::Error,
    },
    InvalidCompressLevel {
        level: u8,
    },
    InvalidJobs,
    NotAnObject {
        path: Utf8PathBuf,
    },
    SerdeJsonFromStr {
        path: Utf8PathBuf,
        source: serde_json::Error,
    },
    SerdeJsonFromValue {
        path: Utf8PathBuf,
        source: serde_json::Error,
    },
    SerdeJsonToString {
        source: serde_json::Error,
    },
    Shell {
        source: crate::shell::Error,
    },
    StdFsReadToString {
        path: Utf8PathBuf,
        source: std::io::Error,
    },
}

impl From<crate::shell::Error> for self::Error {
    fn from(source: crate::shell::Error) -> Self {
        self::Error::Shell { source }
    }
}

impl From<self::Error> for crate::Error {
    fn from(source: self::Error) -> Self {
        crate::Error::ToolchainsConfig { source }
    }
}

pub const DEFAULT_COMPRESS_LEVEL: u8 = 17;
pub const COMPRESS_LEVELS: core::ops::RangeInclusive<u8> = 1 ..= 22;

/// Keeps `cli` when it was changed from `default`, `imported` otherwise.
fn pick<T: PartialEq>(imported: T, cli: T, default: T) -> T {
    if cli == default {
        imported
    } else {
        cli
    }
}

fn default_home() -> Utf8PathBuf {
    crate::directories::default_home().unwrap_or_default()
}

/// `available_parallelism + 2`.
#[must_use]
pub fn default_jobs() -> usize {
    std::thread::available_parallelism().map_or(1, core::num::NonZeroUsize::get) + 2
}

/// Asks the system gcc for the platform it runs on. A `pc` vendor is dropped so
/// the result matches the supported platform names.
#[must_use]
pub fn default_build_platform() -> Option<String> {
    let output = std::process::Command::new("gcc").arg("-dumpmachine").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let machine = String::from_utf8_lossy(&output.stdout).trim().to_owned();
    let triplet = Triplet::parse(&machine).ok()?;
    if triplet.vendor() == "pc" {
        Some(triplet.drop_vendor())
    } else {
        Some(machine)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct BasicConfig {
    /// Directory holding the source trees.
    pub home: Utf8PathBuf,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self { home: default_home() }
    }
}

impl BasicConfig {
    #[must_use]
    pub fn merge(imported: Self, cli: Self) -> Self {
        Self {
            home: pick(imported.home, cli.home, Self::default().home),
        }
    }

    pub fn check(&self) -> Result<(), self::Error> {
        ensure!(self.home.is_dir(), HomeNotFoundSnafu { path: &self.home });
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct BuildConfig {
    /// Platform the toolchains are built on, detected with gcc when unset.
    pub build: Option<String>,
    pub jobs: usize,
    /// Directory the toolchains are installed into.
    pub prefix_dir: Utf8PathBuf,
    pub compress_level: u8,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            build: None,
            jobs: default_jobs(),
            prefix_dir: default_home(),
            compress_level: DEFAULT_COMPRESS_LEVEL,
        }
    }
}

impl BuildConfig {
    #[must_use]
    pub fn merge(imported: Self, cli: Self) -> Self {
        let default = Self::default();
        Self {
            build: pick(imported.build, cli.build, default.build),
            jobs: pick(imported.jobs, cli.jobs, default.jobs),
            prefix_dir: pick(imported.prefix_dir, cli.prefix_dir, default.prefix_dir),
            compress_level: pick(imported.compress_level, cli.compress_level, default.compress_level),
        }
    }

    /// The configured build platform, detected with gcc when unset.
    pub fn build_triplet(&self) -> Result<Triplet, self::Error> {
        let build = self
            .build
            .clone()
            .or_else(default_build_platform)
            .context(BuildPlatformUnknownSnafu)?;
        Triplet::parse(&build).context(InvalidBuildPlatformSnafu { build: &build })
    }

    /// Stores the detected build platform so that an exported file pins it.
    pub fn resolve_build(&mut self) -> Result<Triplet, self::Error> {
        let build = self.build_triplet()?;
        self.build = Some(build.to_string());
        Ok(build)
    }

    pub fn check(&self) -> Result<(), self::Error> {
        if let Some(build) = &self.build {
            Triplet::parse(build).context(InvalidBuildPlatformSnafu { build })?;
        }
        ensure!(self.jobs > 0, InvalidJobsSnafu);
        ensure!(
            COMPRESS_LEVELS.contains(&self.compress_level),
            InvalidCompressLevelSnafu {
                level: self.compress_level
            }
        );
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct GccConfig {
    #[serde(flatten)]
    pub basic: BasicConfig,
    #[serde(flatten)]
    pub build_config: BuildConfig,
    pub gdb: bool,
    pub gdbserver: bool,
    /// Only meaningful for freestanding targets.
    pub newlib: bool,
    pub nls: bool,
}

impl Default for GccConfig {
    fn default() -> Self {
        let flags = BuildFlags::default();
        Self {
            basic: BasicConfig::default(),
            build_config: BuildConfig::default(),
            gdb: flags.gdb,
            gdbserver: flags.gdbserver,
            newlib: flags.newlib,
            nls: flags.nls,
        }
    }
}

impl GccConfig {
    #[must_use]
    pub fn flags(&self) -> BuildFlags {
        BuildFlags {
            gdb: self.gdb,
            gdbserver: self.gdbserver,
            newlib: self.newlib,
            nls: self.nls,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LlvmConfig {
    #[serde(flatten)]
    pub basic: BasicConfig,
    #[serde(flatten)]
    pub build_config: BuildConfig,
    /// Rebuild the compiler and runtimes with the freshly built compiler.
    pub bootstrap: bool,
}

/// A configuration that can be exported to and imported from a flat JSON object.
pub trait ConfigFile: Sized + Default + PartialEq + Serialize + DeserializeOwned {
    fn basic(&self) -> &BasicConfig;

    fn basic_mut(&mut self) -> &mut BasicConfig;

    fn build_config(&self) -> &BuildConfig;

    fn build_config_mut(&mut self) -> &mut BuildConfig;

    /// Fields other than the shared ones.
    #[must_use]
    fn merge_own(imported: Self, cli: Self) -> Self;

    /// Starts from `imported` and overrides every field the command line changed
    /// from its default.
    #[must_use]
    fn merge(imported: Self, cli: Self) -> Self {
        let basic = BasicConfig::merge(imported.basic().clone(), cli.basic().clone());
        let build_config = BuildConfig::merge(imported.build_config().clone(), cli.build_config().clone());
        let mut merged = Self::merge_own(imported, cli);
        *merged.basic_mut() = basic;
        *merged.build_config_mut() = build_config;
        merged
    }

    /// Reads a configuration. Relative paths are taken relative to the file.
    #[cfg_attr(feature = "tracing", tracing::instrument)]
    fn load(path: &Utf8Path) -> Result<Self, self::Error> {
        let text = std::fs::read_to_string(path).context(StdFsReadToStringSnafu { path })?;
        let value = serde_json::from_str::<serde_json::Value>(&text).context(SerdeJsonFromStrSnafu { path })?;
        ensure!(value.is_object(), NotAnObjectSnafu { path });
        let mut config = serde_json::from_value::<Self>(value).context(SerdeJsonFromValueSnafu { path })?;
        let base = path.parent().unwrap_or_else(|| Utf8Path::new("."));
        let base = resolve_path(base, &current_dir().unwrap_or_default());
        config.resolve_paths(&base);
        Ok(config)
    }

    fn save(&self, shell: &Shell, path: &Utf8Path) -> Result<(), self::Error> {
        let text = serde_json::to_string_pretty(self).context(SerdeJsonToStringSnafu)?;
        shell.info(&format!("Save settings -> {path}."))?;
        shell.write_file(path, &text)?;
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Utf8Path) {
        let home = resolve_path(&self.basic().home, base);
        self.basic_mut().home = home;
        let prefix_dir = resolve_path(&self.build_config().prefix_dir, base);
        self.build_config_mut().prefix_dir = prefix_dir;
    }

    fn check(&self) -> Result<(), self::Error> {
        self.basic().check()?;
        self.build_config().check()
    }
}

impl ConfigFile for GccConfig {
    fn basic(&self) -> &BasicConfig {
        &self.basic
    }

    fn basic_mut(&mut self) -> &mut BasicConfig {
        &mut self.basic
    }

    fn build_config(&self) -> &BuildConfig {
        &self.build_config
    }

    fn build_config_mut(&mut self) -> &mut BuildConfig {
        &mut self.build_config
    }

    fn merge_own(imported: Self, cli: Self) -> Self {
        let default = Self::default();
        Self {
            gdb: pick(imported.gdb, cli.gdb, default.gdb),
            gdbserver: pick(imported.gdbserver, cli.gdbserver, default.gdbserver),
            newlib: pick(imported.newlib, cli.newlib, default.newlib),
            nls: pick(imported.nls, cli.nls, default.nls),
            ..imported
        }
    }
}

impl ConfigFile for LlvmConfig {
    fn basic(&self) -> &BasicConfig {
        &self.basic
    }

    fn basic_mut(&mut self) -> &mut BasicConfig {
        &mut self.basic
    }

    fn build_config(&self) -> &BuildConfig {
        &self.build_config
    }

    fn build_config_mut(&mut self) -> &mut BuildConfig {
        &mut self.build_config
    }

    fn merge_own(imported: Self, cli: Self) -> Self {
        Self {
            bootstrap: pick(imported.bootstrap, cli.bootstrap, false),
            ..imported
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{QuietLevel, ToolchainsLogger};

    fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(dunce::canonicalize(dir.path()).unwrap()).unwrap();
        (dir, root)
    }

    #[test]
    fn exported_json_is_flat() {
        let config = GccConfig {
            basic: BasicConfig { home: "/src".into() },
            build_config: BuildConfig {
                build: Some("x86_64-linux-gnu".to_owned()),
                jobs: 6,
                prefix_dir: "/opt".into(),
                compress_level: 19,
            },
            nls: true,
            ..GccConfig::default()
        };
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["home"], "/src");
        assert_eq!(value["prefix_dir"], "/opt");
        assert_eq!(value["jobs"], 6);
        assert_eq!(value["nls"], true);
        assert!(value.get("basic").is_none());
    }

    #[test]
    fn save_then_load_resolves_relative_paths() {
        let (_dir, root) = temp_root();
        let shell = Shell::new(ToolchainsLogger::Silent, false, QuietLevel::default(), &root);
        let path = root.join("config.json");
        std::fs::write(&path, r#"{ "home": "src", "prefix_dir": "/opt", "bootstrap": true }"#).unwrap();
        let config = LlvmConfig::load(&path).unwrap();
        assert_eq!(config.basic.home, root.join("src"));
        assert_eq!(config.build_config.prefix_dir, "/opt");
        assert!(config.bootstrap);
        assert_eq!(config.build_config.compress_level, DEFAULT_COMPRESS_LEVEL);

        config.save(&shell, &root.join("saved.json")).unwrap();
        assert_eq!(LlvmConfig::load(&root.join("saved.json")).unwrap(), config);
    }

    #[test]
    fn non_object_file_is_rejected() {
        let (_dir, root) = temp_root();
        let path = root.join("config.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(GccConfig::load(&path), Err(Error::NotAnObject { .. })));
    }

    #[test]
    fn cli_overrides_only_changed_fields() {
        let imported = GccConfig {
            gdb: false,
            build_config: BuildConfig {
                jobs: 3,
                compress_level: 5,
                ..BuildConfig::default()
            },
            ..GccConfig::default()
        };
        let cli = GccConfig {
            nls: true,
            build_config: BuildConfig {
                compress_level: 9,
                ..BuildConfig::default()
            },
            ..GccConfig::default()
        };
        let merged = GccConfig::merge(imported, cli);
        assert!(!merged.gdb);
        assert!(merged.nls);
        assert_eq!(merged.build_config.jobs, 3);
        assert_eq!(merged.build_config.compress_level, 9);
    }

    #[test]
    fn check_rejects_invalid_values() {
        let (_dir, root) = temp_root();
        let mut config = LlvmConfig {
            basic: BasicConfig { home: root.clone() },
            ..LlvmConfig::default()
        };
        config.build_config.build = Some("x86_64-linux-gnu".to_owned());
        assert!(config.check().is_ok());

        config.build_config.compress_level = 23;
        assert!(matches!(config.check(), Err(Error::InvalidCompressLevel { level: 23 })));
        config.build_config.compress_level = 1;
        config.build_config.jobs = 0;
        assert!(matches!(config.check(), Err(Error::InvalidJobs)));
        config.build_config.jobs = 1;
        config.build_config.build = Some("x86_64".to_owned());
        assert!(matches!(config.check(), Err(Error::InvalidBuildPlatform { .. })));
        config.build_config.build = None;
        config.basic.home = root.join("missing");
        assert!(matches!(config.check(), Err(Error::HomeNotFound { .. })));
    }
}
