use camino::{Utf8Path, Utf8PathBuf};
use core::cell::{Cell, RefCell};
use snafu::prelude::*;
use std::io::Write;

#[derive(Debug, Snafu)]
pub enum Error {
    StdFsCreateDirAll { path: Utf8PathBuf, source: std::io::Error },
    StdFsOpenOptions { path: Utf8PathBuf, source: std::io::Error },
    StdIoWriteAll { source: std::io::Error },
}

impl From<self::Error> for crate::Error {
    fn from(source: self::Error) -> Self {
        crate::Error::ToolchainsLogging { source }
    }
}

#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MessageKind {
    Error,
    Warning,
    Note,
    Info,
    Success,
}

impl MessageKind {
    const ALL: [MessageKind; 5] = [
        MessageKind::Error,
        MessageKind::Warning,
        MessageKind::Note,
        MessageKind::Info,
        MessageKind::Success,
    ];

    fn index(self) -> usize {
        match self {
            MessageKind::Error => 0,
            MessageKind::Warning => 1,
            MessageKind::Note => 2,
            MessageKind::Info => 3,
            MessageKind::Success => 4,
        }
    }
}

impl core::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let kind = match self {
            MessageKind::Error => "error",
            MessageKind::Warning => "warning",
            MessageKind::Note => "note",
            MessageKind::Info => "info",
            MessageKind::Success => "success",
        };
        write!(f, "{kind}")
    }
}

/// How much of its own output the program suppresses.
///
/// Level 1 adds `--quiet` to configure and make, level 2 silences this program's
/// echo lines, level 3 also silences the final status summary.
#[derive(Clone, Copy, Debug, Default, Eq, Ord, PartialEq, PartialOrd)]
pub struct QuietLevel(pub u8);

impl QuietLevel {
    #[must_use]
    pub fn command_option(self) -> &'static str {
        if self.0 >= 1 {
            "--quiet"
        } else {
            ""
        }
    }

    #[must_use]
    pub fn echo(self) -> bool {
        self.0 < 2
    }

    #[must_use]
    pub fn status(self) -> bool {
        self.0 < 3
    }
}

#[derive(Debug, Default)]
pub struct StatusCounter {
    counts: [Cell<usize>; 5],
}

impl StatusCounter {
    pub fn add(&self, kind: MessageKind) {
        let count = &self.counts[kind.index()];
        count.set(count.get() + 1);
    }

    #[must_use]
    pub fn get(&self, kind: MessageKind) -> usize {
        self.counts[kind.index()].get()
    }

    pub fn clear(&self) {
        for count in &self.counts {
            count.set(0);
        }
    }
}

impl core::fmt::Display for StatusCounter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut first = true;
        for kind in MessageKind::ALL {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{kind}: {}", self.get(kind))?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub enum ToolchainsLogger {
    Console,
    LogFile {
        path: Utf8PathBuf,
        file: RefCell<std::fs::File>,
    },
    #[default]
    Silent,
}

impl ToolchainsLogger {
    #[cfg_attr(feature = "tracing", tracing::instrument)]
    pub fn log_file(path: &Utf8Path) -> Result<Self, self::Error> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
            std::fs::create_dir_all(parent).context(StdFsCreateDirAllSnafu { path: parent })?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .context(StdFsOpenOptionsSnafu { path })?;
        Ok(Self::LogFile {
            path: path.to_path_buf(),
            file: RefCell::new(file),
        })
    }

    pub fn report(&self, kind: MessageKind, message: &str) -> Result<(), self::Error> {
        match self {
            ToolchainsLogger::Console => {
                if matches!(kind, MessageKind::Error | MessageKind::Warning) {
                    eprintln!("[toolchains] :: {kind}: {message}");
                } else {
                    println!("[toolchains] :: {kind}: {message}");
                }
            },
            ToolchainsLogger::LogFile { file, .. } => {
                file.borrow_mut()
                    .write_all(format!("[toolchains] :: {kind}: {message}\n").as_bytes())
                    .context(StdIoWriteAllSnafu)?;
            },
            ToolchainsLogger::Silent => {},
        }
        Ok(())
    }
}
