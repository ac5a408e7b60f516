use camino::{Utf8Path, Utf8PathBuf};
use core::cell::RefCell;
use indexmap::IndexMap;
use snafu::prelude::*;
use std::process::{Command, Stdio};

use crate::logging::{MessageKind, QuietLevel, StatusCounter, ToolchainsLogger};

#[derive(Debug, Snafu)]
pub enum Error {
    CommandFailed {
        command: String,
        code: Option<i32>,
    },
    CommandSpawn {
        command: String,
        source: std::io::Error,
    },
    Logging {
        source: crate::logging::Error,
    },
    StdEnvJoinPaths {
        source: std::env::JoinPathsError,
    },
    StdFsCopy {
        src: Utf8PathBuf,
        dst: Utf8PathBuf,
        source: std::io::Error,
    },
    StdFsCreateDirAll {
        path: Utf8PathBuf,
        source: std::io::Error,
    },
    StdFsMetadata {
        path: Utf8PathBuf,
        source: std::io::Error,
    },
    StdFsReadDir {
        path: Utf8PathBuf,
        source: std::io::Error,
    },
    StdFsReadLink {
        path: Utf8PathBuf,
        source: std::io::Error,
    },
    StdFsRemove {
        path: Utf8PathBuf,
        source: std::io::Error,
    },
    StdFsRename {
        src: Utf8PathBuf,
        dst: Utf8PathBuf,
        source: std::io::Error,
    },
    StdFsSymlink {
        link: Utf8PathBuf,
        source: std::io::Error,
    },
    StdFsWrite {
        path: Utf8PathBuf,
        source: std::io::Error,
    },
}

impl From<self::Error> for crate::Error {
    fn from(source: self::Error) -> Self {
        crate::Error::ToolchainsShell { source }
    }
}

impl From<crate::logging::Error> for self::Error {
    fn from(source: crate::logging::Error) -> Self {
        self::Error::Logging { source }
    }
}

/// One effect the shell performed, or would have performed in dry-run mode.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShellAction {
    Run { command: String, cwd: Utf8PathBuf },
    Chdir { path: Utf8PathBuf },
    Mkdir { path: Utf8PathBuf, remove: bool },
    Copy { src: Utf8PathBuf, dst: Utf8PathBuf },
    Remove { path: Utf8PathBuf },
    Rename { src: Utf8PathBuf, dst: Utf8PathBuf },
    Symlink { target: Utf8PathBuf, link: Utf8PathBuf },
    Write { path: Utf8PathBuf, append: bool },
    SetEnv { key: String, value: String },
    PrependPath { dir: Utf8PathBuf },
}

#[derive(Clone, Copy, Debug)]
pub struct RunOptions {
    ignore_errors: bool,
    capture: bool,
    echo: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            ignore_errors: false,
            capture: false,
            echo: true,
        }
    }
}

impl RunOptions {
    #[must_use]
    pub fn ignore_errors(mut self) -> Self {
        self.ignore_errors = true;
        self
    }

    #[must_use]
    pub fn capture(mut self) -> Self {
        self.capture = true;
        self
    }

    /// Neither echo the command nor forward its output.
    #[must_use]
    pub fn silent(mut self) -> Self {
        self.echo = false;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CopyOptions {
    pub overwrite: bool,
    pub follow_symlinks: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            overwrite: true,
            follow_symlinks: false,
        }
    }
}

/// Process and filesystem primitives shared by every build.
///
/// The working directory, the `PATH` prefix and extra environment variables live
/// here instead of in the process so each build carries its own context. In
/// dry-run mode every mutating primitive is journaled and echoed but has no effect.
#[derive(Debug)]
pub struct Shell {
    dry_run: bool,
    quiet: QuietLevel,
    logger: ToolchainsLogger,
    counter: StatusCounter,
    cwd: RefCell<Utf8PathBuf>,
    search_path: RefCell<Vec<Utf8PathBuf>>,
    env: RefCell<IndexMap<String, String>>,
    journal: RefCell<Vec<ShellAction>>,
}

/// Restores the previous working directory of a [`Shell`] when dropped.
#[must_use]
#[derive(Debug)]
pub struct DirGuard<'a> {
    shell: &'a Shell,
    previous: Utf8PathBuf,
}

impl Drop for DirGuard<'_> {
    fn drop(&mut self) {
        self.shell.cwd.replace(core::mem::take(&mut self.previous));
    }
}

impl Shell {
    #[must_use]
    pub fn new(logger: ToolchainsLogger, dry_run: bool, quiet: QuietLevel, cwd: &Utf8Path) -> Self {
        Self {
            dry_run,
            quiet,
            logger,
            counter: StatusCounter::default(),
            cwd: RefCell::new(cwd.to_path_buf()),
            search_path: RefCell::default(),
            env: RefCell::default(),
            journal: RefCell::default(),
        }
    }

    #[must_use]
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    #[must_use]
    pub fn quiet(&self) -> QuietLevel {
        self.quiet
    }

    #[must_use]
    pub fn counter(&self) -> &StatusCounter {
        &self.counter
    }

    #[must_use]
    pub fn cwd(&self) -> Utf8PathBuf {
        self.cwd.borrow().clone()
    }

    #[must_use]
    pub fn journal(&self) -> Vec<ShellAction> {
        self.journal.borrow().clone()
    }

    /// Every command run so far, in order.
    #[must_use]
    pub fn commands(&self) -> Vec<String> {
        self.journal
            .borrow()
            .iter()
            .filter_map(|action| match action {
                ShellAction::Run { command, .. } => Some(command.clone()),
                _ => None,
            })
            .collect()
    }

    /// Directories prepended to `PATH`, highest priority first.
    #[must_use]
    pub fn search_path(&self) -> Vec<Utf8PathBuf> {
        self.search_path.borrow().clone()
    }

    #[must_use]
    pub fn env_var(&self, key: &str) -> Option<String> {
        self.env.borrow().get(key).cloned()
    }

    pub fn report(&self, kind: MessageKind, message: &str) -> Result<(), self::Error> {
        self.counter.add(kind);
        if self.quiet.echo() {
            self.logger.report(kind, message)?;
        }
        Ok(())
    }

    pub fn info(&self, message: &str) -> Result<(), self::Error> {
        self.report(MessageKind::Info, message)
    }

    pub fn note(&self, message: &str) -> Result<(), self::Error> {
        self.report(MessageKind::Note, message)
    }

    pub fn warning(&self, message: &str) -> Result<(), self::Error> {
        self.report(MessageKind::Warning, message)
    }

    pub fn success(&self, message: &str) -> Result<(), self::Error> {
        self.report(MessageKind::Success, message)
    }

    pub fn show_status(&self) -> Result<(), self::Error> {
        if self.quiet.status() {
            self.logger.report(MessageKind::Note, &self.counter.to_string())?;
        }
        Ok(())
    }

    fn record(&self, action: ShellAction) {
        self.journal.borrow_mut().push(action);
    }

    fn resolve(&self, path: &Utf8Path) -> Utf8PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.borrow().join(path)
        }
    }

    #[must_use]
    pub fn exists(&self, path: &Utf8Path) -> bool {
        self.resolve(path).symlink_metadata().is_ok()
    }

    pub fn set_env(&self, key: &str, value: &str) {
        self.record(ShellAction::SetEnv {
            key: key.to_owned(),
            value: value.to_owned(),
        });
        self.env.borrow_mut().insert(key.to_owned(), value.to_owned());
    }

    pub fn prepend_path(&self, dir: &Utf8Path) {
        self.record(ShellAction::PrependPath { dir: dir.to_path_buf() });
        self.search_path.borrow_mut().insert(0, dir.to_path_buf());
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub fn enter(&self, path: &Utf8Path) -> Result<DirGuard<'_>, self::Error> {
        let path = self.resolve(path);
        self.info(&format!("Enter directory {path}."))?;
        self.record(ShellAction::Chdir { path: path.clone() });
        let previous = self.cwd.replace(path);
        Ok(DirGuard { shell: self, previous })
    }

    pub fn run(&self, command: &str) -> Result<(), self::Error> {
        self.run_with(command, RunOptions::default())?;
        Ok(())
    }

    /// Runs `command` through `sh -c` in the current directory.
    ///
    /// Returns `None` in dry-run mode and when a failure was ignored.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub fn run_with(&self, command: &str, options: RunOptions) -> Result<Option<CommandOutput>, self::Error> {
        let cwd = self.cwd();
        if options.echo {
            self.info(&format!("Run command: {command}"))?;
        }
        self.record(ShellAction::Run {
            command: command.to_owned(),
            cwd: cwd.clone(),
        });
        if self.dry_run {
            return Ok(None);
        }

        let mut process = Command::new("sh");
        process.arg("-c").arg(command).current_dir(&cwd);
        process.envs(self.env.borrow().iter());
        if !self.search_path.borrow().is_empty() {
            let inherited = std::env::var_os("PATH").unwrap_or_default();
            let dirs = self
                .search_path
                .borrow()
                .iter()
                .map(|dir| dir.as_std_path().to_path_buf())
                .chain(std::env::split_paths(&inherited))
                .collect::<Vec<_>>();
            process.env("PATH", std::env::join_paths(dirs).context(StdEnvJoinPathsSnafu)?);
        }

        let output =
            if options.capture {
                let output = process.output().context(CommandSpawnSnafu { command })?;
                CommandOutput {
                    code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                }
            } else {
                if !options.echo {
                    process.stdout(Stdio::null()).stderr(Stdio::null());
                }
                let status = process.status().context(CommandSpawnSnafu { command })?;
                CommandOutput {
                    code: status.code(),
                    ..CommandOutput::default()
                }
            };

        if output.success() {
            return Ok(Some(output));
        }
        ensure!(
            options.ignore_errors,
            CommandFailedSnafu {
                command,
                code: output.code
            }
        );
        if options.echo {
            self.warning(&format!(
                "Command \"{command}\" failed with errno={:?}, but it is ignored.",
                output.code
            ))?;
        }
        Ok(None)
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub fn mkdir(&self, path: &Utf8Path, remove: bool) -> Result<(), self::Error> {
        let path = self.resolve(path);
        self.info(&format!("Create directory {path}."))?;
        self.record(ShellAction::Mkdir {
            path: path.clone(),
            remove,
        });
        if self.dry_run {
            return Ok(());
        }
        if remove && path.symlink_metadata().is_ok() {
            remove_entry(&path)?;
        }
        std::fs::create_dir_all(&path).context(StdFsCreateDirAllSnafu { path })
    }

    pub fn copy(&self, src: &Utf8Path, dst: &Utf8Path) -> Result<(), self::Error> {
        self.copy_with(src, dst, CopyOptions::default())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub fn copy_with(&self, src: &Utf8Path, dst: &Utf8Path, options: CopyOptions) -> Result<(), self::Error> {
        let (src, dst) = (self.resolve(src), self.resolve(dst));
        self.info(&format!("Copy {src} -> {dst}."))?;
        self.record(ShellAction::Copy {
            src: src.clone(),
            dst: dst.clone(),
        });
        if self.dry_run {
            return Ok(());
        }
        if let Some(parent) = dst.parent() {
            std::fs::create_dir_all(parent).context(StdFsCreateDirAllSnafu { path: parent })?;
        }
        let dst_exists = dst.symlink_metadata().is_ok();
        if dst_exists && !options.overwrite {
            return Ok(());
        }
        if dst_exists {
            remove_entry(&dst)?;
        }
        copy_entry(&src, &dst, options.follow_symlinks)
    }

    /// Copies `src` when it exists and reports whether it did.
    pub fn copy_if_exists(&self, src: &Utf8Path, dst: &Utf8Path, options: CopyOptions) -> Result<bool, self::Error> {
        if self.exists(src) {
            self.copy_with(src, dst, options)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub fn remove(&self, path: &Utf8Path) -> Result<(), self::Error> {
        let path = self.resolve(path);
        self.info(&format!("Remove {path}."))?;
        self.record(ShellAction::Remove { path: path.clone() });
        if self.dry_run {
            return Ok(());
        }
        remove_entry(&path)
    }

    pub fn remove_if_exists(&self, path: &Utf8Path) -> Result<bool, self::Error> {
        if self.exists(path) {
            self.remove(path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub fn rename(&self, src: &Utf8Path, dst: &Utf8Path) -> Result<(), self::Error> {
        let (src, dst) = (self.resolve(src), self.resolve(dst));
        self.info(&format!("Rename {src} -> {dst}."))?;
        self.record(ShellAction::Rename {
            src: src.clone(),
            dst: dst.clone(),
        });
        if self.dry_run {
            return Ok(());
        }
        std::fs::rename(&src, &dst).context(StdFsRenameSnafu { src, dst })
    }

    /// Creates `link` pointing at `target`. A relative target is taken relative to
    /// the directory holding the link.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub fn symlink(&self, target: &Utf8Path, link: &Utf8Path, overwrite: bool) -> Result<(), self::Error> {
        let link = self.resolve(link);
        self.info(&format!("Symlink {link} -> {target}."))?;
        self.record(ShellAction::Symlink {
            target: target.to_path_buf(),
            link: link.clone(),
        });
        if self.dry_run {
            return Ok(());
        }
        if link.symlink_metadata().is_ok() {
            if !overwrite {
                return Ok(());
            }
            remove_entry(&link)?;
        }
        create_symlink(target, &link).context(StdFsSymlinkSnafu { link })
    }

    pub fn symlink_if_exists(&self, target: &Utf8Path, link: &Utf8Path) -> Result<bool, self::Error> {
        let link = self.resolve(link);
        let resolved_target = link.parent().map_or_else(|| target.to_path_buf(), |parent| parent.join(target));
        if resolved_target.exists() {
            self.symlink(target, &link, true)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn write_file(&self, path: &Utf8Path, contents: &str) -> Result<(), self::Error> {
        self.write_inner(path, contents, false)
    }

    pub fn append_file(&self, path: &Utf8Path, contents: &str) -> Result<(), self::Error> {
        self.write_inner(path, contents, true)
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, contents)))]
    fn write_inner(&self, path: &Utf8Path, contents: &str, append: bool) -> Result<(), self::Error> {
        use std::io::Write;

        let path = self.resolve(path);
        self.info(&format!("Write {path}."))?;
        self.record(ShellAction::Write {
            path: path.clone(),
            append,
        });
        if self.dry_run {
            return Ok(());
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(&path)
            .context(StdFsWriteSnafu { path: &path })?;
        file.write_all(contents.as_bytes()).context(StdFsWriteSnafu { path })
    }

    /// Lists a directory sorted by name. A directory missing in dry-run mode is
    /// treated as empty since an earlier skipped step would have created it.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub fn read_dir(&self, path: &Utf8Path) -> Result<Vec<Utf8PathBuf>, self::Error> {
        let path = self.resolve(path);
        if self.dry_run && !path.is_dir() {
            self.note(&format!("Skip listing {path} for dry run."))?;
            return Ok(Vec::new());
        }
        let mut entries = path
            .read_dir_utf8()
            .context(StdFsReadDirSnafu { path: &path })?
            .map(|entry| entry.map(|entry| entry.path().to_path_buf()))
            .collect::<Result<Vec<_>, _>>()
            .context(StdFsReadDirSnafu { path: &path })?;
        entries.sort();
        Ok(entries)
    }

    #[must_use]
    pub fn read_to_string(&self, path: &Utf8Path) -> Option<String> {
        std::fs::read_to_string(self.resolve(path)).ok()
    }
}

fn remove_entry(path: &Utf8Path) -> Result<(), self::Error> {
    let metadata = path.symlink_metadata().context(StdFsMetadataSnafu { path })?;
    if metadata.is_dir() {
        std::fs::remove_dir_all(path).context(StdFsRemoveSnafu { path })
    } else {
        std::fs::remove_file(path).context(StdFsRemoveSnafu { path })
    }
}

fn copy_entry(src: &Utf8Path, dst: &Utf8Path, follow_symlinks: bool) -> Result<(), self::Error> {
    let metadata =
        if follow_symlinks {
            src.metadata()
        } else {
            src.symlink_metadata()
        }
        .context(StdFsMetadataSnafu { path: src })?;
    if metadata.is_symlink() {
        let target = std::fs::read_link(src).context(StdFsReadLinkSnafu { path: src })?;
        return create_symlink(&target, dst).context(StdFsSymlinkSnafu { link: dst });
    }
    if metadata.is_dir() {
        std::fs::create_dir_all(dst).context(StdFsCreateDirAllSnafu { path: dst })?;
        for entry in src.read_dir_utf8().context(StdFsReadDirSnafu { path: src })? {
            let entry = entry.context(StdFsReadDirSnafu { path: src })?;
            copy_entry(entry.path(), &dst.join(entry.file_name()), follow_symlinks)?;
        }
        return Ok(());
    }
    std::fs::copy(src, dst).context(StdFsCopySnafu { src, dst })?;
    Ok(())
}

#[cfg(unix)]
fn create_symlink(target: impl AsRef<std::path::Path>, link: &Utf8Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: impl AsRef<std::path::Path>, link: &Utf8Path) -> std::io::Result<()> {
    let target = target.as_ref();
    let resolved = link.as_std_path().parent().map_or_else(|| target.to_path_buf(), |parent| parent.join(target));
    if resolved.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        (dir, root)
    }

    fn shell(root: &Utf8Path, dry_run: bool) -> Shell {
        Shell::new(ToolchainsLogger::Silent, dry_run, QuietLevel::default(), root)
    }

    #[test]
    fn dry_run_journals_without_effects() {
        let (_dir, root) = scratch();
        let shell = shell(&root, true);
        shell.mkdir(&root.join("build"), true).unwrap();
        shell.write_file(&root.join("build").join("stubs.h"), "").unwrap();
        shell.run("exit 1").unwrap();
        assert!(!root.join("build").exists());
        assert_eq!(shell.commands(), ["exit 1"]);
        assert_eq!(shell.journal().len(), 3);
        assert!(shell.read_dir(&root.join("build")).unwrap().is_empty());
    }

    #[test]
    fn failing_command_carries_exit_code() {
        let (_dir, root) = scratch();
        let shell = shell(&root, false);
        let error = shell.run("exit 3").unwrap_err();
        assert!(matches!(error, Error::CommandFailed { code: Some(3), .. }));
        let ignored = shell.run_with("exit 3", RunOptions::default().ignore_errors()).unwrap();
        assert!(ignored.is_none());
        assert_eq!(shell.counter().get(MessageKind::Warning), 1);
    }

    #[test]
    fn captured_command_sees_cwd_env_and_path() {
        let (_dir, root) = scratch();
        let shell = shell(&root, false);
        let bin = root.join("bin");
        std::fs::create_dir(&bin).unwrap();
        shell.prepend_path(&root.join("other"));
        shell.prepend_path(&bin);
        shell.set_env("ORIGIN", "$$ORIGIN");
        let output = shell
            .run_with("pwd; echo \"$ORIGIN\"; echo \"$PATH\"", RunOptions::default().capture())
            .unwrap()
            .unwrap();
        let lines = output.stdout.lines().collect::<Vec<_>>();
        assert_eq!(dunce::canonicalize(lines[0]).unwrap(), dunce::canonicalize(&root).unwrap());
        assert_eq!(lines[1], "$$ORIGIN");
        assert!(lines[2].starts_with(&format!("{bin}:{}", root.join("other"))));
    }

    #[test]
    fn dir_guard_restores_cwd_after_failure() {
        let (_dir, root) = scratch();
        let shell = shell(&root, false);
        let build = root.join("build");
        std::fs::create_dir(&build).unwrap();
        let result = (|| -> Result<(), Error> {
            let _guard = shell.enter(&build)?;
            assert_eq!(shell.cwd(), build);
            shell.run("false")
        })();
        assert!(result.is_err());
        assert_eq!(shell.cwd(), root);
    }

    #[test]
    fn mkdir_with_remove_recreates_stale_directory() {
        let (_dir, root) = scratch();
        let shell = shell(&root, false);
        let build = root.join("build");
        std::fs::create_dir(&build).unwrap();
        std::fs::write(build.join("config.status"), "stale").unwrap();
        shell.mkdir(&build, true).unwrap();
        assert!(build.is_dir());
        assert!(!build.join("config.status").exists());
        std::fs::write(build.join("keep"), "").unwrap();
        shell.mkdir(&build, false).unwrap();
        assert!(build.join("keep").exists());
    }

    #[test]
    fn copy_handles_trees_files_and_symlinks() {
        let (_dir, root) = scratch();
        let shell = shell(&root, false);
        let src = root.join("src");
        std::fs::create_dir_all(src.join("include")).unwrap();
        std::fs::write(src.join("include").join("a.h"), "a").unwrap();
        std::fs::write(src.join("libfoo.so.1"), "so").unwrap();
        create_symlink("libfoo.so.1", &src.join("libfoo.so")).unwrap();

        shell.copy(&src, &root.join("dst")).unwrap();
        assert_eq!(std::fs::read_to_string(root.join("dst/include/a.h")).unwrap(), "a");
        assert!(root.join("dst/libfoo.so").symlink_metadata().unwrap().is_symlink());

        let followed = CopyOptions {
            follow_symlinks: true,
            ..CopyOptions::default()
        };
        shell.copy_with(&src.join("libfoo.so"), &root.join("lib/libfoo.so"), followed).unwrap();
        assert!(!root.join("lib/libfoo.so").symlink_metadata().unwrap().is_symlink());

        let keep = CopyOptions {
            overwrite: false,
            ..CopyOptions::default()
        };
        std::fs::write(root.join("lib/existing"), "old").unwrap();
        shell.copy_with(&src.join("libfoo.so.1"), &root.join("lib/existing"), keep).unwrap();
        assert_eq!(std::fs::read_to_string(root.join("lib/existing")).unwrap(), "old");

        assert!(!shell.copy_if_exists(&root.join("missing"), &root.join("x"), CopyOptions::default()).unwrap());
    }

    #[test]
    fn symlink_if_exists_resolves_target_next_to_link() {
        let (_dir, root) = scratch();
        let shell = shell(&root, false);
        let lib = root.join("lib");
        std::fs::create_dir(&lib).unwrap();
        assert!(!shell
            .symlink_if_exists(Utf8Path::new("libmvec.a"), &lib.join("libmvec_nonshared.a"))
            .unwrap());
        std::fs::write(lib.join("libmvec.a"), "").unwrap();
        assert!(shell
            .symlink_if_exists(Utf8Path::new("libmvec.a"), &lib.join("libmvec_nonshared.a"))
            .unwrap());
        assert_eq!(
            std::fs::read_link(lib.join("libmvec_nonshared.a")).unwrap(),
            std::path::Path::new("libmvec.a")
        );
    }

    #[test]
    fn append_and_rename_and_remove() {
        let (_dir, root) = scratch();
        let shell = shell(&root, false);
        let limits = root.join("limits.h");
        shell.write_file(&limits, "#pragma once\n").unwrap();
        shell.append_file(&limits, "#define MB_LEN_MAX 16\n").unwrap();
        assert_eq!(
            std::fs::read_to_string(&limits).unwrap(),
            "#pragma once\n#define MB_LEN_MAX 16\n"
        );
        shell.rename(&limits, &root.join("renamed.h")).unwrap();
        assert!(shell.remove_if_exists(&root.join("renamed.h")).unwrap());
        assert!(!shell.remove_if_exists(&root.join("renamed.h")).unwrap());
    }
}
