#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::result_large_err)]

use camino::{Utf8Path, Utf8PathBuf};
use clap::{ArgAction, Args, Parser, Subcommand};
use snafu::prelude::*;
use toolchains::{ConfigFile, GccConfig, LlvmConfig, QuietLevel, Toolchains, ToolchainsLogger};

#[cfg(feature = "tracing")]
use tracing_subscriber::prelude::*;

#[derive(Debug, Snafu)]
pub enum Error {
    Toolchains {
        source: toolchains::Error,
    },
    ToolchainsConfig {
        source: toolchains::config::Error,
    },
    ToolchainsDirectories {
        source: toolchains::directories::Error,
    },
    ToolchainsLogging {
        source: toolchains::logging::Error,
    },
    #[cfg(feature = "tracing")]
    TracingSubscriberTryInit {
        source: tracing_subscriber::util::TryInitError,
    },
}

/// Build native, cross and Canadian GCC and LLVM toolchains from source trees.
#[derive(Debug, Parser)]
#[command(name = "toolchains", version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Directory holding the source trees
    #[arg(long, global = true)]
    home: Option<Utf8PathBuf>,
    /// Import settings from a JSON file; explicit options override them
    #[arg(long = "import", global = true)]
    import: Option<Utf8PathBuf>,
    /// Export the effective settings to a JSON file
    #[arg(long, global = true)]
    export: Option<Utf8PathBuf>,
    /// Print the commands without running them
    #[arg(long, global = true)]
    dry_run: bool,
    /// Repeat to suppress more output
    #[arg(short, long, action = ArgAction::Count, global = true)]
    quiet: u8,
    /// Write messages to a file instead of the console
    #[arg(long, global = true)]
    log_file: Option<Utf8PathBuf>,
    /// Directory holding .gdbinit, linker scripts and python_config.sh
    #[arg(long, global = true)]
    script_dir: Option<Utf8PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build a GCC toolchain
    Gcc(GccArgs),
    /// Build an LLVM toolchain
    Llvm(LlvmArgs),
    /// Complete a triplet prefix
    Complete {
        #[arg(default_value = "")]
        prefix: String,
    },
}

#[derive(Debug, Args)]
struct BuildArgs {
    /// Platform the toolchain is built on
    #[arg(long)]
    build: Option<String>,
    /// Platform the toolchain runs on
    #[arg(long)]
    host: Option<String>,
    #[arg(short, long)]
    jobs: Option<usize>,
    /// Directory the toolchain is installed into
    #[arg(long = "prefix")]
    prefix_dir: Option<Utf8PathBuf>,
    /// zstd compression level
    #[arg(long = "compress")]
    compress_level: Option<u8>,
}

#[derive(Debug, Args)]
struct GccArgs {
    #[command(flatten)]
    build: BuildArgs,
    /// Platform the toolchain generates code for
    #[arg(long)]
    target: Option<String>,
    #[arg(long, overrides_with = "no_gdb")]
    gdb: bool,
    #[arg(long)]
    no_gdb: bool,
    #[arg(long, overrides_with = "no_gdbserver")]
    gdbserver: bool,
    #[arg(long)]
    no_gdbserver: bool,
    #[arg(long, overrides_with = "no_newlib")]
    newlib: bool,
    #[arg(long)]
    no_newlib: bool,
    #[arg(long, overrides_with = "no_nls")]
    nls: bool,
    #[arg(long)]
    no_nls: bool,
    /// List the supported hosts and targets and exit
    #[arg(long)]
    dump: bool,
}

#[derive(Debug, Args)]
struct LlvmArgs {
    #[command(flatten)]
    build: BuildArgs,
    /// Rebuild with the freshly built compiler
    #[arg(long)]
    bootstrap: bool,
}

fn flag(on: bool, off: bool, default: bool) -> bool {
    if off {
        false
    } else {
        on || default
    }
}

/// Copies the command line onto a default configuration. Relative paths are
/// taken relative to `cwd`.
fn cli_config<C: ConfigFile>(global: &GlobalArgs, args: &BuildArgs, cwd: &Utf8Path) -> C {
    let mut config = C::default();
    if let Some(home) = &global.home {
        config.basic_mut().home.clone_from(home);
    }
    let build_config = config.build_config_mut();
    if args.build.is_some() {
        build_config.build.clone_from(&args.build);
    }
    if let Some(jobs) = args.jobs {
        build_config.jobs = jobs;
    }
    if let Some(prefix_dir) = &args.prefix_dir {
        build_config.prefix_dir.clone_from(prefix_dir);
    }
    if let Some(compress_level) = args.compress_level {
        build_config.compress_level = compress_level;
    }
    config.resolve_paths(cwd);
    config
}

/// Merges an imported file under `cli`, pins the build platform and exports the
/// result when asked to.
fn finish_config<C: ConfigFile>(toolchains: &Toolchains, global: &GlobalArgs, cli: C) -> Result<C, self::Error> {
    let mut config =
        if let Some(path) = &global.import {
            C::merge(C::load(path).context(ToolchainsConfigSnafu)?, cli)
        } else {
            cli
        };
    config
        .build_config_mut()
        .resolve_build()
        .context(ToolchainsConfigSnafu)?;
    config.check().context(ToolchainsConfigSnafu)?;
    if let Some(path) = &global.export {
        config.save(toolchains.shell(), path).context(ToolchainsConfigSnafu)?;
    }
    Ok(config)
}

fn gcc(toolchains: &Toolchains, global: &GlobalArgs, args: &GccArgs, cwd: &Utf8Path) -> Result<(), self::Error> {
    let mut cli = cli_config::<GccConfig>(global, &args.build, cwd);
    cli.gdb = flag(args.gdb, args.no_gdb, cli.gdb);
    cli.gdbserver = flag(args.gdbserver, args.no_gdbserver, cli.gdbserver);
    cli.newlib = flag(args.newlib, args.no_newlib, cli.newlib);
    cli.nls = flag(args.nls, args.no_nls, cli.nls);
    let config = finish_config(toolchains, global, cli)?;
    toolchains
        .build_gcc(&config, args.build.host.as_deref(), args.target.as_deref())
        .context(ToolchainsSnafu)
}

fn llvm(toolchains: &Toolchains, global: &GlobalArgs, args: &LlvmArgs, cwd: &Utf8Path) -> Result<(), self::Error> {
    let mut cli = cli_config::<LlvmConfig>(global, &args.build, cwd);
    cli.bootstrap = args.bootstrap;
    let config = finish_config(toolchains, global, cli)?;
    toolchains
        .build_llvm(&config, args.build.host.as_deref())
        .context(ToolchainsSnafu)
}

fn main() -> Result<(), self::Error> {
    #[cfg(feature = "tracing")]
    tracing_subscriber::registry()
        .with(tracing_forest::ForestLayer::default())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .context(TracingSubscriberTryInitSnafu)?;

    let Cli { global, command } = Cli::parse();

    match &command {
        Command::Complete { prefix } => {
            let completer = toolchains::completer(["--help"]).context(ToolchainsSnafu)?;
            for candidate in completer.complete(prefix) {
                println!("{candidate}");
            }
            return Ok(());
        },
        Command::Gcc(args) if args.dump => {
            print!("{}", toolchains::supported_platforms());
            return Ok(());
        },
        Command::Gcc(_) | Command::Llvm(_) => {},
    }

    let cwd = toolchains::directories::current_dir().context(ToolchainsDirectoriesSnafu)?;
    let logger =
        if let Some(path) = &global.log_file {
            ToolchainsLogger::log_file(path).context(ToolchainsLoggingSnafu)?
        } else {
            ToolchainsLogger::Console
        };
    let toolchains = Toolchains::builder()
        .logger(logger)
        .dry_run(global.dry_run)
        .quiet(QuietLevel(global.quiet))
        .script_dir(global.script_dir.as_deref())
        .cwd(&cwd)
        .build()
        .context(ToolchainsSnafu)?;

    match &command {
        Command::Gcc(args) => gcc(&toolchains, &global, args, &cwd),
        Command::Llvm(args) => llvm(&toolchains, &global, args, &cwd),
        Command::Complete { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_line_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn negated_flags_win_over_defaults() {
        assert!(flag(false, false, true));
        assert!(!flag(false, true, true));
        assert!(flag(true, false, false));
        assert!(!flag(false, false, false));
    }

    #[test]
    fn command_line_values_land_in_config() {
        let cli = Cli::parse_from([
            "toolchains",
            "--home",
            "/src",
            "gcc",
            "--build",
            "x86_64-linux-gnu",
            "--prefix",
            "/opt",
            "-j",
            "4",
            "--no-gdb",
            "--nls",
        ]);
        let Command::Gcc(args) = &cli.command else {
            panic!("expected the gcc subcommand");
        };
        let config = cli_config::<GccConfig>(&cli.global, &args.build, Utf8Path::new("/"));
        assert_eq!(config.basic.home, "/src");
        assert_eq!(config.build_config.prefix_dir, "/opt");
        assert_eq!(config.build_config.jobs, 4);
        assert_eq!(config.build_config.build.as_deref(), Some("x86_64-linux-gnu"));
        assert!(!flag(args.gdb, args.no_gdb, true));
        assert!(flag(args.nls, args.no_nls, false));
    }
}
