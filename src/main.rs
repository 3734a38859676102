use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use mdlog::config::{config_file_path, Config};
use mdlog::identity::file_stem;
use mdlog::{markdown, rotation, DiagnosticBuffer, DiagnosticKind, EventContext, Level};

/// Append leveled messages to a rotating markdown log
#[derive(Parser, Debug)]
#[command(name = "mdlog", version)]
#[command(about = "Rotating markdown log writer for administration scripts")]
struct Cli {
    /// Config file (default: ~/.mdlog/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for the log file and archives
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Rotate once the log file exceeds this many bytes
    #[arg(long, global = true)]
    max_size: Option<u64>,

    /// Script name; the log file is <name>.md
    #[arg(short, long, global = true, default_value = "mdlog")]
    name: String,

    /// Script version written to the header
    #[arg(long, global = true, default_value = "1.0")]
    script_version: String,

    /// Do not echo rows to the console
    #[arg(long, global = true)]
    quiet: bool,

    /// Show debug output from the logger itself
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or open the log file and print its path
    Init,
    /// Append a message
    Write {
        /// info, success, warning or error
        #[arg(short, long, default_value = "info")]
        level: Level,
        /// What the script was doing (event sink only)
        #[arg(long)]
        context: Option<String>,
        /// Suggested fix (event sink only)
        #[arg(long)]
        solution: Option<String>,
        /// Part of the script raising the message (event sink only)
        #[arg(long)]
        component: Option<String>,
        message: String,
    },
    /// Print the active log path; fails if it has not been created yet
    Path,
    /// Print the rows of the active log
    Show {
        /// Only the last N rows
        #[arg(long)]
        tail: Option<usize>,
    },
    /// List archived logs
    Archives,
    /// Delete archives older than the retention period
    Prune {
        /// Retention in days (default: archive_retention_days from config)
        #[arg(long)]
        days: Option<u64>,
    },
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "mdlog=debug"
    } else {
        "mdlog=warn,mdlog::event=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(dir) = &cli.log_dir {
        config.log_dir = dir.to_string_lossy().into_owned();
    }
    if let Some(max) = cli.max_size {
        config.max_size_bytes = max;
    }
    if cli.quiet {
        config.console_echo = false;
    }
    Ok(config)
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run(cli)
}

/// Execute one command; a failure the logger swallowed becomes exit code 1
fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(&cli)?;
    let log_dir = config.resolved_log_dir();
    let stem = file_stem(&cli.name);

    match cli.command {
        Command::Init => {
            let logger = config.logger(&cli.name, &cli.script_version).initialize();
            match logger.path() {
                Some(path) => println!("{}", path.display()),
                None => return Ok(ExitCode::FAILURE),
            }
        }
        Command::Path => {
            let path = rotation::active_path(&log_dir, &stem);
            if !path.exists() {
                return Ok(ExitCode::FAILURE);
            }
            println!("{}", path.display());
        }
        Command::Write {
            level,
            context,
            solution,
            component,
            message,
        } => {
            let diagnostics = Arc::new(DiagnosticBuffer::new(32));
            let mut logger = config
                .logger(&cli.name, &cli.script_version)
                .on_diagnostic(diagnostics.handler())
                .initialize();

            let ctx = EventContext {
                context,
                solution,
                component,
            };
            logger.write_with(&message, level, &ctx);

            let dropped = diagnostics.count_of(DiagnosticKind::NotInitialized)
                + diagnostics.count_of(DiagnosticKind::AppendFailed);
            if dropped > 0 {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Show { tail } => {
            let path = rotation::active_path(&log_dir, &stem);
            if !path.exists() {
                eprintln!("No log file at {}", path.display());
                return Ok(ExitCode::FAILURE);
            }
            let rows = markdown::read_entries(&path)?;
            let skip = tail.map_or(0, |n| rows.len().saturating_sub(n));
            for row in rows.iter().skip(skip) {
                println!(
                    "{} {:<7} {}",
                    row.timestamp.format(markdown::TIMESTAMP_FORMAT),
                    row.level.tag(),
                    row.message
                );
            }
        }
        Command::Archives => {
            for archive in rotation::list_archives(&log_dir, &stem)? {
                println!("{}", archive.display());
            }
        }
        Command::Prune { days } => {
            let Some(days) = days.or(config.archive_retention_days) else {
                eprintln!(
                    "No retention period: pass --days or set archive_retention_days in {}",
                    config_file_path().display()
                );
                return Ok(ExitCode::FAILURE);
            };
            let count = mdlog::cleanup_old_archives(&log_dir, &stem, days)?;
            tracing::info!("Deleted {} old archives", count);
            println!("{}", count);
        }
    }

    Ok(ExitCode::SUCCESS)
}
