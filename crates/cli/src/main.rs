//! Canteen CLI - command-line client for the school canteen backend

mod commands;
mod config;
mod logging;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::Commands;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{Level, error, info};

#[derive(Parser)]
#[command(name = "canteen")]
#[command(about = "Command-line client for the school canteen")]
#[command(version)]
struct Cli {
    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "info")]
    log_level: LogLevel,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(short = 'c', long, global = true, env = "CANTEEN_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for the stored session and logs
    #[arg(short = 'd', long, global = true)]
    data_dir: Option<PathBuf>,

    /// Timeout for the whole command in seconds (0 = no timeout)
    #[arg(short = 't', long, global = true, default_value = "30")]
    timeout: u64,

    /// Disable file logging (only log to stderr)
    #[arg(long, global = true)]
    no_file_log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::load(cli.config.as_deref(), cli.data_dir)?;
    logging::init_logging(cli.log_level.into(), &config.data_dir, cli.no_file_log)?;

    info!("Starting canteen CLI");

    // Watching runs until interrupted, so it never gets a deadline
    let timeout = if cli.timeout == 0 || cli.command.is_long_running() {
        None
    } else {
        Some(Duration::from_secs(cli.timeout))
    };

    let outcome = match timeout {
        None => cli.command.execute(config).await,
        Some(duration) => {
            match tokio::time::timeout(duration, cli.command.execute(config)).await {
                Ok(result) => result,
                Err(_) => {
                    error!("Command timed out after {} seconds", cli.timeout);
                    std::process::exit(1);
                }
            }
        }
    };

    match outcome {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {e:#}");
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}
