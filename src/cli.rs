//! Command-line interface for warden.
use std::str::FromStr;

use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;

/// Wrapper around `LevelFilter` so clap can parse log level names
/// ("off", "error", "warn", "info", "debug", "trace").
#[derive(Clone, Copy, Debug)]
pub struct LogLevelArg(LevelFilter);

impl LogLevelArg {
    /// String representation suitable for `RUST_LOG`.
    pub fn as_str(&self) -> &'static str {
        match self.0 {
            LevelFilter::OFF => "off",
            LevelFilter::ERROR => "error",
            LevelFilter::WARN => "warn",
            LevelFilter::INFO => "info",
            LevelFilter::DEBUG => "debug",
            LevelFilter::TRACE => "trace",
        }
    }
}

impl FromStr for LogLevelArg {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let level = match value.trim().to_ascii_lowercase().as_str() {
            "off" => LevelFilter::OFF,
            "error" => LevelFilter::ERROR,
            "warn" => LevelFilter::WARN,
            "info" => LevelFilter::INFO,
            "debug" => LevelFilter::DEBUG,
            "trace" => LevelFilter::TRACE,
            other => return Err(format!("invalid log level '{other}'")),
        };

        Ok(LogLevelArg(level))
    }
}

/// Command-line interface for warden.
#[derive(Parser)]
#[command(name = "warden", version, author)]
#[command(about = "Tail the captured logs of a supervised process", long_about = None)]
pub struct Cli {
    /// Override the logging verbosity for this invocation only.
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevelArg>,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for warden.
#[derive(Subcommand)]
pub enum Commands {
    /// Continuously print newly captured log lines for one process.
    Tail {
        /// Identifier of the supervised process.
        #[arg(short, long)]
        id: String,

        /// Base URL of the supervisor's API.
        #[arg(short, long, default_value = "http://127.0.0.1:9999")]
        url: String,

        /// Poll interval (e.g., "500ms", "1s", "2m").
        #[arg(long, value_name = "DURATION", default_value = "500ms")]
        interval: String,
    },
}

/// Parses command-line arguments and returns a `Cli` struct.
pub fn parse_args() -> Cli {
    Cli::parse()
}
