//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "bimeter", version, about = "Bidirectional meter reassembly CLI")]
pub struct Cli {
    /// Path to config TOML; built-in defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Datapoint table CSV (strict header), overrides [datapoints] csv
    #[arg(long, value_name = "FILE")]
    pub datapoints: Option<PathBuf>,

    /// Log and report as JSON instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG wins when set
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reassemble a JSON-lines datapoint capture into published records
    Replay {
        /// Capture file, or "-" for stdin
        #[arg(long, value_name = "FILE", default_value = "-")]
        input: PathBuf,
        /// Print per-device counters to stderr when done
        #[arg(long, action = ArgAction::SetTrue)]
        stats: bool,
    },
    /// Parse and validate the config, then print the resolved options
    CheckConfig,
    /// Print the effective datapoint table as CSV
    Datapoints,
}
