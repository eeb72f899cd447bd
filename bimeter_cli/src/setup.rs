//! Config, datapoint table and logging setup shared by all commands.

use std::path::{Path, PathBuf};

use bimeter_config::Config;
use bimeter_core::DatapointTable;
use bimeter_core::error::{CoreError, Result};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::cli::FILE_GUARD;

fn config_error(e: impl std::fmt::Display) -> eyre::Report {
    eyre::Report::new(CoreError::Config(e.to_string()))
}

/// Read and validate the TOML config; built-in defaults when `path` is `None`.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| config_error(format!("read {}: {e}", path.display())))?;
    let cfg = bimeter_config::load_toml(&text)
        .map_err(|e| config_error(format!("parse {}: {e}", path.display())))?;
    cfg.validate()
        .map_err(|e| config_error(format!("{}: {e}", path.display())))?;
    Ok(cfg)
}

/// CSV path to use: the CLI flag, else `[datapoints] csv` relative to the
/// config file's directory.
pub fn datapoints_path(cli: Option<&Path>, config: Option<&Path>, cfg: &Config) -> Option<PathBuf> {
    if let Some(p) = cli {
        return Some(p.to_path_buf());
    }
    let csv = PathBuf::from(cfg.datapoints.csv.as_ref()?);
    if csv.is_relative()
        && let Some(dir) = config.and_then(Path::parent)
    {
        return Some(dir.join(csv));
    }
    Some(csv)
}

pub fn load_table(path: Option<&Path>) -> Result<DatapointTable> {
    let Some(path) = path else {
        return Ok(DatapointTable::bidirectional_meter());
    };
    // Keep the loader's message intact so the header hint can match on it.
    let rows = bimeter_config::load_datapoints_csv(path).map_err(config_error)?;
    tracing::debug!(path = %path.display(), rows = rows.len(), "datapoint table loaded");
    Ok(DatapointTable::from(rows.as_slice()))
}

/// Console logs go to stderr (stdout carries records); `[logging] file`
/// adds a JSON file sink with the configured rotation.
pub fn init_tracing(json: bool, level: &str, logging: &bimeter_config::Logging) -> Result<()> {
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(config_error)?;
    let console = if json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    };

    let file_layer = match logging.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| config_error(format!("logging.file {file:?} has no file name")))?;
            let appender = match logging.rotation.as_deref().unwrap_or("never") {
                "daily" => tracing_appender::rolling::daily(dir, name),
                "hourly" => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            let file_filter = EnvFilter::try_new(logging.level.as_deref().unwrap_or("info"))
                .map_err(config_error)?;
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .with_filter(file_filter),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console.with_filter(console_filter))
        .with(file_layer)
        .try_init()
        .map_err(|e| eyre::eyre!("init tracing: {e}"))
}
