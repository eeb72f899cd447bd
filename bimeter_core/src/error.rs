use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum CoreError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("publish error: {0}")]
    Publish(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid input: {0}")]
    Input(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("empty datapoint table")]
    EmptyTable,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
    #[error("invalid config for device {device}: {reason}")]
    InvalidDevice { device: String, reason: &'static str },
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

/// Map a trait-boundary error from a `Transport` to a typed `CoreError`.
///
/// Decode failures surface as `Input` so the CLI can point at the capture
/// file rather than the link.
pub fn map_transport_error(e: &(dyn std::error::Error + 'static)) -> CoreError {
    if let Some(io) = e.downcast_ref::<std::io::Error>()
        && io.kind() == std::io::ErrorKind::InvalidData
    {
        return CoreError::Input(io.to_string());
    }
    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("parse") || lower.contains("invalid") {
        CoreError::Input(s)
    } else {
        CoreError::Transport(s)
    }
}
