//! Error type shared by the monitoring engine, its adapters, and settings.

use thiserror::Error;

/// Errors raised by the engine, its adapters, and settings handling.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Filesystem I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON decode/encode failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// YAML decode/encode failure (settings files).
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// A session or log provider could not deliver data this tick.
    #[error("provider error: {0}")]
    Provider(String),
    /// A notification sink could not deliver an event.
    #[error("sink error: {0}")]
    Sink(String),
    /// Invalid configuration value.
    #[error("settings error: {0}")]
    Settings(String),
    /// A log signature pattern failed to compile.
    #[error("invalid signature pattern '{pattern}': {source}")]
    Signature {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    /// The daemon's event channel is gone.
    #[error("monitor channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, MonitorError>;
