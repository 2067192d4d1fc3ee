//! Unified error types for Vigil

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Vigil operations
#[derive(Error, Debug)]
pub enum Error {
    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // Config errors
    #[error("Failed to read config file '{path}': {source}")]
    ConfigRead { path: PathBuf, source: io::Error },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    // Store errors
    #[error("Failure store error: {0}")]
    Store(#[from] rusqlite::Error),

    // Lock errors
    #[error("Failed to open lock file '{path}': {source}")]
    LockOpen { path: PathBuf, source: io::Error },

    // Heartbeat errors (writer side only; the reader never errors)
    #[error("Failed to encode heartbeat: {0}")]
    HeartbeatEncode(#[from] serde_json::Error),

    // Cron errors
    #[error("Crontab operation failed: {0}")]
    Cron(String),

    // Logging errors
    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

/// Result type alias for Vigil operations
pub type Result<T> = std::result::Result<T, Error>;
