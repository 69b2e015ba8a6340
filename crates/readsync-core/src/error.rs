//! Core error types for readsync-core.
//!
//! Every fallible operation in the library returns [`SyncError`]. Remote
//! failures are not retried here (the ISBN catalog lookup is the one
//! exception, see [`crate::catalog`]); they propagate up to the CLI, which
//! aborts the run.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for readsync-core.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Reading source (WeRead) returned an error or an unexpected payload.
    #[error("Reading source error: {0}")]
    Source(String),

    /// Destination store (Notion) rejected a request.
    #[error("Notion API error (HTTP {status}): {message}")]
    Store { status: u16, message: String },

    /// External catalog lookup failed.
    #[error("Catalog lookup error: {0}")]
    Catalog(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Transport-level HTTP failure
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Missing required configuration key
    #[error("Missing required configuration key: {0}")]
    MissingKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::Config(ConfigError::InvalidValue {
            key: "url".to_string(),
            message: err.to_string(),
        })
    }
}

/// Result type alias for SyncError
pub type Result<T, E = SyncError> = std::result::Result<T, E>;
