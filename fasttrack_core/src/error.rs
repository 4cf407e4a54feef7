//! Error types for the fasttrack_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for fasttrack_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persistent store error
    #[error("Store error: {0}")]
    Store(String),

    /// Rejected user input (nothing was mutated)
    #[error("Invalid entry: {0}")]
    Validation(String),

    /// External weight sync failure (local data untouched)
    #[error("Sync failed: {0}")]
    Sync(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
