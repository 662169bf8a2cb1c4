//! Error types for walletpulse-core
//!
//! Translation itself never fails; these errors only exist at the edges
//! (configuration, snapshot loading, HTTP transport).

use thiserror::Error;

/// Main error type for the walletpulse-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Metrics endpoint / HTTP error
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result type alias for walletpulse-core
pub type Result<T> = std::result::Result<T, Error>;
