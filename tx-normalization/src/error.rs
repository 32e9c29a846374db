//! Error types for the normalization pipeline

use thiserror::Error;

/// Result type for normalization operations
pub type Result<T> = std::result::Result<T, Error>;

/// Normalization-pipeline errors
#[derive(Error, Debug)]
pub enum Error {
    /// Passthrough from the shared taxonomy (validation, transition, etc.)
    #[error(transparent)]
    Core(#[from] tx_core::Error),

    /// Passthrough from a port call (result store, exchange rate)
    #[error(transparent)]
    Ports(#[from] tx_ports::Error),

    /// Source adapter could not map a raw row (unknown source, missing
    /// required column)
    #[error("adapter error: {0}")]
    Adapter(String),

    /// Invalid or missing normalization configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
