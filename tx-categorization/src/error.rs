//! Error types for the categorization pipeline

use thiserror::Error;

/// Result type for categorization operations
pub type Result<T> = std::result::Result<T, Error>;

/// Categorization-pipeline errors
#[derive(Error, Debug)]
pub enum Error {
    /// Passthrough from the shared taxonomy (validation, transition, etc.)
    #[error(transparent)]
    Core(#[from] tx_core::Error),

    /// Passthrough from a port call (result store, categories store, AI port)
    #[error(transparent)]
    Ports(#[from] tx_ports::Error),

    /// No active categories were available to categorize against
    #[error("no active categories available")]
    NoActiveCategories,

    /// A transaction not yet normalised was passed to the categorizer
    #[error("transaction {0} is still UNPROCESSED")]
    NotNormalised(tx_core::types::TransactionId),

    /// Invalid or missing categorization configuration (e.g. weights that
    /// don't sum to 1.0 within tolerance)
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
