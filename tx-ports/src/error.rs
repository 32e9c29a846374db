//! Error types for the port layer

use thiserror::Error;

/// Result type for port operations
pub type Result<T> = std::result::Result<T, Error>;

/// Port-layer errors
#[derive(Debug, Error)]
pub enum Error {
    /// Passthrough from the shared taxonomy
    #[error(transparent)]
    Core(#[from] tx_core::Error),

    /// A retryable operation exhausted its attempts
    #[error("exhausted retries after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Attempts made, including the first
        attempts: u32,
        /// The last error observed
        source: Box<Error>,
    },

    /// An external service returned an error that is not worth retrying
    #[error("external service error: {0}")]
    ExternalService(String),

    /// (De)serialization of a port payload failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
