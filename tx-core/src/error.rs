//! Shared error taxonomy for the transaction engine
//!
//! Every crate in the workspace wraps or converts into this enum so that a
//! run-level error log (`ProcessingRun::error_log`) can hold one uniform
//! type regardless of which component raised it.

use thiserror::Error;

/// Result type used throughout the engine
pub type Result<T> = std::result::Result<T, Error>;

/// Engine errors, grouped by the taxonomy in the design
#[derive(Error, Debug)]
pub enum Error {
    /// Bad shape/value in a raw record (C2)
    #[error("validation error: field={field} value={value:?} message={message}")]
    Validation {
        /// Canonical field name
        field: String,
        /// Offending raw value
        value: String,
        /// Human-readable reason
        message: String,
    },

    /// Illegal status transition attempted (C1)
    #[error("invalid transition from {from:?} to {to:?}")]
    InvalidTransition {
        /// Originating status
        from: crate::types::ProcessingStatus,
        /// Attempted target status
        to: crate::types::ProcessingStatus,
    },

    /// FX or AI port failure that exhausted retries
    #[error("external service error: {0}")]
    ExternalService(String),

    /// Duplicate, referenced-inactive-category, or sign/amount inconsistency
    #[error("data integrity error: {0}")]
    DataIntegrity(String),

    /// Missing required configuration; aborts the whole run
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Programmer error; must fail loudly and abort the run
    #[error("invalid state transition (bug): {0}")]
    InvalidStateTransition(String),

    /// Cooperative shutdown mid-run
    #[error("cancelled: {0}")]
    Cancellation(String),

    /// Catch-all for error sources this crate does not model explicitly
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
