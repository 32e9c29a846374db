//! Error types for the manual override handler
use thiserror::Error;

/// Result alias for this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the manual override handler
#[derive(Error, Debug)]
pub enum Error {
    /// Passthrough from the core data model
    #[error(transparent)]
    Core(#[from] tx_core::Error),
    /// The configured manual-category column name is empty
    #[error("manual category column must not be empty")]
    InvalidColumn,
}
