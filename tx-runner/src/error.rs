//! Error types for the run coordinator
use thiserror::Error;

/// Result alias for this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by a coordinated run
#[derive(Error, Debug)]
pub enum Error {
    /// Passthrough from the core data model
    #[error(transparent)]
    Core(#[from] tx_core::Error),
    /// Passthrough from a port call
    #[error(transparent)]
    Ports(#[from] tx_ports::Error),
    /// Passthrough from the normalization pipeline
    #[error(transparent)]
    Normalization(#[from] tx_normalization::Error),
    /// Passthrough from the categorization pipeline
    #[error(transparent)]
    Categorization(#[from] tx_categorization::Error),
    /// Passthrough from the manual override handler
    #[error(transparent)]
    Overrides(#[from] tx_overrides::Error),
    /// A run of this type is already in progress
    #[error("a {0:?} run is already in progress")]
    AlreadyRunning(tx_core::types::RunType),
}
