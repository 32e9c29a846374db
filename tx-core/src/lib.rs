//! Transaction engine core types
//!
//! Shared data model, error taxonomy, status-transition rules and field
//! validation used by every crate in the workspace.
//!
//! # Invariants
//!
//! - A [`types::Transaction`] is mutated only through [`status`] (lifecycle
//!   fields) or the categorization/override components (category fields) —
//!   never written ad hoc.
//! - Money is always `rust_decimal::Decimal`; no currency amount is ever a
//!   float anywhere in the engine.
//! - `ProcessingStatus` transitions are validated by [`status`]; an invalid
//!   transition is a programmer error, not a per-row failure.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod error;
pub mod status;
pub mod types;
pub mod validate;

// Re-exports
pub use error::{Error, Result};
pub use types::{
    BankSource, BankSourceId, CanonicalField, Category, CategoryId, ExchangeRateSnapshot,
    FieldMapping, ProcessingRun, ProcessingRunId, ProcessingStatus, RawRecord, RawRow, RunStatus,
    RunType, Transaction, TransactionId, TransactionType,
};
