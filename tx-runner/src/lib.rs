//! Run Coordinator and Composition Root
//!
//! Wires the normalization, categorization and override crates together into
//! runnable normalization/categorization passes, exposes Prometheus metrics
//! for them, and provides the `ingestor` binary entry point.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, missing_debug_implementations, clippy::all)]

pub mod composition;
pub mod coordinator;
pub mod error;
pub mod metrics;

pub use composition::Deployment;
pub use coordinator::RunCoordinator;
pub use error::{Error, Result};
pub use metrics::Metrics;
