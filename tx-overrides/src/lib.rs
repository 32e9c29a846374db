//! Manual Override Handling
//!
//! Resolves user edits to the "Manual Category" column against the active
//! category list, independently of the normalization and AI categorization
//! pipelines.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, missing_debug_implementations, clippy::all)]

pub mod error;
pub mod handler;
pub mod types;

pub use error::{Error, Result};
pub use handler::OverrideHandler;
pub use types::{BatchEditEvent, CellRange, CellUpdate, EditEvent, EventSource};
