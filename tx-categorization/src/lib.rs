//! Transaction Categorization
//!
//! Resolves free-text category names against the active category list,
//! learns from categorisation history, blends that with the AI categorizer's
//! own confidence, and drives the AI Port itself.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, missing_debug_implementations, clippy::all)]

pub mod categorizer;
pub mod confidence;
pub mod config;
pub mod error;
pub mod history;
pub mod resolver;

pub use categorizer::Categorizer;
pub use config::Config;
pub use error::{Error, Result};
pub use history::{CategorySuggestion, MatchType, SimilarityMatch};
pub use resolver::ResolveResult;
