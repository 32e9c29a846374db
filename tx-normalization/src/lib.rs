//! Transaction Normalization
//!
//! Turns raw bank export rows into canonical, GBP-denominated, deduplicated
//! `Transaction`s.
//!
//! # Pipeline
//!
//! 1. **Adapter** (C3): map a source's own columns onto the canonical schema.
//! 2. **Validation** (C2): parse and validate date, description, amount,
//!    currency, type.
//! 3. **Duplicate detection** (C5): short-circuit rows already ingested.
//! 4. **Currency conversion** (C4): convert non-GBP amounts via a per-run
//!    rate snapshot.
//! 5. **Status transition** (C1, in `tx-core`): stamp the row `Normalised`.
//!
//! [`normalizer::Normalizer`] composes all of the above for one raw row; a
//! run coordinator (`tx-runner`) drives it across every active source.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod adapters;
pub mod config;
pub mod currency;
pub mod dedup;
pub mod error;
pub mod normalizer;

pub use config::Config;
pub use error::{Error, Result};
pub use normalizer::{NormalizeOutcome, Normalizer};
