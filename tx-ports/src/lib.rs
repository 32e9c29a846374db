//! Port layer for the transaction engine
//!
//! Defines the boundary the engine's core logic is written against: stores,
//! the AI categorization provider, the exchange rate provider, the clock and
//! the logger. Nothing here knows about a concrete database, HTTP client or
//! log sink — those are composed in `tx-runner`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod ports;
pub mod retry;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use error::{Error, Result};
pub use ports::{
    AICategorizationPort, AppendOutcome, AppendResult, CategoriesStore, Clock, ExchangeRatePort,
    LogLevel, Logger, PortError, ResultStore, SourceStore, SystemClock,
};
pub use retry::{retry, RetryClassify, RetryOutcome, RetryPolicy};
pub use types::{
    AiCategorizationRequest, AiCategorizationResult, AiCategoryInfo, AiSimilarTransaction,
    AiTransactionRequest, TransactionFieldChanges, TransactionFilter,
};
