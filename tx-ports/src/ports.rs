//! Port traits (spec component C14)
//!
//! Interfaces the engine defines and the infrastructure must implement.
//! Grounded on the teacher's `#[async_trait] pub trait ... : Send + Sync`
//! shape for adapter/market-maker interfaces — a handful of async methods,
//! no blanket default behaviour beyond the write-back capability flag.

use crate::retry::RetryClassify;
use crate::types::{
    AiCategorizationRequest, AiCategorizationResult, TransactionFieldChanges, TransactionFilter,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use tx_core::types::{BankSource, BankSourceId, Category, RawRow, Transaction, TransactionId};

/// Error returned by a remote port call (exchange rate, AI categorization)
///
/// Distinct from [`crate::Error`] because retryability is a property of
/// *this* call, independent of how the caller ultimately reports failure.
#[derive(Debug, Error, Clone)]
pub enum PortError {
    /// The call did not complete before its deadline
    #[error("timeout: {0}")]
    Timeout(String),
    /// The remote service returned a 5xx-equivalent error
    #[error("server error: {0}")]
    ServerError(String),
    /// The remote service asked the caller to back off
    #[error("rate limited: {0}")]
    RateLimited(String),
    /// Anything else: bad request, auth failure, malformed response — retrying
    /// will not help
    #[error("permanent error: {0}")]
    Permanent(String),
}

impl RetryClassify for PortError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            PortError::Timeout(_) | PortError::ServerError(_) | PortError::RateLimited(_)
        )
    }
}

/// Outcome of appending one transaction to the result store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The transaction was newly inserted
    Inserted,
    /// A transaction with the same stable key already existed; this append
    /// was a no-op
    AlreadyPresent,
}

/// Result of appending one transaction, alongside which one it was
#[derive(Debug, Clone)]
pub struct AppendResult {
    /// The transaction's id
    pub id: TransactionId,
    /// What happened when it was appended
    pub outcome: AppendOutcome,
}

/// Read access to a bank's raw statement export
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// All sources currently marked active
    async fn list_active_sources(&self) -> crate::Result<Vec<BankSource>>;

    /// Every raw row available for one source
    async fn read_raw(&self, source: &BankSource) -> crate::Result<Vec<RawRow>>;

    /// Whether this store can persist a synthesized id back to the source
    ///
    /// Off by default (Open Question 2): a concrete implementation opts in.
    fn supports_write_back(&self) -> bool {
        false
    }

    /// Persist a synthesized `original_transaction_id` back to the source,
    /// for implementations where `supports_write_back()` is `true`
    async fn write_back_id(
        &self,
        _source: &BankSource,
        _row_identity: &str,
        _id: &str,
    ) -> crate::Result<()> {
        Ok(())
    }
}

/// The one piece of shared mutable state: transactions, keyed by id and by
/// stable key
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Append newly normalized transactions
    ///
    /// Idempotent per stable key: appending a transaction whose
    /// `(bank_source_id, original_transaction_id)` already exists returns
    /// `AppendOutcome::AlreadyPresent` rather than inserting a second row.
    async fn append(&self, transactions: Vec<Transaction>) -> crate::Result<Vec<AppendResult>>;

    /// Look up a transaction by its stable key
    async fn find_by_key(
        &self,
        bank_source_id: BankSourceId,
        original_transaction_id: &str,
    ) -> crate::Result<Option<Transaction>>;

    /// Query transactions matching a filter
    async fn query(&self, filter: TransactionFilter) -> crate::Result<Vec<Transaction>>;

    /// Apply field-level changes to one transaction
    async fn update(
        &self,
        id: TransactionId,
        changes: TransactionFieldChanges,
    ) -> crate::Result<()>;
}

/// Read access to the user-managed category list
#[async_trait]
pub trait CategoriesStore: Send + Sync {
    /// All categories, active and inactive
    async fn list(&self) -> crate::Result<Vec<Category>>;
}

/// The AI categorization provider
#[async_trait]
pub trait AICategorizationPort: Send + Sync {
    /// Categorize one batch of transactions
    async fn categorize_batch(
        &self,
        request: AiCategorizationRequest,
    ) -> Result<Vec<AiCategorizationResult>, PortError>;
}

/// The foreign-exchange rate provider
#[async_trait]
pub trait ExchangeRatePort: Send + Sync {
    /// Units of `target` currency that buy one GBP
    async fn get_rate(&self, target: &str) -> Result<Decimal, PortError>;
}

/// Injected time source, so tests can control "now"
pub trait Clock: Send + Sync {
    /// The current instant
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Severity of a log line sent through the [`Logger`] port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Per-row detail
    Debug,
    /// Run/phase boundaries
    Info,
    /// Retryable failures, skipped/duplicate rows
    Warn,
    /// Run aborts
    Error,
}

/// Leveled logging sink
///
/// Messages reaching this port must already have passed through
/// [`tx_core::validate::sanitize_error_message`] — the port itself does not
/// re-sanitize.
pub trait Logger: Send + Sync {
    /// Emit one log line
    fn log(&self, level: LogLevel, message: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_error_retryability_matches_spec_classification() {
        assert!(PortError::Timeout("slow".to_string()).is_retryable());
        assert!(PortError::ServerError("boom".to_string()).is_retryable());
        assert!(PortError::RateLimited("slow down".to_string()).is_retryable());
        assert!(!PortError::Permanent("bad request".to_string()).is_retryable());
    }

    #[test]
    fn system_clock_reports_a_recent_instant() {
        let clock = SystemClock;
        let now = Utc::now();
        let delta = (clock.now() - now).num_milliseconds().abs();
        assert!(delta < 1000);
    }
}
