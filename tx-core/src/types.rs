//! Core data model for the transaction engine
//!
//! All types are designed for:
//! - Exact arithmetic (Decimal for money)
//! - Deterministic (de)serialization (serde)
//! - Clear ownership: a `Transaction`'s lifecycle fields are mutated only
//!   through [`crate::status`], never written ad hoc by a component.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Identifies a [`Transaction`] within the engine's own record keeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Mint a fresh, random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID, e.g. one loaded back from the result store
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a spending [`Category`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryId(Uuid);

impl CategoryId {
    /// Mint a fresh, random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for CategoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies one run of the normalisation or categorisation pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessingRunId(Uuid);

impl ProcessingRunId {
    /// Mint a fresh, random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ProcessingRunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProcessingRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A bank or card provider feeding raw statement rows into the engine
///
/// Closed for now: adding a new source is a deliberate, code-reviewed change
/// (the field mapping has to be authored by hand), so unlike [`CanonicalField`]
/// this is not `#[non_exhaustive]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BankSourceId {
    /// Monzo current account export
    Monzo,
    /// Revolut account statement export
    Revolut,
    /// Yonder credit card export
    Yonder,
}

impl BankSourceId {
    /// Short machine-stable code, used as the hash-map key in config and storage
    pub fn code(&self) -> &'static str {
        match self {
            BankSourceId::Monzo => "monzo",
            BankSourceId::Revolut => "revolut",
            BankSourceId::Yonder => "yonder",
        }
    }

    /// Parse from a source code
    pub fn from_code(s: &str) -> Option<Self> {
        match s {
            "monzo" => Some(BankSourceId::Monzo),
            "revolut" => Some(BankSourceId::Revolut),
            "yonder" => Some(BankSourceId::Yonder),
            _ => None,
        }
    }
}

impl fmt::Display for BankSourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A field name in the engine's canonical schema, independent of any one
/// bank's column headings
///
/// `#[non_exhaustive]` because a new source adapter may need a field the
/// current set doesn't cover yet (e.g. a merchant category code some banks
/// export); adding one is additive and shouldn't break downstream matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum CanonicalField {
    /// Transaction date (and time, where the source provides it)
    Date,
    /// Free-text merchant/counterparty description
    Description,
    /// Signed transaction amount in the original currency
    Amount,
    /// Amount already denominated in GBP, where the source provides one
    /// directly (preferred over `Amount` + conversion when present)
    AmountGbp,
    /// ISO 4217 code of the original currency
    Currency,
    /// The source's own identifier for the row, if it has one
    SourceTransactionId,
    /// Debit or credit, where the source separates it from the amount's sign
    Type,
    /// Free-text notes field
    Notes,
    /// Counterparty country, where the source provides it
    Country,
}

/// Column names in a bank's raw export that map onto one [`CanonicalField`]
pub type FieldMapping = HashMap<CanonicalField, Vec<String>>;

/// A single row of a raw statement export, keyed by the source's own column
/// headings, before any canonicalisation
pub type RawRow = HashMap<String, String>;

/// A row after C3 has mapped source columns onto canonical fields, but before
/// C2 has parsed and validated the string values into typed ones
pub type RawRecord = HashMap<CanonicalField, String>;

/// Configuration for one bank source: which columns map to which canonical
/// fields, and whether the source carries its own stable transaction id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankSource {
    /// Which source this is
    pub id: BankSourceId,
    /// Name shown in reports and logs
    pub display_name: String,
    /// Column mapping used by C3 to build a [`RawRecord`] from a [`RawRow`]
    pub field_mapping: FieldMapping,
    /// Whether rows from this source carry an identifier stable enough to use
    /// directly as the duplicate-detection key
    pub has_native_transaction_id: bool,
    /// Sources can be retired without deleting history; an inactive source is
    /// skipped by the normalisation run
    pub is_active: bool,
}

/// Debit or credit, independent of the sign convention a source's export uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    /// Money leaving the account
    Debit,
    /// Money entering the account
    Credit,
}

/// Where a [`Transaction`] sits in the normalise → categorise pipeline
///
/// See [`crate::status`] for the transition rules between these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingStatus {
    /// Loaded from a raw source row, not yet normalised
    Unprocessed,
    /// Validated, deduplicated and converted to GBP
    Normalised,
    /// Assigned a category, automatically or by a human
    Categorised,
    /// Failed normalisation or categorisation; see `error_message`
    Error,
}

/// A spending category a transaction can be assigned to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Stable identifier
    pub id: CategoryId,
    /// Name shown to users and used as the AI categorizer's label space
    pub name: String,
    /// Longer description used as categorizer guidance
    pub description: String,
    /// Example descriptions that should map to this category
    pub examples: Vec<String>,
    /// Retired categories are never assigned to new transactions, but
    /// existing assignments are left alone
    pub is_active: bool,
    /// When the category was created
    pub created_at: DateTime<Utc>,
    /// When the category was last edited
    pub modified_at: DateTime<Utc>,
}

/// An exchange rate fetched for one currency during a normalisation run
///
/// All rates convert into GBP, the engine's one settlement currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRateSnapshot {
    /// Currency being converted from
    pub currency: String,
    /// How many units of `currency` buy one GBP
    pub rate: Decimal,
    /// When the rate was fetched
    pub fetched_at: DateTime<Utc>,
    /// Which provider served the rate
    pub provider: String,
    /// The run that fetched it; rates are cached per run, never across runs
    pub processing_run_id: ProcessingRunId,
}

/// Which pipeline stage a [`ProcessingRun`] executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunType {
    /// C3–C6: ingest raw rows, validate, dedupe, convert to GBP
    Normalisation,
    /// C7–C10: assign categories to normalised transactions
    Categorisation,
}

/// Outcome of a [`ProcessingRun`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Still processing
    InProgress,
    /// Every row succeeded
    Completed,
    /// Aborted before completion (configuration or programmer error)
    Failed,
    /// Finished, but one or more rows ended in `ProcessingStatus::Error`
    PartialSuccess,
}

/// A record of one execution of the normalisation or categorisation pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingRun {
    /// Stable identifier
    pub id: ProcessingRunId,
    /// Which stage this run executed
    pub run_type: RunType,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished, if it has
    pub completed_at: Option<DateTime<Utc>>,
    /// Current outcome
    pub status: RunStatus,
    /// Rows looked at
    pub processed: u64,
    /// Rows that reached the next status cleanly
    pub succeeded: u64,
    /// Rows that ended in `ProcessingStatus::Error`
    pub failed: u64,
    /// Human-readable errors, one per failed row, in processing order
    pub error_log: Vec<String>,
    /// Rates fetched during this run (normalisation runs only)
    pub rate_snapshots: Vec<ExchangeRateSnapshot>,
}

impl ProcessingRun {
    /// Start a new, empty run
    pub fn start(run_type: RunType, now: DateTime<Utc>) -> Self {
        Self {
            id: ProcessingRunId::new(),
            run_type,
            started_at: now,
            completed_at: None,
            status: RunStatus::InProgress,
            processed: 0,
            succeeded: 0,
            failed: 0,
            error_log: Vec::new(),
            rate_snapshots: Vec::new(),
        }
    }

    /// Record a successfully processed row
    pub fn record_success(&mut self) {
        self.processed += 1;
        self.succeeded += 1;
    }

    /// Record a failed row
    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.processed += 1;
        self.failed += 1;
        self.error_log.push(message.into());
    }

    /// Close out the run, deriving `status` from what was recorded
    pub fn finish(&mut self, now: DateTime<Utc>) {
        self.completed_at = Some(now);
        self.status = if self.failed == 0 {
            RunStatus::Completed
        } else if self.succeeded == 0 && self.processed > 0 {
            RunStatus::Failed
        } else {
            RunStatus::PartialSuccess
        };
    }

    /// Abort the run outright, e.g. on a configuration error
    pub fn abort(&mut self, now: DateTime<Utc>, message: impl Into<String>) {
        self.completed_at = Some(now);
        self.status = RunStatus::Failed;
        self.error_log.push(message.into());
    }
}

/// One normalised and (eventually) categorised bank transaction
///
/// Owned exclusively by the result store; every field after `description` is
/// mutated only through [`crate::status`] or the C7–C11 categorization and
/// override components, never written directly outside the pipeline stage
/// responsible for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Stable identifier
    pub id: TransactionId,
    /// Which bank this row came from
    pub bank_source_id: BankSourceId,
    /// The source's own transaction id, if any, else a synthesized stable key
    pub original_transaction_id: String,
    /// When the transaction occurred, normalised to UTC
    pub transaction_date: DateTime<Utc>,
    /// Free-text merchant/counterparty description
    pub description: String,
    /// Debit or credit
    pub transaction_type: TransactionType,
    /// Free-text notes, where the source provides them
    pub notes: Option<String>,
    /// Counterparty country, where the source provides it
    pub country: Option<String>,
    /// Amount in the original currency, signed per `transaction_type`
    pub original_amount_value: Decimal,
    /// ISO 4217 code of the original currency
    pub original_amount_currency: String,
    /// Amount converted to GBP
    pub gbp_amount_value: Decimal,
    /// Rate used for the conversion; `None` when the source currency was
    /// already GBP
    pub exchange_rate_value: Option<Decimal>,
    /// Category assigned by the AI categorizer
    pub category_ai_id: Option<CategoryId>,
    /// Denormalised category name, for display without a join
    pub category_ai_name: Option<String>,
    /// Confidence of the AI assignment, 0-100
    pub category_confidence_score: Option<u8>,
    /// Category assigned or confirmed by a human, overriding the AI one
    pub category_manual_id: Option<CategoryId>,
    /// Denormalised category name, for display without a join
    pub category_manual_name: Option<String>,
    /// Current pipeline status
    pub processing_status: ProcessingStatus,
    /// Set when `processing_status` is `Error`
    pub error_message: Option<String>,
    /// When the row was first loaded into the engine
    pub timestamp_created: DateTime<Utc>,
    /// When any field was last changed
    pub timestamp_last_modified: DateTime<Utc>,
    /// When the row reached `Normalised`
    pub timestamp_normalised: Option<DateTime<Utc>>,
    /// When the row reached `Categorised`
    pub timestamp_categorised: Option<DateTime<Utc>>,
}

impl Transaction {
    /// The category a user sees: the manual override if present, else the AI
    /// assignment
    pub fn effective_category_id(&self) -> Option<CategoryId> {
        self.category_manual_id.or(self.category_ai_id)
    }

    /// Name to pair with `effective_category_id`
    pub fn effective_category_name(&self) -> Option<&str> {
        self.category_manual_name
            .as_deref()
            .or(self.category_ai_name.as_deref())
    }

    /// Whether a human has overridden the AI's category
    pub fn has_manual_override(&self) -> bool {
        self.category_manual_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bank_source_id_round_trips_through_code() {
        for id in [BankSourceId::Monzo, BankSourceId::Revolut, BankSourceId::Yonder] {
            assert_eq!(BankSourceId::from_code(id.code()), Some(id));
        }
        assert_eq!(BankSourceId::from_code("amex"), None);
    }

    #[test]
    fn processing_run_partial_success_when_some_rows_fail() {
        let mut run = ProcessingRun::start(RunType::Normalisation, Utc::now());
        run.record_success();
        run.record_failure("boom");
        run.finish(Utc::now());
        assert_eq!(run.status, RunStatus::PartialSuccess);
        assert_eq!(run.processed, 2);
    }

    #[test]
    fn processing_run_completed_when_nothing_fails() {
        let mut run = ProcessingRun::start(RunType::Categorisation, Utc::now());
        run.record_success();
        run.record_success();
        run.finish(Utc::now());
        assert_eq!(run.status, RunStatus::Completed);
    }

    #[test]
    fn effective_category_prefers_manual_override() {
        let mut tx = sample_transaction();
        tx.category_ai_id = Some(CategoryId::new());
        tx.category_ai_name = Some("Groceries".to_string());
        let manual_id = CategoryId::new();
        tx.category_manual_id = Some(manual_id);
        tx.category_manual_name = Some("Dining".to_string());

        assert_eq!(tx.effective_category_id(), Some(manual_id));
        assert_eq!(tx.effective_category_name(), Some("Dining"));
        assert!(tx.has_manual_override());
    }

    fn sample_transaction() -> Transaction {
        let now = Utc::now();
        Transaction {
            id: TransactionId::new(),
            bank_source_id: BankSourceId::Monzo,
            original_transaction_id: "tx_00001".to_string(),
            transaction_date: now,
            description: "TESCO STORES".to_string(),
            transaction_type: TransactionType::Debit,
            notes: None,
            country: Some("GB".to_string()),
            original_amount_value: Decimal::new(-1050, 2),
            original_amount_currency: "GBP".to_string(),
            gbp_amount_value: Decimal::new(-1050, 2),
            exchange_rate_value: None,
            category_ai_id: None,
            category_ai_name: None,
            category_confidence_score: None,
            category_manual_id: None,
            category_manual_name: None,
            processing_status: ProcessingStatus::Unprocessed,
            error_message: None,
            timestamp_created: now,
            timestamp_last_modified: now,
            timestamp_normalised: None,
            timestamp_categorised: None,
        }
    }
}
