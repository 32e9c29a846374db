//! Transaction Normalizer (spec component C6)
//!
//! Composes the adapter (C3), field validation (C2), duplicate detection
//! (C5) and currency conversion (C4) into the one pipeline step that turns a
//! raw row into a `Normalised` `Transaction` — or, short of that, a reason
//! the row didn't make it.

use crate::adapters::BankAdapter;
use crate::currency::CurrencyConverter;
use crate::dedup::DuplicateDetector;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tx_core::types::{
    BankSource, CanonicalField, ProcessingStatus, RawRow, Transaction, TransactionId,
    TransactionType,
};
use tx_ports::SourceStore;

/// What happened to one raw row after a normalization attempt
pub enum NormalizeOutcome {
    /// The row was validated, deduplicated and converted; here's the result
    Normalized(Box<Transaction>),
    /// The row's stable key was already present in the result store
    Duplicate,
    /// Parsing or validation failed before a `Transaction` could be built
    Failed(String),
}

/// Runs one raw row through C3 → C2 → C5 → (ID backfill) → C4 → C1, in that
/// exact order
pub struct Normalizer<'a> {
    adapter: &'a dyn BankAdapter,
    source: &'a BankSource,
    source_store: &'a (dyn SourceStore + Send + Sync),
    detector: DuplicateDetector<'a>,
    converter: &'a CurrencyConverter<'a>,
}

impl<'a> Normalizer<'a> {
    /// A normalizer wired up for one source, for the duration of one run
    pub fn new(
        adapter: &'a dyn BankAdapter,
        source: &'a BankSource,
        source_store: &'a (dyn SourceStore + Send + Sync),
        detector: DuplicateDetector<'a>,
        converter: &'a CurrencyConverter<'a>,
    ) -> Self {
        Self {
            adapter,
            source,
            source_store,
            detector,
            converter,
        }
    }

    /// Normalize one raw row, at instant `now`
    pub async fn normalize(&self, raw_row: &RawRow, now: DateTime<Utc>) -> NormalizeOutcome {
        let record = match self.adapter.parse(raw_row) {
            Ok(record) => record,
            Err(e) => return NormalizeOutcome::Failed(e.to_string()),
        };

        match self.validate_and_convert(&record, now).await {
            Ok(Some(tx)) => NormalizeOutcome::Normalized(Box::new(tx)),
            Ok(None) => NormalizeOutcome::Duplicate,
            Err(e) => NormalizeOutcome::Failed(e.to_string()),
        }
    }

    async fn validate_and_convert(
        &self,
        record: &tx_core::types::RawRecord,
        now: DateTime<Utc>,
    ) -> crate::Result<Option<Transaction>> {
        let date_raw = field(record, CanonicalField::Date)?;
        let transaction_date = tx_core::validate::parse_date(date_raw)?;

        let description_raw = field(record, CanonicalField::Description)?;
        let description =
            tx_core::validate::validate_required_string("description", description_raw)?;

        let amount_raw = field(record, CanonicalField::Amount)?;
        let original_amount_value = tx_core::validate::parse_amount(amount_raw)?;

        let currency_raw = field(record, CanonicalField::Currency)?;
        let original_amount_currency = tx_core::validate::validate_currency(currency_raw)?;

        let type_raw = field(record, CanonicalField::Type)?;
        let transaction_type = parse_transaction_type(type_raw)?;

        let original_amount_value = force_sign(original_amount_value, transaction_type);

        let notes = record.get(&CanonicalField::Notes).cloned();
        let country = record.get(&CanonicalField::Country).cloned();

        let stable_key = field(record, CanonicalField::SourceTransactionId)?.to_string();

        if self
            .detector
            .is_duplicate(self.source.id, &stable_key)
            .await?
        {
            return Ok(None);
        }

        let (gbp_amount_value, exchange_rate_value) =
            if let Some(amount_gbp_raw) = record.get(&CanonicalField::AmountGbp) {
                let amount_gbp = tx_core::validate::parse_amount(amount_gbp_raw)?;
                (force_sign(amount_gbp, transaction_type), None)
            } else {
                let conversion = self
                    .converter
                    .convert(original_amount_value, &original_amount_currency)
                    .await?;
                (force_sign(conversion.gbp_amount, transaction_type), conversion.rate)
            };

        if !self.source.has_native_transaction_id && self.source_store.supports_write_back() {
            self.source_store
                .write_back_id(self.source, &stable_key, &stable_key)
                .await?;
        }

        let mut tx = Transaction {
            id: TransactionId::new(),
            bank_source_id: self.source.id,
            original_transaction_id: stable_key,
            transaction_date,
            description,
            transaction_type,
            notes,
            country,
            original_amount_value,
            original_amount_currency,
            gbp_amount_value,
            exchange_rate_value,
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
        };
        tx_core::status::mark_normalised(&mut tx, now)?;

        Ok(Some(tx))
    }
}

fn field<'r>(
    record: &'r tx_core::types::RawRecord,
    canonical: CanonicalField,
) -> crate::Result<&'r str> {
    record
        .get(&canonical)
        .map(String::as_str)
        .ok_or_else(|| crate::Error::Adapter(format!("adapter did not populate {canonical:?}")))
}

fn parse_transaction_type(raw: &str) -> crate::Result<TransactionType> {
    match raw {
        "DEBIT" => Ok(TransactionType::Debit),
        "CREDIT" => Ok(TransactionType::Credit),
        other => Err(crate::Error::Adapter(format!(
            "adapter produced unrecognised transaction type {other:?}"
        ))),
    }
}

/// DEBIT forces the sign negative, CREDIT forces it positive, regardless of
/// what sign the source row carried
fn force_sign(value: Decimal, transaction_type: TransactionType) -> Decimal {
    match transaction_type {
        TransactionType::Debit => -value.abs(),
        TransactionType::Credit => value.abs(),
    }
}
