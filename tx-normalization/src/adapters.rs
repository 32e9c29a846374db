//! Source adapters (spec component C3)
//!
//! One adapter per bank source. Each adapter owns its column mapping, its
//! date format, its sign convention and (for sources without a native
//! transaction id) the rule for composing a stable reference. Adapters are
//! pure and synchronous: they never perform I/O, they only turn a
//! [`RawRow`] already read by a `SourceStore` into a [`RawRecord`].

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use tx_core::types::{BankSourceId, CanonicalField, RawRecord, RawRow};

/// A source's column-to-canonical-field mapping and row parser
pub trait BankAdapter: Send + Sync {
    /// Which source this adapter serves
    fn source_id(&self) -> BankSourceId;

    /// Whether rows from this source carry an identifier stable enough to
    /// use directly for deduplication
    fn has_native_transaction_id(&self) -> bool;

    /// Map one raw row onto the canonical schema
    ///
    /// When `has_native_transaction_id()` is `false`, the returned record's
    /// `CanonicalField::SourceTransactionId` entry is a deterministically
    /// composed reference, not a native bank id.
    fn parse(&self, raw_row: &RawRow) -> Result<RawRecord>;
}

/// Look up the adapter for a source
pub fn adapter_for(source_id: BankSourceId) -> Box<dyn BankAdapter> {
    match source_id {
        BankSourceId::Monzo => Box::new(MonzoAdapter),
        BankSourceId::Revolut => Box::new(RevolutAdapter),
        BankSourceId::Yonder => Box::new(YonderAdapter),
    }
}

/// Lower-case, strip non-alphanumeric (preserving spaces), collapse
/// whitespace — the canonical description form every adapter produces
pub fn normalize_description(raw: &str) -> String {
    let folded: String = raw
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn column<'a>(row: &'a RawRow, name: &str) -> Option<&'a str> {
    row.get(name).map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn require_column<'a>(row: &'a RawRow, name: &str) -> Result<&'a str> {
    column(row, name).ok_or_else(|| Error::Adapter(format!("missing required column {name}")))
}

fn compose_fields(fields: &[Option<&str>]) -> String {
    fields
        .iter()
        .filter_map(|f| *f)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Monzo current account export
pub struct MonzoAdapter;

impl BankAdapter for MonzoAdapter {
    fn source_id(&self) -> BankSourceId {
        BankSourceId::Monzo
    }

    fn has_native_transaction_id(&self) -> bool {
        true
    }

    fn parse(&self, raw_row: &RawRow) -> Result<RawRecord> {
        let date = require_column(raw_row, "Date")?;
        let time = column(raw_row, "Time");
        let composed_date = match time {
            Some(t) => format!("{date} {t}"),
            None => date.to_string(),
        };

        let name = column(raw_row, "Name");
        let description = column(raw_row, "Description");
        let composed_description = normalize_description(&compose_fields(&[name, description]));

        let amount = require_column(raw_row, "Amount")?;
        let currency = require_column(raw_row, "Currency")?;
        let txid = require_column(raw_row, "Transaction ID")?;
        let raw_type = column(raw_row, "Type").unwrap_or("");
        let notes = column(raw_row, "Notes and #tags");

        let canonical_type = classify_monzo_type(raw_type);

        let mut record = RawRecord::new();
        record.insert(CanonicalField::Date, composed_date);
        record.insert(CanonicalField::Description, composed_description);
        record.insert(CanonicalField::Amount, amount.to_string());
        record.insert(CanonicalField::Currency, currency.to_string());
        record.insert(CanonicalField::SourceTransactionId, txid.to_string());
        record.insert(CanonicalField::Type, canonical_type.to_string());
        if let Some(notes) = notes {
            record.insert(CanonicalField::Notes, notes.to_string());
        }
        Ok(record)
    }
}

/// Not-credit-not-refund-not-incoming -> DEBIT, per spec.md §4.3
fn classify_monzo_type(raw_type: &str) -> &'static str {
    let lower = raw_type.to_ascii_lowercase();
    if lower.contains("refund") || lower.contains("incoming") || lower.contains("credit") {
        "CREDIT"
    } else {
        "DEBIT"
    }
}

/// Revolut account statement export; no native transaction id
pub struct RevolutAdapter;

impl BankAdapter for RevolutAdapter {
    fn source_id(&self) -> BankSourceId {
        BankSourceId::Revolut
    }

    fn has_native_transaction_id(&self) -> bool {
        false
    }

    fn parse(&self, raw_row: &RawRow) -> Result<RawRecord> {
        let completed = column(raw_row, "Completed Date");
        let started = column(raw_row, "Started Date");
        let effective_date = completed.or(started).ok_or_else(|| {
            Error::Adapter("neither Completed Date nor Started Date present".to_string())
        })?;

        let description = require_column(raw_row, "Description")?;
        let amount = require_column(raw_row, "Amount")?;
        let currency = require_column(raw_row, "Currency")?;
        let raw_type = require_column(raw_row, "Type")?;

        let canonical_type = if raw_type.eq_ignore_ascii_case("TOPUP") {
            "CREDIT"
        } else if amount.trim_start().starts_with('-') {
            "DEBIT"
        } else {
            "CREDIT"
        };

        let reference = synthesize_revolut_reference(effective_date, raw_type)?;

        let mut record = RawRecord::new();
        record.insert(CanonicalField::Date, effective_date.to_string());
        record.insert(
            CanonicalField::Description,
            normalize_description(description),
        );
        record.insert(CanonicalField::Amount, amount.to_string());
        record.insert(CanonicalField::Currency, currency.to_string());
        record.insert(CanonicalField::SourceTransactionId, reference);
        record.insert(CanonicalField::Type, canonical_type.to_string());
        Ok(record)
    }
}

/// `{completed_date}T{HH:MM}_{raw_type}`, e.g. `2025-11-15T10:05_CARD_PAYMENT`
fn synthesize_revolut_reference(effective_date: &str, raw_type: &str) -> Result<String> {
    let parsed = tx_core::validate::parse_date(effective_date)
        .map_err(|e| Error::Adapter(format!("could not parse Revolut date for reference: {e}")))?;
    Ok(format!("{}_{}", parsed.format("%Y-%m-%dT%H:%M"), raw_type))
}

/// Yonder credit card export; no native transaction id
pub struct YonderAdapter;

impl BankAdapter for YonderAdapter {
    fn source_id(&self) -> BankSourceId {
        BankSourceId::Yonder
    }

    fn has_native_transaction_id(&self) -> bool {
        false
    }

    fn parse(&self, raw_row: &RawRow) -> Result<RawRecord> {
        let date = require_column(raw_row, "Date/Time of transaction")?;
        let description = require_column(raw_row, "Description")?;
        let amount_gbp = column(raw_row, "Amount (GBP)");
        let amount = require_column(raw_row, "Amount")?;
        let currency = require_column(raw_row, "Currency")?;
        let raw_type = require_column(raw_row, "Debit or Credit")?;
        let country = column(raw_row, "Country");

        let canonical_type = if raw_type.eq_ignore_ascii_case("credit") {
            "CREDIT"
        } else {
            "DEBIT"
        };

        let normalized_description = normalize_description(description);
        let reference = synthesize_yonder_reference(date, &normalized_description)?;

        let mut record = RawRecord::new();
        record.insert(CanonicalField::Date, date.to_string());
        record.insert(CanonicalField::Description, normalized_description);
        record.insert(CanonicalField::Amount, amount.to_string());
        if let Some(amount_gbp) = amount_gbp {
            record.insert(CanonicalField::AmountGbp, amount_gbp.to_string());
        }
        record.insert(CanonicalField::Currency, currency.to_string());
        record.insert(CanonicalField::SourceTransactionId, reference);
        record.insert(CanonicalField::Type, canonical_type.to_string());
        if let Some(country) = country {
            record.insert(CanonicalField::Country, country.to_string());
        }
        Ok(record)
    }
}

/// `{date}T{HH:MM}_{truncated_description}`
fn synthesize_yonder_reference(date: &str, normalized_description: &str) -> Result<String> {
    let parsed: DateTime<Utc> = tx_core::validate::parse_date(date)
        .map_err(|e| Error::Adapter(format!("could not parse Yonder date for reference: {e}")))?;
    let truncated: String = normalized_description.chars().take(16).collect();
    Ok(format!("{}_{}", parsed.format("%Y-%m-%dT%H:%M"), truncated))
}
