//! Parsing and validation of raw field values (spec component C2)
//!
//! Every function here takes an untyped string pulled out of a
//! [`crate::types::RawRecord`] and either returns a typed value or a
//! [`crate::error::Error::Validation`] naming the offending field. Nothing in
//! this module mutates a `Transaction`; that is [`crate::status`]'s job.

use crate::error::{Error, Result};
use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Europe::London;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

const CURRENCY_PATTERN: &str = r"^[A-Z]{3}$";

/// Currencies the FX conversion step (C4) knows how to source a rate for, in
/// addition to GBP itself
pub const SUPPORTED_CURRENCIES: &[&str] = &[
    "GBP", "USD", "EUR", "CAD", "AUD", "JPY", "MAD", "THB", "SGD", "HKD", "ZAR", "NOK", "CNY",
    "SEK",
];

fn validation_err(field: &str, value: &str, message: impl Into<String>) -> Error {
    Error::Validation {
        field: field.to_string(),
        value: value.to_string(),
        message: message.into(),
    }
}

/// Parse a transaction date in any of the formats the supported bank exports
/// use, resolving naive dates/times as UK wall-clock time and converting to
/// UTC.
///
/// Accepts, in order of precedence:
/// - RFC 3339 (`2024-03-05T14:30:00Z`, already zoned)
/// - `YYYY-MM-DD HH:MM[:SS]` (naive, treated as `Europe/London`)
/// - `DD/MM/YYYY HH:MM:SS` and `DD-MM-YYYY HH:MM:SS` (naive, treated as `Europe/London`)
/// - `YYYY-MM-DD` (naive date, midnight `Europe/London`)
/// - `DD/MM/YYYY` and `DD-MM-YYYY` (naive date, midnight `Europe/London`)
pub fn parse_date(raw: &str) -> Result<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(validation_err("date", raw, "date is empty"));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%d/%m/%Y %H:%M:%S",
        "%d-%m-%Y %H:%M:%S",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return uk_local_to_utc(naive, raw);
        }
    }

    for format in ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            let naive = date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
            return uk_local_to_utc(naive, raw);
        }
    }

    Err(validation_err("date", raw, "unrecognised date format"))
}

/// Resolve a naive UK wall-clock time to UTC
///
/// DST transitions make this not always a single unambiguous instant: an
/// ambiguous autumn-clocks-back time resolves to the earlier of the two
/// instants, deterministically, rather than picking at random.
fn uk_local_to_utc(naive: NaiveDateTime, raw: &str) -> Result<DateTime<Utc>> {
    match London.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _latest) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => Err(validation_err(
            "date",
            raw,
            "time falls in the spring-forward gap and does not exist in Europe/London",
        )),
    }
}

/// Parse a signed decimal amount, stripping thousands separators and a
/// leading currency symbol.
///
/// Rejects `NaN`/`Infinity` spellings explicitly: `Decimal` has no such
/// values, but some source exports spell an unparseable cell that way rather
/// than leaving it blank.
pub fn parse_amount(raw: &str) -> Result<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(validation_err("amount", raw, "amount is empty"));
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.contains("nan") || lower.contains("inf") {
        return Err(validation_err("amount", raw, "amount is not a finite number"));
    }

    let cleaned: String = trimmed
        .chars()
        .filter(|c| !matches!(c, '£' | '$' | '€' | ',' | ' '))
        .collect();

    Decimal::from_str(&cleaned)
        .map_err(|e| validation_err("amount", raw, format!("not a decimal: {e}")))
}

/// Validate an ISO 4217 currency code is well formed and one the engine can
/// convert.
pub fn validate_currency(raw: &str) -> Result<String> {
    let upper = raw.trim().to_ascii_uppercase();
    let re = Regex::new(CURRENCY_PATTERN).expect("static pattern is valid");
    if !re.is_match(&upper) {
        return Err(validation_err("currency", raw, "must be a 3-letter ISO 4217 code"));
    }
    if !SUPPORTED_CURRENCIES.contains(&upper.as_str()) {
        return Err(validation_err(
            "currency",
            raw,
            format!("{upper} is not a supported currency"),
        ));
    }
    Ok(upper)
}

/// Parse a UUID, e.g. a category id supplied from an override request
pub fn parse_uuid(field: &str, raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|e| validation_err(field, raw, format!("not a uuid: {e}")))
}

/// Validate a required free-text field is non-empty and within a sane length
pub fn validate_required_string(field: &str, raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(validation_err(field, raw, "must not be empty"));
    }
    if trimmed.chars().count() > 255 {
        return Err(validation_err(field, raw, "exceeds 255 characters"));
    }
    Ok(trimmed.to_string())
}

/// Escape a value that will be written into a spreadsheet cell so a leading
/// `=`, `+`, `-` or `@` cannot be interpreted as a formula by the receiving
/// application.
pub fn sanitize_for_sheet(value: &str) -> String {
    match value.chars().next() {
        Some('=') | Some('+') | Some('-') | Some('@') => format!("'{value}"),
        _ => value.to_string(),
    }
}

/// Mask likely secrets (API keys, bearer tokens, basic-auth URLs, email
/// addresses) out of a message before it is written into a run's error log
/// or surfaced to a client.
pub fn sanitize_error_message(message: &str) -> String {
    let key_value = Regex::new(r"(?i)(api[_-]?key|token|secret|password|auth)\s*[:=]\s*\S+")
        .expect("static pattern is valid");
    let basic_auth = Regex::new(r"://[^/@\s]+:[^/@\s]+@").expect("static pattern is valid");
    let email = Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")
        .expect("static pattern is valid");

    let masked = key_value.replace_all(message, "$1=[REDACTED]");
    let masked = basic_auth.replace_all(&masked, "://[REDACTED]@");
    let masked = email.replace_all(&masked, "[REDACTED]");
    masked.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339_date() {
        let dt = parse_date("2024-03-05T14:30:00Z").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-03-05T14:30:00+00:00");
    }

    #[test]
    fn parses_uk_local_date_only() {
        let dt = parse_date("05/03/2024").unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2024-03-05");
    }

    #[test]
    fn parses_iso_date_only_in_summer_as_bst() {
        // 2024-07-01 midnight in Europe/London (BST, UTC+1) is 2024-06-30 23:00 UTC
        let dt = parse_date("2024-07-01").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-06-30T23:00:00+00:00");
    }

    #[test]
    fn parses_uk_date_and_time_in_winter_as_gmt() {
        let dt = parse_date("15/11/2025 14:23:45").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-11-15T14:23:45+00:00");
    }

    #[test]
    fn rejects_garbage_date() {
        assert!(parse_date("not a date").is_err());
    }

    #[test]
    fn parses_amount_with_symbols_and_commas() {
        assert_eq!(parse_amount("£1,234.56").unwrap(), Decimal::new(123456, 2));
        assert_eq!(parse_amount("-42.00").unwrap(), Decimal::new(-4200, 2));
    }

    #[test]
    fn rejects_nan_and_infinity_spellings() {
        assert!(parse_amount("NaN").is_err());
        assert!(parse_amount("Infinity").is_err());
    }

    #[test]
    fn validates_supported_currency() {
        assert_eq!(validate_currency("gbp").unwrap(), "GBP");
        assert!(validate_currency("GB").is_err());
        assert!(validate_currency("XYZ").is_err());
    }

    #[test]
    fn sanitize_for_sheet_escapes_formula_prefixes() {
        assert_eq!(sanitize_for_sheet("=SUM(A1:A2)"), "'=SUM(A1:A2)");
        assert_eq!(sanitize_for_sheet("TESCO"), "TESCO");
    }

    #[test]
    fn sanitize_error_message_masks_secrets() {
        let masked = sanitize_error_message("request failed: api_key=sk-abc123 for user@example.com");
        assert!(!masked.contains("sk-abc123"));
        assert!(!masked.contains("user@example.com"));
    }
}
