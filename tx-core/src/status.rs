//! Status transition rules for a [`Transaction`] (spec component C1)
//!
//! All of a transaction's lifecycle fields — `processing_status`,
//! `error_message`, and the `timestamp_normalised`/`timestamp_categorised`
//! pair — are mutated exclusively through the functions in this module. No
//! other component should assign `processing_status` directly.

use crate::error::{Error, Result};
use crate::types::{ProcessingStatus, Transaction};
use chrono::{DateTime, Utc};

/// Whether `from -> to` is a transition this module will perform
///
/// Exposed so callers can check before attempting a transition, e.g. to
/// decide whether a row is eligible for a categorisation run at all.
pub fn can_transition(from: ProcessingStatus, to: ProcessingStatus) -> bool {
    use ProcessingStatus::*;
    matches!(
        (from, to),
        (Unprocessed, Normalised)
            | (Normalised, Categorised)
            | (Categorised, Categorised)
            | (Unprocessed, Error)
            | (Normalised, Error)
            | (Categorised, Error)
            | (Error, Normalised)
            | (Error, Categorised)
    )
}

/// A status is terminal when nothing in the ordinary pipeline flow moves a
/// transaction out of it; retries and re-categorisation are the only way
/// forward from here.
pub fn is_terminal(status: ProcessingStatus) -> bool {
    matches!(status, ProcessingStatus::Categorised | ProcessingStatus::Error)
}

/// Whether a transaction can still advance through the normal pipeline
/// without an explicit retry
pub fn can_progress(status: ProcessingStatus) -> bool {
    !matches!(status, ProcessingStatus::Error)
}

/// Transition `Unprocessed -> Normalised` (C6)
pub fn mark_normalised(tx: &mut Transaction, now: DateTime<Utc>) -> Result<()> {
    if tx.processing_status != ProcessingStatus::Unprocessed {
        return Err(Error::InvalidTransition {
            from: tx.processing_status,
            to: ProcessingStatus::Normalised,
        });
    }
    tx.processing_status = ProcessingStatus::Normalised;
    tx.timestamp_normalised = Some(now);
    tx.timestamp_last_modified = now;
    Ok(())
}

/// Transition `Normalised -> Categorised`, or re-stamp an already
/// `Categorised` transaction (C7/C10/C11)
pub fn mark_categorised(tx: &mut Transaction, now: DateTime<Utc>) -> Result<()> {
    match tx.processing_status {
        ProcessingStatus::Normalised | ProcessingStatus::Categorised => {
            tx.processing_status = ProcessingStatus::Categorised;
            tx.timestamp_categorised = Some(now);
            tx.timestamp_last_modified = now;
            Ok(())
        }
        other => Err(Error::InvalidTransition {
            from: other,
            to: ProcessingStatus::Categorised,
        }),
    }
}

/// Transition any non-`Error` status to `Error`
///
/// Deliberately leaves `category_ai_*`/`category_manual_*` untouched: a row
/// that errors during categorisation must not lose a category it already
/// had assigned.
pub fn mark_error(tx: &mut Transaction, message: impl Into<String>, now: DateTime<Utc>) -> Result<()> {
    if tx.processing_status == ProcessingStatus::Error {
        return Err(Error::InvalidTransition {
            from: ProcessingStatus::Error,
            to: ProcessingStatus::Error,
        });
    }
    tx.processing_status = ProcessingStatus::Error;
    tx.error_message = Some(message.into());
    tx.timestamp_last_modified = now;
    Ok(())
}

/// Retry a transaction out of `Error`, into either `Normalised` or
/// `Categorised`
pub fn retry_from_error(
    tx: &mut Transaction,
    target: ProcessingStatus,
    now: DateTime<Utc>,
) -> Result<()> {
    if tx.processing_status != ProcessingStatus::Error {
        return Err(Error::InvalidTransition {
            from: tx.processing_status,
            to: target,
        });
    }
    match target {
        ProcessingStatus::Normalised => tx.timestamp_normalised = Some(now),
        ProcessingStatus::Categorised => tx.timestamp_categorised = Some(now),
        other => {
            return Err(Error::InvalidTransition {
                from: ProcessingStatus::Error,
                to: other,
            })
        }
    }
    tx.processing_status = target;
    tx.error_message = None;
    tx.timestamp_last_modified = now;
    Ok(())
}
