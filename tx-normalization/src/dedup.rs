//! Duplicate detection by stable key (spec component C5)
//!
//! The stable key is always `(bank_source_id, original_transaction_id)`.
//! For a source with a native id that id came straight off the row; for a
//! source without one, the adapter (C3) already composed a deterministic,
//! human-readable reference at parse time, so this module never has to know
//! which case it's looking at — it just asks the result store.

use tx_core::types::{BankSourceId, Transaction};
use tx_ports::ResultStore;

/// Looks up whether a raw row's stable key has already been ingested
pub struct DuplicateDetector<'a> {
    store: &'a (dyn ResultStore + Send + Sync),
}

impl<'a> DuplicateDetector<'a> {
    /// A detector backed by `store`
    pub fn new(store: &'a (dyn ResultStore + Send + Sync)) -> Self {
        Self { store }
    }

    /// Whether a transaction with this stable key already exists
    ///
    /// A hit is treated as a duplicate regardless of whether the rest of the
    /// row's fields match — the stable key alone is the identity.
    pub async fn is_duplicate(
        &self,
        bank_source_id: BankSourceId,
        original_transaction_id: &str,
    ) -> crate::Result<bool> {
        Ok(self
            .store
            .find_by_key(bank_source_id, original_transaction_id)
            .await?
            .is_some())
    }

    /// The existing transaction for this stable key, if any
    pub async fn existing(
        &self,
        bank_source_id: BankSourceId,
        original_transaction_id: &str,
    ) -> crate::Result<Option<Transaction>> {
        Ok(self
            .store
            .find_by_key(bank_source_id, original_transaction_id)
            .await?)
    }
}
