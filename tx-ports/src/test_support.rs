//! In-memory fakes for every port trait, for use in other crates' tests
//!
//! Kept behind a feature/test gate rather than `#[cfg(test)]` alone because
//! downstream crates (normalization, categorization, overrides, runner) need
//! to compose these fakes in their own test modules.

use crate::ports::{
    AICategorizationPort, AppendOutcome, AppendResult, CategoriesStore, Clock, ExchangeRatePort,
    LogLevel, Logger, PortError, ResultStore, SourceStore,
};
use crate::types::{AiCategorizationRequest, AiCategorizationResult, TransactionFieldChanges, TransactionFilter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;
use tx_core::types::{BankSource, BankSourceId, Category, RawRow, Transaction, TransactionId};

/// A `SourceStore` backed by an in-memory map of source to raw rows
#[derive(Debug, Default)]
pub struct FakeSourceStore {
    sources: Vec<BankSource>,
    rows: HashMap<BankSourceId, Vec<RawRow>>,
    write_backs: Mutex<Vec<(String, String)>>,
}

impl FakeSourceStore {
    /// An empty store with no sources registered
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source and the raw rows it should yield
    pub fn with_source(mut self, source: BankSource, rows: Vec<RawRow>) -> Self {
        self.rows.insert(source.id, rows);
        self.sources.push(source);
        self
    }

    /// Row identities that `write_back_id` was called with, most recent last
    pub fn write_backs(&self) -> Vec<(String, String)> {
        self.write_backs.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl SourceStore for FakeSourceStore {
    async fn list_active_sources(&self) -> crate::Result<Vec<BankSource>> {
        Ok(self
            .sources
            .iter()
            .filter(|s| s.is_active)
            .cloned()
            .collect())
    }

    async fn read_raw(&self, source: &BankSource) -> crate::Result<Vec<RawRow>> {
        Ok(self.rows.get(&source.id).cloned().unwrap_or_default())
    }

    fn supports_write_back(&self) -> bool {
        true
    }

    async fn write_back_id(
        &self,
        _source: &BankSource,
        row_identity: &str,
        id: &str,
    ) -> crate::Result<()> {
        self.write_backs
            .lock()
            .expect("lock poisoned")
            .push((row_identity.to_string(), id.to_string()));
        Ok(())
    }
}

/// A `ResultStore` backed by a concurrent in-memory map, keyed both by id
/// and by stable key so `find_by_key` and `append`'s idempotence can be
/// exercised without a database
#[derive(Debug, Default)]
pub struct FakeResultStore {
    by_id: DashMap<TransactionId, Transaction>,
    by_stable_key: DashMap<(BankSourceId, String), TransactionId>,
}

impl FakeResultStore {
    /// An empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Every transaction currently held, in insertion order
    pub fn all(&self) -> Vec<Transaction> {
        let mut txs: Vec<Transaction> = self.by_id.iter().map(|e| e.value().clone()).collect();
        txs.sort_by_key(|t| t.timestamp_created);
        txs
    }
}

#[async_trait]
impl ResultStore for FakeResultStore {
    async fn append(&self, transactions: Vec<Transaction>) -> crate::Result<Vec<AppendResult>> {
        let mut results = Vec::with_capacity(transactions.len());
        for tx in transactions {
            let key = (tx.bank_source_id, tx.original_transaction_id.clone());
            if let Some(existing) = self.by_stable_key.get(&key) {
                results.push(AppendResult {
                    id: *existing,
                    outcome: AppendOutcome::AlreadyPresent,
                });
                continue;
            }
            let id = tx.id;
            self.by_stable_key.insert(key, id);
            self.by_id.insert(id, tx);
            results.push(AppendResult {
                id,
                outcome: AppendOutcome::Inserted,
            });
        }
        Ok(results)
    }

    async fn find_by_key(
        &self,
        bank_source_id: BankSourceId,
        original_transaction_id: &str,
    ) -> crate::Result<Option<Transaction>> {
        let key = (bank_source_id, original_transaction_id.to_string());
        Ok(self
            .by_stable_key
            .get(&key)
            .and_then(|id| self.by_id.get(&id).map(|e| e.value().clone())))
    }

    async fn query(&self, filter: TransactionFilter) -> crate::Result<Vec<Transaction>> {
        Ok(self
            .all()
            .into_iter()
            .filter(|t| filter.status.map_or(true, |s| t.processing_status == s))
            .filter(|t| {
                filter
                    .has_manual_override
                    .map_or(true, |flag| t.has_manual_override() == flag)
            })
            .filter(|t| filter.from.map_or(true, |from| t.transaction_date >= from))
            .filter(|t| filter.to.map_or(true, |to| t.transaction_date < to))
            .collect())
    }

    async fn update(&self, id: TransactionId, changes: TransactionFieldChanges) -> crate::Result<()> {
        let mut entry = self
            .by_id
            .get_mut(&id)
            .ok_or_else(|| tx_core::Error::Other(format!("transaction {id} not found")))?;
        if let Some(v) = changes.category_ai_id {
            entry.category_ai_id = v;
        }
        if let Some(v) = changes.category_ai_name {
            entry.category_ai_name = v;
        }
        if let Some(v) = changes.category_confidence_score {
            entry.category_confidence_score = v;
        }
        if let Some(v) = changes.category_manual_id {
            entry.category_manual_id = v;
        }
        if let Some(v) = changes.category_manual_name {
            entry.category_manual_name = v;
        }
        if let Some(v) = changes.processing_status {
            entry.processing_status = v;
        }
        if let Some(v) = changes.error_message {
            entry.error_message = v;
        }
        Ok(())
    }
}

/// A `CategoriesStore` backed by a fixed `Vec<Category>`
#[derive(Debug, Default)]
pub struct FakeCategoriesStore {
    categories: Vec<Category>,
}

impl FakeCategoriesStore {
    /// A store offering exactly these categories
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }
}

#[async_trait]
impl CategoriesStore for FakeCategoriesStore {
    async fn list(&self) -> crate::Result<Vec<Category>> {
        Ok(self.categories.clone())
    }
}

/// An `AICategorizationPort` whose response (or failure) is fixed ahead of
/// time, for deterministic tests
pub struct FakeAICategorizationPort {
    response: Mutex<Result<Vec<AiCategorizationResult>, PortError>>,
    calls: Mutex<Vec<AiCategorizationRequest>>,
}

impl FakeAICategorizationPort {
    /// A port that always returns `response`
    pub fn new(response: Result<Vec<AiCategorizationResult>, PortError>) -> Self {
        Self {
            response: Mutex::new(response),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every request this fake has received so far
    pub fn calls(&self) -> Vec<AiCategorizationRequest> {
        self.calls.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl AICategorizationPort for FakeAICategorizationPort {
    async fn categorize_batch(
        &self,
        request: AiCategorizationRequest,
    ) -> Result<Vec<AiCategorizationResult>, PortError> {
        self.calls.lock().expect("lock poisoned").push(request);
        self.response.lock().expect("lock poisoned").clone()
    }
}

/// An `ExchangeRatePort` backed by a fixed rate table
#[derive(Debug, Default)]
pub struct FakeExchangeRatePort {
    rates: HashMap<String, Decimal>,
}

impl FakeExchangeRatePort {
    /// A port offering exactly these target-currency rates
    pub fn new(rates: HashMap<String, Decimal>) -> Self {
        Self { rates }
    }
}

#[async_trait]
impl ExchangeRatePort for FakeExchangeRatePort {
    async fn get_rate(&self, target: &str) -> Result<Decimal, PortError> {
        self.rates
            .get(target)
            .copied()
            .ok_or_else(|| PortError::Permanent(format!("no rate configured for {target}")))
    }
}

/// A `Clock` that always reports a fixed instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// A `Logger` that records every call instead of emitting it
#[derive(Debug, Default)]
pub struct RecordingLogger {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl RecordingLogger {
    /// A logger with no recorded lines yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Every line recorded so far, in order
    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.lines.lock().expect("lock poisoned").clone()
    }
}

impl Logger for RecordingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        self.lines
            .lock()
            .expect("lock poisoned")
            .push((level, message.to_string()));
    }
}
