//! Run Coordinator (spec component C12)
//!
//! Orchestrates a single Normalization Run or Categorization Run end to end:
//! assembles per-run context (rate snapshot cache, active categories),
//! drives the pipeline crates, and records run stats. Rejects a second
//! concurrent run of the same type rather than interleaving two runs'
//! `ProcessingRun` bookkeeping.

use crate::metrics::Metrics;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::Mutex;
use tx_categorization::Categorizer;
use tx_core::types::{ProcessingRun, ProcessingStatus, RunType, Transaction};
use tx_normalization::adapters::adapter_for;
use tx_normalization::currency::CurrencyConverter;
use tx_normalization::dedup::DuplicateDetector;
use tx_normalization::normalizer::{NormalizeOutcome, Normalizer};
use tx_ports::{
    AICategorizationPort, CategoriesStore, Clock, ExchangeRatePort, LogLevel, Logger, ResultStore,
    RetryPolicy, SourceStore, TransactionFilter,
};

/// Orchestrates normalization and categorization runs over one set of ports
pub struct RunCoordinator<'a> {
    source_store: &'a (dyn SourceStore + Send + Sync),
    result_store: &'a (dyn ResultStore + Send + Sync),
    categories_store: &'a (dyn CategoriesStore + Send + Sync),
    fx_port: &'a (dyn ExchangeRatePort + Send + Sync),
    ai_port: &'a (dyn AICategorizationPort + Send + Sync),
    clock: &'a (dyn Clock + Send + Sync),
    logger: &'a (dyn Logger + Send + Sync),
    normalization_config: tx_normalization::Config,
    categorization_config: tx_categorization::Config,
    metrics: &'a Metrics,
    in_flight: Mutex<HashSet<RunType>>,
}

impl<'a> RunCoordinator<'a> {
    /// Wire a coordinator over one set of ports and configs, for the
    /// lifetime of the process
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source_store: &'a (dyn SourceStore + Send + Sync),
        result_store: &'a (dyn ResultStore + Send + Sync),
        categories_store: &'a (dyn CategoriesStore + Send + Sync),
        fx_port: &'a (dyn ExchangeRatePort + Send + Sync),
        ai_port: &'a (dyn AICategorizationPort + Send + Sync),
        clock: &'a (dyn Clock + Send + Sync),
        logger: &'a (dyn Logger + Send + Sync),
        normalization_config: tx_normalization::Config,
        categorization_config: tx_categorization::Config,
        metrics: &'a Metrics,
    ) -> Self {
        Self {
            source_store,
            result_store,
            categories_store,
            fx_port,
            ai_port,
            clock,
            logger,
            normalization_config,
            categorization_config,
            metrics,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    async fn begin(&self, run_type: RunType) -> crate::Result<()> {
        let mut in_flight = self.in_flight.lock().await;
        if !in_flight.insert(run_type) {
            return Err(crate::Error::AlreadyRunning(run_type));
        }
        Ok(())
    }

    async fn end(&self, run_type: RunType) {
        self.in_flight.lock().await.remove(&run_type);
    }

    /// Run C3-C6 over every active source, appending normalized rows to the
    /// result store. Per-source and per-row failures are logged against the
    /// run rather than aborting it; partial success is the default outcome.
    pub async fn run_normalization(&self) -> crate::Result<ProcessingRun> {
        self.begin(RunType::Normalisation).await?;
        let outcome = self.do_run_normalization().await;
        self.end(RunType::Normalisation).await;
        outcome
    }

    async fn do_run_normalization(&self) -> crate::Result<ProcessingRun> {
        let start = self.clock.now();
        let mut run = ProcessingRun::start(RunType::Normalisation, start);

        let policy = RetryPolicy {
            max_attempts: self.normalization_config.max_attempts,
            base_delay: Duration::from_secs(self.normalization_config.backoff_base_seconds),
            cap: Duration::from_secs(self.normalization_config.backoff_cap_seconds),
            ..RetryPolicy::default()
        };
        let converter = CurrencyConverter::new(self.fx_port, policy, run.id);

        let sources = match self.source_store.list_active_sources().await {
            Ok(sources) => sources,
            Err(e) => {
                run.abort(self.clock.now(), format!("could not list active sources: {e}"));
                return Ok(run);
            }
        };

        for source in &sources {
            let adapter = adapter_for(source.id);
            let detector = DuplicateDetector::new(self.result_store);
            let normalizer =
                Normalizer::new(adapter.as_ref(), source, self.source_store, detector, &converter);

            let rows = match self.source_store.read_raw(source).await {
                Ok(rows) => rows,
                Err(e) => {
                    self.logger.log(
                        LogLevel::Warn,
                        &format!("source {}: failed to read raw rows: {e}", source.id),
                    );
                    run.record_failure(format!("{}: failed to read raw rows: {e}", source.id));
                    continue;
                }
            };

            for row in &rows {
                match normalizer.normalize(row, self.clock.now()).await {
                    NormalizeOutcome::Normalized(tx) => match self.result_store.append(vec![*tx]).await {
                        Ok(_) => run.record_success(),
                        Err(e) => run.record_failure(format!("{}: append failed: {e}", source.id)),
                    },
                    NormalizeOutcome::Duplicate => {
                        self.logger.log(LogLevel::Debug, &format!("{}: duplicate row skipped", source.id));
                    }
                    NormalizeOutcome::Failed(message) => {
                        let sanitized = tx_core::validate::sanitize_error_message(&message);
                        self.logger.log(LogLevel::Warn, &format!("{}: {sanitized}", source.id));
                        run.record_failure(format!("{}: {sanitized}", source.id));
                    }
                }
            }
        }

        run.rate_snapshots = converter.snapshots().await;
        let finished_at = self.clock.now();
        run.finish(finished_at);
        self.metrics.record_run(
            "normalisation",
            run.processed,
            run.failed,
            seconds_between(start, finished_at),
        );
        Ok(run)
    }

    /// Run C7-C10 over every eligible transaction: `Normalised`, plus
    /// `Categorised` rows without a manual override when
    /// `allow_recategorisation` is set.
    pub async fn run_categorization(&self) -> crate::Result<ProcessingRun> {
        self.begin(RunType::Categorisation).await?;
        let outcome = self.do_run_categorization().await;
        self.end(RunType::Categorisation).await;
        outcome
    }

    async fn do_run_categorization(&self) -> crate::Result<ProcessingRun> {
        let start = self.clock.now();
        let mut run = ProcessingRun::start(RunType::Categorisation, start);

        let categories = match self.categories_store.list().await {
            Ok(categories) => categories,
            Err(e) => {
                run.abort(self.clock.now(), format!("could not list categories: {e}"));
                return Ok(run);
            }
        };

        let mut candidates = match self
            .result_store
            .query(TransactionFilter { status: Some(ProcessingStatus::Normalised), ..Default::default() })
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                run.abort(self.clock.now(), format!("could not query candidates: {e}"));
                return Ok(run);
            }
        };

        if self.categorization_config.allow_recategorisation {
            match self
                .result_store
                .query(TransactionFilter {
                    status: Some(ProcessingStatus::Categorised),
                    has_manual_override: Some(false),
                    ..Default::default()
                })
                .await
            {
                Ok(rows) => candidates.extend(rows),
                Err(e) => {
                    self.logger
                        .log(LogLevel::Warn, &format!("could not query recategorisation candidates: {e}"));
                }
            }
        }

        if candidates.is_empty() {
            let finished_at = self.clock.now();
            run.finish(finished_at);
            self.metrics.record_run(
                "categorisation",
                run.processed,
                run.failed,
                seconds_between(start, finished_at),
            );
            return Ok(run);
        }

        let now = self.clock.now();
        let lookback_from = now - chrono::Duration::days(self.categorization_config.lookback_days);
        let history = match self
            .result_store
            .query(TransactionFilter {
                status: Some(ProcessingStatus::Categorised),
                from: Some(lookback_from),
                ..Default::default()
            })
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                self.logger.log(LogLevel::Warn, &format!("could not load categorisation history: {e}"));
                Vec::new()
            }
        };

        let categorizer = Categorizer::new(self.ai_port, &self.categorization_config);
        let processed = match categorizer.categorize(candidates, &categories, &history, now).await {
            Ok(processed) => processed,
            Err(e) => {
                run.abort(self.clock.now(), format!("categorizer failed: {e}"));
                return Ok(run);
            }
        };

        for tx in &processed {
            match self.apply_update(tx).await {
                Ok(()) => {
                    if tx.processing_status == ProcessingStatus::Error {
                        run.record_failure(tx.error_message.clone().unwrap_or_default());
                    } else {
                        run.record_success();
                    }
                }
                Err(e) => run.record_failure(format!("could not persist result for {}: {e}", tx.id)),
            }
        }

        let finished_at = self.clock.now();
        run.finish(finished_at);
        self.metrics.record_run(
            "categorisation",
            run.processed,
            run.failed,
            seconds_between(start, finished_at),
        );
        Ok(run)
    }

    async fn apply_update(&self, tx: &Transaction) -> crate::Result<()> {
        self.result_store
            .update(
                tx.id,
                tx_ports::TransactionFieldChanges {
                    category_ai_id: Some(tx.category_ai_id),
                    category_ai_name: Some(tx.category_ai_name.clone()),
                    category_confidence_score: Some(tx.category_confidence_score),
                    processing_status: Some(tx.processing_status),
                    error_message: Some(tx.error_message.clone()),
                    ..Default::default()
                },
            )
            .await?;
        Ok(())
    }
}

fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tx_core::types::{BankSource, BankSourceId, FieldMapping, TransactionId, TransactionType};
    use tx_ports::test_support::{
        FakeAICategorizationPort, FakeCategoriesStore, FakeExchangeRatePort, FakeResultStore,
        FakeSourceStore, FixedClock, RecordingLogger,
    };

    fn monzo_source() -> BankSource {
        BankSource {
            id: BankSourceId::Monzo,
            display_name: "Monzo".to_string(),
            field_mapping: FieldMapping::new(),
            has_native_transaction_id: true,
            is_active: true,
        }
    }

    fn monzo_row() -> std::collections::HashMap<String, String> {
        [
            ("Date", "15/11/2025"),
            ("Name", "Tesco Metro"),
            ("Amount", "-23.45"),
            ("Currency", "GBP"),
            ("Type", "Card payment"),
            ("Transaction ID", "tx_001"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[tokio::test]
    async fn normalization_run_appends_and_marks_completed() {
        let source_store = FakeSourceStore::new().with_source(monzo_source(), vec![monzo_row()]);
        let result_store = FakeResultStore::new();
        let categories_store = FakeCategoriesStore::new(Vec::new());
        let fx_port = FakeExchangeRatePort::new(std::collections::HashMap::new());
        let ai_port = FakeAICategorizationPort::new(Ok(Vec::new()));
        let clock = FixedClock(Utc::now());
        let logger = RecordingLogger::new();
        let metrics = Metrics::new().unwrap();

        let coordinator = RunCoordinator::new(
            &source_store,
            &result_store,
            &categories_store,
            &fx_port,
            &ai_port,
            &clock,
            &logger,
            tx_normalization::Config::default(),
            tx_categorization::Config::default(),
            &metrics,
        );

        let run = coordinator.run_normalization().await.unwrap();
        assert_eq!(run.processed, 1);
        assert_eq!(run.succeeded, 1);
        assert_eq!(result_store.all().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_normalization_runs_are_rejected() {
        let source_store = FakeSourceStore::new();
        let result_store = FakeResultStore::new();
        let categories_store = FakeCategoriesStore::new(Vec::new());
        let fx_port = FakeExchangeRatePort::new(std::collections::HashMap::new());
        let ai_port = FakeAICategorizationPort::new(Ok(Vec::new()));
        let clock = FixedClock(Utc::now());
        let logger = RecordingLogger::new();
        let metrics = Metrics::new().unwrap();

        let coordinator = RunCoordinator::new(
            &source_store,
            &result_store,
            &categories_store,
            &fx_port,
            &ai_port,
            &clock,
            &logger,
            tx_normalization::Config::default(),
            tx_categorization::Config::default(),
            &metrics,
        );

        coordinator.begin(RunType::Normalisation).await.unwrap();
        let err = coordinator.run_normalization().await.unwrap_err();
        assert!(matches!(err, crate::Error::AlreadyRunning(RunType::Normalisation)));
        coordinator.end(RunType::Normalisation).await;
    }

    #[tokio::test]
    async fn categorization_run_with_no_candidates_completes_immediately() {
        let source_store = FakeSourceStore::new();
        let result_store = FakeResultStore::new();
        let categories_store = FakeCategoriesStore::new(Vec::new());
        let fx_port = FakeExchangeRatePort::new(std::collections::HashMap::new());
        let ai_port = FakeAICategorizationPort::new(Ok(Vec::new()));
        let clock = FixedClock(Utc::now());
        let logger = RecordingLogger::new();
        let metrics = Metrics::new().unwrap();

        let coordinator = RunCoordinator::new(
            &source_store,
            &result_store,
            &categories_store,
            &fx_port,
            &ai_port,
            &clock,
            &logger,
            tx_normalization::Config::default(),
            tx_categorization::Config::default(),
            &metrics,
        );

        let run = coordinator.run_categorization().await.unwrap();
        assert_eq!(run.processed, 0);
        assert_eq!(ai_port.calls().len(), 0);
    }

    fn normalised_tx(description: &str) -> Transaction {
        let now = Utc::now();
        Transaction {
            id: TransactionId::new(),
            bank_source_id: BankSourceId::Monzo,
            original_transaction_id: "tx_1".to_string(),
            transaction_date: now,
            description: description.to_string(),
            transaction_type: TransactionType::Debit,
            notes: None,
            country: None,
            original_amount_value: dec!(-10.00),
            original_amount_currency: "GBP".to_string(),
            gbp_amount_value: dec!(-10.00),
            exchange_rate_value: None,
            category_ai_id: None,
            category_ai_name: None,
            category_confidence_score: None,
            category_manual_id: None,
            category_manual_name: None,
            processing_status: ProcessingStatus::Normalised,
            error_message: None,
            timestamp_created: now,
            timestamp_last_modified: now,
            timestamp_normalised: Some(now),
            timestamp_categorised: None,
        }
    }

    #[tokio::test]
    async fn categorization_run_persists_successful_results() {
        use tx_core::types::{Category, CategoryId};
        use tx_ports::AiCategorizationResult;

        let source_store = FakeSourceStore::new();
        let result_store = FakeResultStore::new();
        let category_id = CategoryId::new();
        let now = Utc::now();
        let categories_store = FakeCategoriesStore::new(vec![Category {
            id: category_id,
            name: "Groceries".to_string(),
            description: String::new(),
            examples: Vec::new(),
            is_active: true,
            created_at: now,
            modified_at: now,
        }]);

        let tx = normalised_tx("TESCO METRO");
        result_store.append(vec![tx.clone()]).await.unwrap();

        let fx_port = FakeExchangeRatePort::new(std::collections::HashMap::new());
        let ai_port = FakeAICategorizationPort::new(Ok(vec![AiCategorizationResult {
            transaction_id: tx.id,
            category_id,
            category_name: "Groceries".to_string(),
            confidence_score: 90,
        }]));
        let clock = FixedClock(now);
        let logger = RecordingLogger::new();
        let metrics = Metrics::new().unwrap();

        let coordinator = RunCoordinator::new(
            &source_store,
            &result_store,
            &categories_store,
            &fx_port,
            &ai_port,
            &clock,
            &logger,
            tx_normalization::Config::default(),
            tx_categorization::Config::default(),
            &metrics,
        );

        let run = coordinator.run_categorization().await.unwrap();
        assert_eq!(run.succeeded, 1);
        let stored = result_store.all();
        assert_eq!(stored[0].processing_status, ProcessingStatus::Categorised);
        assert_eq!(stored[0].category_ai_id, Some(category_id));
    }

    /// A categorised transaction older than `lookback_days` never enters the
    /// candidate pool `history::find_similar` sees, even though it would
    /// otherwise be an exact description match: the coordinator's own
    /// `TransactionFilter` excludes it before the categorizer runs.
    #[tokio::test]
    async fn categorization_history_excludes_rows_older_than_lookback_days() {
        use tx_core::types::{Category, CategoryId};
        use tx_ports::AiCategorizationResult;

        let source_store = FakeSourceStore::new();
        let result_store = FakeResultStore::new();
        let category_id = CategoryId::new();
        let now = Utc::now();
        let categories_store = FakeCategoriesStore::new(vec![Category {
            id: category_id,
            name: "Groceries".to_string(),
            description: String::new(),
            examples: Vec::new(),
            is_active: true,
            created_at: now,
            modified_at: now,
        }]);

        let mut stale_history = normalised_tx("TESCO METRO");
        stale_history.original_transaction_id = "tx_stale".to_string();
        stale_history.processing_status = ProcessingStatus::Categorised;
        stale_history.transaction_date = now - chrono::Duration::days(200);
        stale_history.category_ai_id = Some(category_id);
        stale_history.category_ai_name = Some("Groceries".to_string());
        stale_history.category_confidence_score = Some(95);
        result_store.append(vec![stale_history]).await.unwrap();

        let target = normalised_tx("TESCO METRO");
        result_store.append(vec![target.clone()]).await.unwrap();

        let fx_port = FakeExchangeRatePort::new(std::collections::HashMap::new());
        let ai_port = FakeAICategorizationPort::new(Ok(vec![AiCategorizationResult {
            transaction_id: target.id,
            category_id,
            category_name: "Groceries".to_string(),
            confidence_score: 90,
        }]));
        let clock = FixedClock(now);
        let logger = RecordingLogger::new();
        let metrics = Metrics::new().unwrap();
        let mut categorization_config = tx_categorization::Config::default();
        categorization_config.lookback_days = 90;

        let coordinator = RunCoordinator::new(
            &source_store,
            &result_store,
            &categories_store,
            &fx_port,
            &ai_port,
            &clock,
            &logger,
            tx_normalization::Config::default(),
            categorization_config,
            &metrics,
        );

        coordinator.run_categorization().await.unwrap();
        let stored = result_store.all();
        let result = stored.iter().find(|t| t.id == target.id).unwrap();
        // No damping from history, since the exact-match candidate is outside
        // lookback_days: the AI's 90 is scaled by ai_weight alone (90 * 0.6 = 54).
        assert_eq!(result.category_confidence_score, Some(54));
    }

    /// Returns a configured rate for every currency except `JPY`, which
    /// always fails with a retryable 5xx so S7 can exhaust the FX retry
    /// budget on that one row without touching the others.
    struct JpyFailingFxPort;

    #[async_trait::async_trait]
    impl tx_ports::ExchangeRatePort for JpyFailingFxPort {
        async fn get_rate(&self, target: &str) -> Result<rust_decimal::Decimal, tx_ports::PortError> {
            if target.eq_ignore_ascii_case("JPY") {
                Err(tx_ports::PortError::ServerError("FX provider unavailable".to_string()))
            } else {
                Ok(dec!(1.25))
            }
        }
    }

    fn jpy_row() -> std::collections::HashMap<String, String> {
        [
            ("Date", "15/11/2025"),
            ("Name", "Akihabara Electronics"),
            ("Amount", "-5000"),
            ("Currency", "JPY"),
            ("Type", "Card payment"),
            ("Transaction ID", "tx_002"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    /// S7: a normalization run with one GBP row and one JPY row, where the
    /// FX port exhausts its retry budget for JPY only, ends PARTIAL_SUCCESS
    /// with exactly the JPY row recorded as a failure.
    #[tokio::test]
    async fn s7_fx_exhaustion_yields_partial_success() {
        let source_store = FakeSourceStore::new()
            .with_source(monzo_source(), vec![monzo_row(), jpy_row()]);
        let result_store = FakeResultStore::new();
        let categories_store = FakeCategoriesStore::new(Vec::new());
        let fx_port = JpyFailingFxPort;
        let ai_port = FakeAICategorizationPort::new(Ok(Vec::new()));
        let clock = FixedClock(Utc::now());
        let logger = RecordingLogger::new();
        let metrics = Metrics::new().unwrap();

        let mut normalization_config = tx_normalization::Config::default();
        normalization_config.backoff_base_seconds = 0;
        normalization_config.backoff_cap_seconds = 0;

        let coordinator = RunCoordinator::new(
            &source_store,
            &result_store,
            &categories_store,
            &fx_port,
            &ai_port,
            &clock,
            &logger,
            normalization_config,
            tx_categorization::Config::default(),
            &metrics,
        );

        let run = coordinator.run_normalization().await.unwrap();
        assert_eq!(run.processed, 2);
        assert_eq!(run.succeeded, 1);
        assert_eq!(run.failed, 1);
        assert_eq!(run.status, tx_core::types::RunStatus::PartialSuccess);
        assert_eq!(result_store.all().len(), 1);
        assert_eq!(result_store.all()[0].original_transaction_id, "tx_001");
        assert!(run.error_log.iter().any(|e| e.contains("5 attempts")));
    }
}
