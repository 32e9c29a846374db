//! Composition root
//!
//! Builds the full dependency graph exactly once — ports, configs, clock,
//! metrics — and hands them to the [`crate::coordinator::RunCoordinator`]
//! constructor explicitly, rather than reaching for a static/global anywhere
//! in the pipeline crates. Grounded on `ledger-core/src/bin/server.rs`'s
//! startup sequence (parse config, construct components, wire them together)
//! adapted from a gRPC server bring-up into an ingestion-run bring-up.
//!
//! No concrete infrastructure adapter (a real spreadsheet backend, a real
//! bank API client) exists in this codebase — that wiring is a deployment
//! concern left to the operator, same as the teacher's own `server.rs`
//! leaving its gRPC transport as a `TODO`. This root wires the in-memory
//! port fakes from `tx_ports::test_support` so the binary is runnable and
//! demonstrates one full pass end to end.

use crate::coordinator::RunCoordinator;
use crate::metrics::Metrics;
use tx_overrides::{CellUpdate, EditEvent, OverrideHandler};
use tx_ports::test_support::{
    FakeAICategorizationPort, FakeCategoriesStore, FakeExchangeRatePort, FakeResultStore,
    FakeSourceStore,
};
use tx_ports::{CategoriesStore, LogLevel, Logger, SystemClock};

/// A `Logger` that forwards every line to `tracing`, at a level matching
/// the port's own [`LogLevel`]
#[derive(Debug, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!("{message}"),
            LogLevel::Info => tracing::info!("{message}"),
            LogLevel::Warn => tracing::warn!("{message}"),
            LogLevel::Error => tracing::error!("{message}"),
        }
    }
}

/// Everything the run coordinator needs, assembled once for the lifetime of
/// the process
pub struct Deployment {
    /// Raw-row source of every configured bank export
    pub source_store: FakeSourceStore,
    /// Normalised/categorised transaction store
    pub result_store: FakeResultStore,
    /// Active spending categories
    pub categories_store: FakeCategoriesStore,
    /// Exchange rate provider
    pub fx_port: FakeExchangeRatePort,
    /// AI categorization provider
    pub ai_port: FakeAICategorizationPort,
    /// Wall clock
    pub clock: SystemClock,
    /// Structured logger
    pub logger: TracingLogger,
    /// Normalization pipeline configuration
    pub normalization_config: tx_normalization::Config,
    /// Categorization pipeline configuration
    pub categorization_config: tx_categorization::Config,
    /// Run metrics
    pub metrics: Metrics,
    /// Resolves manual "Manual Category" column edits against the active
    /// category list, independently of the two pipeline runs
    pub override_handler: OverrideHandler,
}

impl Deployment {
    /// Load configuration from the environment, falling back to defaults,
    /// and wire every port to its in-memory fake
    pub fn load() -> crate::Result<Self> {
        let normalization_config = tx_normalization::Config::from_env()?;
        let categorization_config = tx_categorization::Config::default();
        let override_handler = OverrideHandler::new(
            "Manual Category".to_string(),
            categorization_config.max_suggestions,
        )?;

        Ok(Self {
            source_store: FakeSourceStore::new(),
            result_store: FakeResultStore::new(),
            categories_store: FakeCategoriesStore::new(Vec::new()),
            fx_port: FakeExchangeRatePort::new(std::collections::HashMap::new()),
            ai_port: FakeAICategorizationPort::new(Ok(Vec::new())),
            clock: SystemClock,
            logger: TracingLogger,
            normalization_config,
            categorization_config,
            metrics: Metrics::new().map_err(|e| {
                tx_core::Error::Other(format!("failed to register metrics: {e}"))
            })?,
            override_handler,
        })
    }

    /// Resolve a manual-category edit against the active category list.
    /// Applying the resulting [`CellUpdate`] back to the originating
    /// spreadsheet row is a platform-adapter concern external to this crate.
    pub async fn resolve_edit(&self, event: &EditEvent) -> crate::Result<Option<CellUpdate>> {
        let categories = self.categories_store.list().await?;
        Ok(self.override_handler.handle(event, &categories))
    }

    /// Build a coordinator borrowing every port/config in this deployment
    pub fn coordinator(&self) -> RunCoordinator<'_> {
        RunCoordinator::new(
            &self.source_store,
            &self.result_store,
            &self.categories_store,
            &self.fx_port,
            &self.ai_port,
            &self.clock,
            &self.logger,
            self.normalization_config.clone(),
            self.categorization_config.clone(),
            &self.metrics,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn a_freshly_loaded_deployment_runs_an_empty_normalization_pass() {
        let deployment = Deployment::load().unwrap();
        let coordinator = deployment.coordinator();
        let run = coordinator.run_normalization().await.unwrap();
        assert_eq!(run.processed, 0);
    }

    #[tokio::test]
    async fn resolve_edit_ignores_system_writes() {
        use tx_overrides::{CellRange, EventSource};

        let deployment = Deployment::load().unwrap();
        let event = EditEvent {
            range: CellRange { column: "Manual Category".to_string(), start_row: 2, end_row: 2 },
            source: EventSource::SystemWrite,
            old_value: String::new(),
            new_value: "Groceries".to_string(),
        };
        let update = deployment.resolve_edit(&event).await.unwrap();
        assert!(update.is_none());
    }
}
