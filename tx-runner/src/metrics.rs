//! Metrics collection for observability
//!
//! Prometheus metrics for the normalization and categorization runs.
//!
//! # Metrics
//!
//! - `tx_runner_rows_processed_total` - Rows processed, labelled by run type
//! - `tx_runner_rows_failed_total` - Rows that ended in `Error`, labelled by run type
//! - `tx_runner_run_duration_seconds` - Histogram of run durations
//! - `tx_runner_runs_total` - Total runs started, labelled by run type

use prometheus::{
    register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec, Registry,
};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Rows processed, labelled by run type ("normalisation"/"categorisation")
    pub rows_processed: IntCounterVec,
    /// Rows that ended in `Error`, labelled by run type
    pub rows_failed: IntCounterVec,
    /// Run duration histogram, labelled by run type
    pub run_duration: HistogramVec,
    /// Runs started, labelled by run type
    pub runs_total: IntCounterVec,
    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create a new metrics collector, registering every gauge/counter
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let rows_processed = register_int_counter_vec!(
            "tx_runner_rows_processed_total",
            "Rows processed by a run",
            &["run_type"]
        )?;
        registry.register(Box::new(rows_processed.clone()))?;

        let rows_failed = register_int_counter_vec!(
            "tx_runner_rows_failed_total",
            "Rows that ended in Error",
            &["run_type"]
        )?;
        registry.register(Box::new(rows_failed.clone()))?;

        let run_duration = register_histogram_vec!(
            "tx_runner_run_duration_seconds",
            "Run durations",
            &["run_type"],
            vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0]
        )?;
        registry.register(Box::new(run_duration.clone()))?;

        let runs_total = register_int_counter_vec!(
            "tx_runner_runs_total",
            "Runs started",
            &["run_type"]
        )?;
        registry.register(Box::new(runs_total.clone()))?;

        Ok(Self {
            rows_processed,
            rows_failed,
            run_duration,
            runs_total,
            registry,
        })
    }

    /// Record a completed run's row counts and duration
    pub fn record_run(&self, run_type: &str, processed: u64, failed: u64, duration_seconds: f64) {
        self.runs_total.with_label_values(&[run_type]).inc();
        self.rows_processed
            .with_label_values(&[run_type])
            .inc_by(processed);
        self.rows_failed.with_label_values(&[run_type]).inc_by(failed);
        self.run_duration
            .with_label_values(&[run_type])
            .observe(duration_seconds);
    }

    /// The underlying registry, for a metrics-scrape endpoint to expose
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("failed to create metrics")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_a_run_against_the_right_labels() {
        let metrics = Metrics::new().unwrap();
        metrics.record_run("normalisation", 10, 2, 1.5);
        assert_eq!(
            metrics
                .rows_processed
                .with_label_values(&["normalisation"])
                .get(),
            10
        );
        assert_eq!(
            metrics.rows_failed.with_label_values(&["normalisation"]).get(),
            2
        );
        assert_eq!(
            metrics.runs_total.with_label_values(&["normalisation"]).get(),
            1
        );
    }
}
