//! Currency conversion into GBP (spec component C4)
//!
//! One converter is built per normalization run and shared across every row
//! in that run, so a rate fetched for USD on row 3 is reused verbatim for
//! row 400 — rates are captured once per run and are immutable for the rest
//! of it, same as a settlement window's cached FX snapshot.

use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tx_core::types::{ExchangeRateSnapshot, ProcessingRunId};
use tx_ports::{retry, ExchangeRatePort, RetryOutcome, RetryPolicy};

/// Result of converting one amount into GBP
#[derive(Debug, Clone)]
pub struct Conversion {
    /// Amount in GBP, rounded to 2 decimal places with banker's rounding
    pub gbp_amount: Decimal,
    /// Rate applied, `None` when the source currency was already GBP
    pub rate: Option<Decimal>,
    /// The snapshot the rate came from, `None` when no conversion happened
    pub snapshot: Option<ExchangeRateSnapshot>,
}

/// Converts amounts into GBP using a per-run cache of fetched rates
pub struct CurrencyConverter<'a> {
    port: &'a (dyn ExchangeRatePort + Send + Sync),
    policy: RetryPolicy,
    run_id: ProcessingRunId,
    snapshots: Arc<RwLock<HashMap<String, ExchangeRateSnapshot>>>,
}

impl<'a> CurrencyConverter<'a> {
    /// A converter for one run, fetching rates through `port` under `policy`
    pub fn new(
        port: &'a (dyn ExchangeRatePort + Send + Sync),
        policy: RetryPolicy,
        run_id: ProcessingRunId,
    ) -> Self {
        Self {
            port,
            policy,
            run_id,
            snapshots: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Every rate captured so far this run, for attaching to the run record
    pub async fn snapshots(&self) -> Vec<ExchangeRateSnapshot> {
        self.snapshots.read().await.values().cloned().collect()
    }

    /// Convert `amount`, denominated in `src_currency`, into GBP
    ///
    /// `GBP` short-circuits with no snapshot and no rate. Any other currency
    /// consults the run-local cache before falling back to the port; a
    /// fetch failure after all retries is returned to the caller rather than
    /// aborting the run — the normalizer is responsible for turning that
    /// into a per-transaction `Error` status.
    pub async fn convert(
        &self,
        amount: Decimal,
        src_currency: &str,
    ) -> crate::Result<Conversion> {
        if src_currency.eq_ignore_ascii_case("GBP") {
            return Ok(Conversion {
                gbp_amount: amount,
                rate: None,
                snapshot: None,
            });
        }

        let snapshot = self.rate_for(src_currency).await?;
        let gbp_amount = (amount * snapshot.rate).round_dp_with_strategy(
            2,
            RoundingStrategy::MidpointNearestEven,
        );

        Ok(Conversion {
            gbp_amount,
            rate: Some(snapshot.rate),
            snapshot: Some(snapshot),
        })
    }

    async fn rate_for(&self, currency: &str) -> crate::Result<ExchangeRateSnapshot> {
        if let Some(cached) = self.snapshots.read().await.get(currency) {
            return Ok(cached.clone());
        }

        // Double-checked: two rows for the same currency can race past the
        // first read before either has written, fetching twice is harmless
        // but we still only keep the first snapshot written.
        let fetched_at_run = self.run_id;
        let currency_owned = currency.to_string();
        let rate = retry(
            || {
                let currency = currency_owned.clone();
                async move { self.port.get_rate(&currency).await }
            },
            &self.policy,
        )
        .await
        .map_err(|outcome| match outcome {
            RetryOutcome::Exhausted { attempts, last } => tx_core::Error::ExternalService(
                format!("rate fetch for {currency_owned} failed after {attempts} attempts: {last}"),
            ),
            RetryOutcome::NonRetryable(last) => tx_core::Error::ExternalService(format!(
                "rate fetch for {currency_owned} failed: {last}"
            )),
        })?;

        let snapshot = ExchangeRateSnapshot {
            currency: currency.to_string(),
            rate,
            fetched_at: chrono::Utc::now(),
            provider: "exchange-rate-port".to_string(),
            processing_run_id: fetched_at_run,
        };

        let mut snapshots = self.snapshots.write().await;
        let snapshot = snapshots
            .entry(currency.to_string())
            .or_insert(snapshot)
            .clone();
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap as StdHashMap;
    use tx_ports::test_support::FakeExchangeRatePort;

    #[tokio::test]
    async fn gbp_passes_through_unconverted() {
        let port = FakeExchangeRatePort::new(StdHashMap::new());
        let converter = CurrencyConverter::new(&port, RetryPolicy::default(), ProcessingRunId::new());
        let result = converter.convert(dec!(10.00), "GBP").await.unwrap();
        assert_eq!(result.gbp_amount, dec!(10.00));
        assert!(result.rate.is_none());
        assert!(result.snapshot.is_none());
    }

    #[tokio::test]
    async fn converts_and_applies_bankers_rounding() {
        let mut rates = StdHashMap::new();
        rates.insert("USD".to_string(), dec!(1.25));
        let port = FakeExchangeRatePort::new(rates);
        let converter = CurrencyConverter::new(&port, RetryPolicy::default(), ProcessingRunId::new());
        // 10.005 rounds to the nearest even cent (10.00), not away from zero.
        let result = converter.convert(dec!(8.004), "USD").await.unwrap();
        assert_eq!(result.rate, Some(dec!(1.25)));
        assert_eq!(result.gbp_amount, dec!(10.00));
    }

    #[tokio::test]
    async fn second_lookup_reuses_the_first_snapshot() {
        let mut rates = StdHashMap::new();
        rates.insert("EUR".to_string(), dec!(1.17));
        let port = FakeExchangeRatePort::new(rates);
        let converter = CurrencyConverter::new(&port, RetryPolicy::default(), ProcessingRunId::new());
        converter.convert(dec!(10.00), "EUR").await.unwrap();
        converter.convert(dec!(20.00), "EUR").await.unwrap();
        assert_eq!(converter.snapshots().await.len(), 1);
    }

    #[tokio::test]
    async fn unconfigured_rate_surfaces_as_external_service_error() {
        let port = FakeExchangeRatePort::new(StdHashMap::new());
        let policy = RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        };
        let converter = CurrencyConverter::new(&port, policy, ProcessingRunId::new());
        let result = converter.convert(dec!(10.00), "USD").await;
        assert!(result.is_err());
    }
}
