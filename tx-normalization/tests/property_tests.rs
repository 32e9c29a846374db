//! Property-based tests for normalization invariants
//!
//! - FX consistency: every conversion of the same currency within one run
//!   uses the same cached rate, regardless of how many rows ask for it
//! - Duplicate-detection idempotence: appending the same stable key twice
//!   never yields two distinct "not a duplicate" answers

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use tx_core::types::{
    BankSourceId, ProcessingRunId, ProcessingStatus, Transaction, TransactionId, TransactionType,
};
use tx_normalization::currency::CurrencyConverter;
use tx_normalization::dedup::DuplicateDetector;
use tx_ports::test_support::{FakeExchangeRatePort, FakeResultStore};
use tx_ports::{RetryPolicy, ResultStore as _};

fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn rate_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..500).prop_map(|hundredths| Decimal::new(hundredths, 2))
}

fn sample_transaction(original_transaction_id: &str) -> Transaction {
    let now = chrono::Utc::now();
    Transaction {
        id: TransactionId::new(),
        bank_source_id: BankSourceId::Revolut,
        original_transaction_id: original_transaction_id.to_string(),
        transaction_date: now,
        description: "COSTA COFFEE".to_string(),
        transaction_type: TransactionType::Debit,
        notes: None,
        country: None,
        original_amount_value: dec!(-3.20),
        original_amount_currency: "GBP".to_string(),
        gbp_amount_value: dec!(-3.20),
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

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every amount converted in USD during one run gets the same rate back,
    /// no matter how many times the converter is asked.
    #[test]
    fn prop_fx_rate_is_stable_within_a_run(
        rate in rate_strategy(),
        amounts in prop::collection::vec(amount_strategy(), 1..20),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let mut rates = HashMap::new();
            rates.insert("USD".to_string(), rate);
            let port = FakeExchangeRatePort::new(rates);
            let converter = CurrencyConverter::new(&port, RetryPolicy::default(), ProcessingRunId::new());

            let mut applied_rates = Vec::new();
            for amount in &amounts {
                let conversion = converter.convert(*amount, "USD").await.unwrap();
                applied_rates.push(conversion.rate.unwrap());
            }

            prop_assert!(applied_rates.iter().all(|r| *r == rate));

            let snapshots = converter.snapshots().await;
            prop_assert_eq!(snapshots.len(), 1);
            Ok(())
        })?;
    }

    /// GBP amounts always pass through unconverted, whatever the amount.
    #[test]
    fn prop_gbp_amounts_never_convert(amount in amount_strategy()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let port = FakeExchangeRatePort::new(HashMap::new());
            let converter = CurrencyConverter::new(&port, RetryPolicy::default(), ProcessingRunId::new());
            let conversion = converter.convert(amount, "GBP").await.unwrap();
            prop_assert_eq!(conversion.gbp_amount, amount);
            prop_assert!(conversion.rate.is_none());
            Ok(())
        })?;
    }

    /// Appending the same stable key any number of extra times never turns
    /// an already-seen key back into "not a duplicate".
    #[test]
    fn prop_duplicate_detection_is_idempotent(
        key in "[a-zA-Z0-9_]{4,20}",
        repeat_appends in 0usize..5,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = FakeResultStore::new();
            let detector = DuplicateDetector::new(&store);

            prop_assert!(!detector.is_duplicate(BankSourceId::Revolut, &key).await.unwrap());

            for _ in 0..=repeat_appends {
                store.append(vec![sample_transaction(&key)]).await.unwrap();
                prop_assert!(detector.is_duplicate(BankSourceId::Revolut, &key).await.unwrap());
            }

            prop_assert_eq!(store.all().len(), 1);
            Ok(())
        })?;
    }
}
