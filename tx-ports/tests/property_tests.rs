//! Property-based tests for the retry/backoff schedule (spec component C13)
//!
//! - The delay for any attempt never exceeds the configured cap
//! - The unjittered delay schedule is monotonically non-decreasing until it
//!   saturates at the cap
//! - Jitter only ever adds delay, never subtracts it

use proptest::prelude::*;
use std::time::Duration;
use tx_ports::RetryPolicy;

fn policy_strategy() -> impl Strategy<Value = RetryPolicy> {
    (1u32..10, 1u64..10, 10u64..120, 0.0f64..1.0).prop_map(
        |(max_attempts, base_secs, cap_secs, jitter_factor)| RetryPolicy {
            max_attempts,
            base_delay: Duration::from_secs(base_secs),
            cap: Duration::from_secs(cap_secs.max(base_secs)),
            jitter_factor,
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_delay_never_exceeds_cap(policy in policy_strategy(), attempt in 1u32..40) {
        let delay = policy.delay_for_attempt(attempt);
        let max_with_jitter = policy.cap.mul_f64(1.0 + policy.jitter_factor);
        prop_assert!(delay <= max_with_jitter + Duration::from_millis(1));
    }

    #[test]
    fn prop_unjittered_delay_is_monotonic_until_capped(
        base_secs in 1u64..10,
        cap_secs in 10u64..120,
        attempt in 1u32..30,
    ) {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_secs(base_secs),
            cap: Duration::from_secs(cap_secs),
            jitter_factor: 0.0,
        };
        let this_attempt = policy.delay_for_attempt(attempt);
        let next_attempt = policy.delay_for_attempt(attempt + 1);
        prop_assert!(next_attempt >= this_attempt);
        prop_assert!(this_attempt <= policy.cap);
        prop_assert!(next_attempt <= policy.cap);
    }

    #[test]
    fn prop_jitter_only_adds_delay(
        base_secs in 1u64..10,
        cap_secs in 10u64..120,
        jitter_factor in 0.01f64..1.0,
        attempt in 1u32..10,
    ) {
        let jittered = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(base_secs),
            cap: Duration::from_secs(cap_secs),
            jitter_factor,
        };
        let bare = RetryPolicy { jitter_factor: 0.0, ..jittered };
        prop_assert!(jittered.delay_for_attempt(attempt) >= bare.delay_for_attempt(attempt));
    }
}
