//! Generic retry/backoff utility for external port calls (spec component C13)
//!
//! Exponential backoff with a cap and a max attempt count, the same shape as
//! a settlement-network client retrying a flaky downstream call: delay
//! doubles each attempt, clamped to `cap`, with a little jitter so a batch
//! of concurrently-retrying callers doesn't all wake up at once.

use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Whether a given failure is worth retrying
///
/// Implemented by each port's own error type so `retry` stays generic over
/// what "retryable" means per port (a timeout or 5xx from the FX provider
/// isn't the same enum as one from the AI provider).
pub trait RetryClassify {
    /// `true` for a transient failure (timeout, 5xx, explicit rate limit);
    /// `false` for anything that won't succeed on a second attempt.
    fn is_retryable(&self) -> bool;
}

/// Backoff schedule and attempt budget for one retrying operation
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles each attempt after that
    pub base_delay: Duration,
    /// Delay never exceeds this, no matter how many attempts have elapsed
    pub cap: Duration,
    /// Fraction of the computed delay added as random jitter, in `[0.0, 1.0]`
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    /// `max_attempts=5`, `base=2s`, `cap=32s` — the 2/4/8/16/32s schedule
    /// spec.md's FX conversion and AI categorization calls both use.
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(2),
            cap: Duration::from_secs(32),
            jitter_factor: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Delay before the given 1-indexed attempt number, with jitter applied
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let unjittered = self
            .base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.cap)
            .min(self.cap);

        if self.jitter_factor <= 0.0 {
            return unjittered;
        }
        let jitter = unjittered.mul_f64(self.jitter_factor * rand::random::<f64>());
        unjittered + jitter
    }
}

/// Outcome of a retried operation that never succeeded
#[derive(Debug)]
pub enum RetryOutcome<E> {
    /// Every attempt failed with a retryable error
    Exhausted {
        /// How many attempts were made
        attempts: u32,
        /// The last error observed
        last: E,
    },
    /// An attempt failed with a non-retryable error; no further attempts
    /// were made
    NonRetryable(E),
}

impl<E: fmt::Display> fmt::Display for RetryOutcome<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryOutcome::Exhausted { attempts, last } => {
                write!(f, "exhausted retries after attempts={attempts}: {last}")
            }
            RetryOutcome::NonRetryable(e) => write!(f, "{e}"),
        }
    }
}

/// Run `op` under `policy`, sleeping between attempts per the backoff
/// schedule, stopping early on a non-retryable error
pub async fn retry<F, Fut, T, E>(mut op: F, policy: &RetryPolicy) -> Result<T, RetryOutcome<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryClassify,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() => return Err(RetryOutcome::NonRetryable(err)),
            Err(err) if attempt >= policy.max_attempts => {
                return Err(RetryOutcome::Exhausted { attempts: attempt, last: err })
            }
            Err(_err) => {
                tokio::time::sleep(policy.delay_for_attempt(attempt)).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, Clone)]
    struct FlakyError {
        retryable: bool,
    }

    impl RetryClassify for FlakyError {
        fn is_retryable(&self) -> bool {
            self.retryable
        }
    }

    #[test]
    fn delay_doubles_then_clamps_to_cap() {
        let policy = RetryPolicy {
            jitter_factor: 0.0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_secs(16));
        assert_eq!(policy.delay_for_attempt(5), Duration::from_secs(32));
        assert_eq!(policy.delay_for_attempt(6), Duration::from_secs(32));
    }

    #[tokio::test]
    async fn succeeds_without_retry_when_first_attempt_succeeds() {
        let calls = AtomicU32::new(0);
        let result = retry(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, FlakyError>(42) }
            },
            &RetryPolicy::default(),
        )
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_retryable_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let result = retry(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<i32, _>(FlakyError { retryable: false }) }
            },
            &RetryPolicy::default(),
        )
        .await;
        assert!(matches!(result, Err(RetryOutcome::NonRetryable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(1),
            cap: Duration::from_millis(4),
            jitter_factor: 0.0,
        };
        let result = retry(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<i32, _>(FlakyError { retryable: true }) }
            },
            &policy,
        )
        .await;
        assert!(matches!(
            result,
            Err(RetryOutcome::Exhausted { attempts: 5, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }
}
