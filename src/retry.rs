//! Retry logic for transient ledger failures.
//!
//! This module provides [`with_retry`], a utility that wraps an async
//! operation with automatic retry on transient errors (connection failures,
//! timeouts). Non-transient errors (rejections, not-found, serialization)
//! are returned immediately without retry.
//!
//! Only retrieval and search calls go through this wrapper. Commits are
//! never retried: a commit whose response was lost may still have been
//! applied, and resubmitting it blindly would either double-write or be
//! rejected as a double-spend.
//!
//! # Backoff Strategy
//!
//! Retries use exponential backoff with jitter:
//! - Base delay doubles with each attempt: `initial_backoff * 2^attempt`
//! - Delay is capped at `max_backoff`
//! - Random jitter of 0–50% of the computed delay is added to prevent thundering-herd effects
//!   across multiple clients

use std::{future::Future, time::Duration};

use rand::Rng;

use crate::{
    config::RetryConfig,
    error::{Result, StoreError},
};

/// Executes `operation` with automatic retry on transient errors.
///
/// Returns the result of the first successful call, or the last error
/// if all retry attempts are exhausted.
///
/// # Retry Eligibility
///
/// Only errors where [`StoreError::is_transient`] returns `true` are
/// retried. All other errors are propagated immediately.
#[tracing::instrument(skip(config, operation), fields(max_retries = config.max_retries))]
pub(crate) async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error: Option<StoreError> = None;

    for attempt in 0..=config.max_retries {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        "operation succeeded after retry",
                    );
                }
                return Ok(value);
            },
            Err(err) if err.is_transient() && attempt < config.max_retries => {
                let delay = compute_backoff(config, attempt);
                tracing::debug!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    max_attempts = config.max_retries + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient error, retrying after backoff",
                );
                tokio::time::sleep(delay).await;
                last_error = Some(err);
            },
            Err(err) => {
                // Non-transient error on any attempt, or transient on last attempt
                return Err(err);
            },
        }
    }

    // All retries exhausted — return the last transient error
    Err(last_error
        .unwrap_or_else(|| StoreError::internal("retry loop completed without result or error")))
}

/// Computes the backoff duration for the given attempt number.
///
/// Uses exponential backoff with jitter:
/// `min(initial_backoff * 2^attempt, max_backoff) + random(0..50% of delay)`
fn compute_backoff(config: &RetryConfig, attempt: u32) -> Duration {
    let base = config.initial_backoff.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
    let capped = base.min(config.max_backoff);

    // Add jitter: 0–50% of the computed delay
    let jitter_range = capped.as_millis() as u64 / 2;
    if jitter_range > 0 {
        let jitter = rand::rng().random_range(0..=jitter_range);
        capped + Duration::from_millis(jitter)
    } else {
        capped
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn fast_retry(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_compute_backoff_exponential() {
        let config = RetryConfig {
            max_retries: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
        };

        // Attempt 0: base = 100ms
        let d0 = compute_backoff(&config, 0);
        assert!(d0 >= Duration::from_millis(100));
        assert!(d0 <= Duration::from_millis(150)); // 100 + up to 50% jitter

        // Attempt 1: base = 200ms
        let d1 = compute_backoff(&config, 1);
        assert!(d1 >= Duration::from_millis(200));
        assert!(d1 <= Duration::from_millis(300));

        // Attempt 2: base = 400ms
        let d2 = compute_backoff(&config, 2);
        assert!(d2 >= Duration::from_millis(400));
        assert!(d2 <= Duration::from_millis(600));
    }

    #[test]
    fn test_compute_backoff_capped_at_max() {
        let config = RetryConfig {
            max_retries: 10,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(5),
        };

        // Attempt 5: base = 32s, should be capped at 5s
        let d = compute_backoff(&config, 5);
        assert!(d >= Duration::from_secs(5));
        assert!(d <= Duration::from_millis(7500)); // 5s + up to 50% jitter
    }

    #[test]
    fn test_compute_backoff_zero_initial() {
        let config = RetryConfig {
            max_retries: 3,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::from_secs(5),
        };

        assert_eq!(compute_backoff(&config, 0), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_retry_succeeds_first_attempt() {
        let call_count = AtomicU32::new(0);

        let result = with_retry(&fast_retry(3), "test_op", || {
            call_count.fetch_add(1, Ordering::Relaxed);
            async { Ok::<_, StoreError>(42) }
        })
        .await;

        assert_eq!(result.ok(), Some(42));
        assert_eq!(call_count.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_failure() {
        let call_count = AtomicU32::new(0);

        let result = with_retry(&fast_retry(3), "test_op", || {
            let attempt = call_count.fetch_add(1, Ordering::Relaxed);
            async move {
                if attempt < 2 { Err(StoreError::connection("temporary")) } else { Ok(42) }
            }
        })
        .await;

        assert_eq!(result.ok(), Some(42));
        assert_eq!(call_count.load(Ordering::Relaxed), 3); // 2 failures + 1 success
    }

    #[tokio::test]
    async fn test_retry_non_transient_error_not_retried() {
        let call_count = AtomicU32::new(0);

        let result: Result<i32> = with_retry(&fast_retry(3), "test_op", || {
            call_count.fetch_add(1, Ordering::Relaxed);
            async { Err(StoreError::rejected("double spend")) }
        })
        .await;

        assert!(matches!(result, Err(StoreError::Rejected { .. })));
        assert_eq!(call_count.load(Ordering::Relaxed), 1); // No retries
    }

    #[tokio::test]
    async fn test_retry_exhausted_returns_last_error() {
        let call_count = AtomicU32::new(0);

        let result: Result<i32> = with_retry(&fast_retry(2), "test_op", || {
            call_count.fetch_add(1, Ordering::Relaxed);
            async { Err(StoreError::timeout()) }
        })
        .await;

        assert!(matches!(result, Err(StoreError::Timeout)));
        assert_eq!(call_count.load(Ordering::Relaxed), 3); // 1 initial + 2 retries
    }

    #[tokio::test]
    async fn test_retry_disabled_with_zero_max_retries() {
        let call_count = AtomicU32::new(0);

        let result: Result<i32> = with_retry(&fast_retry(0), "test_op", || {
            call_count.fetch_add(1, Ordering::Relaxed);
            async { Err(StoreError::connection("fail")) }
        })
        .await;

        assert!(matches!(result, Err(StoreError::Connection { .. })));
        assert_eq!(call_count.load(Ordering::Relaxed), 1); // No retries
    }

    #[tokio::test]
    async fn test_retry_timeout_then_connection_returns_connection() {
        let call_count = AtomicU32::new(0);

        let result: Result<i32> = with_retry(&fast_retry(2), "test_op", || {
            let attempt = call_count.fetch_add(1, Ordering::Relaxed);
            async move {
                if attempt == 0 {
                    Err(StoreError::timeout())
                } else {
                    Err(StoreError::connection("network down"))
                }
            }
        })
        .await;

        // Last error should be returned
        assert!(matches!(result, Err(StoreError::Connection { .. })));
        assert_eq!(call_count.load(Ordering::Relaxed), 3);
    }
}
