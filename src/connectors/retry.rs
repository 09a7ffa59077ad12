// @file: kline_exporter/src/connectors/retry.rs
// @description: Bounded retry with exponential backoff for page requests.
// @author: LAS.

use log::warn;
use std::future::Future;
use tokio::time::{sleep, Duration};

//
// TYPE DEFINITIONS
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: u32,
    /// Retries after the first attempt. Zero means a single attempt.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            multiplier: 2,
            max_retries: 3,
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}


//
// PUBLIC INTERFACE
//

/// Run `operation` until it succeeds, fails with an error `should_retry`
/// rejects, or the retry budget is spent. The last error is returned.
pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &RetryPolicy,
    should_retry: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut backoff: Duration = policy.initial_backoff;

    for attempt in 1..=policy.max_retries {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if should_retry(&err) => {
                warn!(
                    "Attempt {}/{} failed: {}. Retrying in {:?}",
                    attempt,
                    policy.max_retries + 1,
                    err,
                    backoff
                );
                sleep(backoff).await;
                backoff = (backoff * policy.multiplier).min(policy.max_backoff);
            }
            Err(err) => return Err(err),
        }
    }

    // #1. Final attempt, its error is surfaced as-is
    operation().await
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::KlineError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
            multiplier: 2,
            max_retries,
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.initial_backoff, Duration::from_millis(200));
        assert_eq!(policy.max_backoff, Duration::from_secs(5));
        assert_eq!(policy.max_retries, 3);
        assert_eq!(RetryPolicy::none().max_retries, 0);
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result: Result<&str, KlineError> = retry_with_backoff(
            &fast_policy(3),
            KlineError::is_retriable,
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(KlineError::RateLimited { status: 429 })
                    } else {
                        Ok("page")
                    }
                }
            },
        )
        .await;

        assert_eq!(result, Ok("page"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_malformed_response_is_not_retried() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result: Result<(), KlineError> = retry_with_backoff(
            &fast_policy(3),
            KlineError::is_retriable,
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(KlineError::MalformedResponse("not an array".to_string())) }
            },
        )
        .await;

        assert!(matches!(result, Err(KlineError::MalformedResponse(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_returns_last_error() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result: Result<(), KlineError> = retry_with_backoff(
            &fast_policy(2),
            KlineError::is_retriable,
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(KlineError::Transport("connection refused".to_string())) }
            },
        )
        .await;

        assert_eq!(
            result,
            Err(KlineError::Transport("connection refused".to_string()))
        );
        // 2 retries + 1 final attempt
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
