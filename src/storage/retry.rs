//! Bounded retry with fixed backoff.
//!
//! Startup-time calls against the object store are wrapped in
//! [`retry_fixed`] instead of a hand-rolled counting loop: a fixed number
//! of attempts, a fixed inter-attempt delay, and a per-attempt timeout so
//! a hung connection cannot stall the sequence indefinitely.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::warn;

/// Attempt count, inter-attempt delay, and per-attempt timeout for one
/// retried operation.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    /// Policy for bucket bootstrap: 15 attempts, 2s apart, 5s per attempt.
    pub fn bootstrap() -> Self {
        Self {
            attempts: 15,
            delay: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(5),
        }
    }
}

/// Terminal outcome of a retried operation that never succeeded.
#[derive(Debug, Error)]
pub enum RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// Every attempt failed; carries the error from the last one.
    #[error("`{label}` failed after {attempts} attempts")]
    Exhausted {
        label: &'static str,
        attempts: u32,
        #[source]
        last: E,
    },

    /// The last attempt hit the per-attempt timeout.
    #[error("`{label}` timed out after {attempts} attempts ({attempt_timeout:?} per attempt)")]
    TimedOut {
        label: &'static str,
        attempts: u32,
        attempt_timeout: Duration,
    },
}

/// Run `op` until it succeeds or the policy is exhausted.
///
/// Each attempt is bounded by `policy.attempt_timeout`; a timed-out attempt
/// counts like a failed one. The inter-attempt delay stays fixed across
/// attempts.
pub async fn retry_fixed<T, E, F, Fut>(
    policy: RetryPolicy,
    label: &'static str,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::error::Error + 'static,
{
    let mut last: Option<RetryError<E>> = None;

    for attempt in 1..=policy.attempts {
        if attempt > 1 {
            sleep(policy.delay).await;
        }

        match timeout(policy.attempt_timeout, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(err)) => {
                warn!(
                    operation = label,
                    attempt,
                    max_attempts = policy.attempts,
                    error = %err,
                    "attempt failed"
                );
                last = Some(RetryError::Exhausted {
                    label,
                    attempts: policy.attempts,
                    last: err,
                });
            }
            Err(_elapsed) => {
                warn!(
                    operation = label,
                    attempt,
                    max_attempts = policy.attempts,
                    timeout_ms = policy.attempt_timeout.as_millis() as u64,
                    "attempt timed out"
                );
                last = Some(RetryError::TimedOut {
                    label,
                    attempts: policy.attempts,
                    attempt_timeout: policy.attempt_timeout,
                });
            }
        }
    }

    // Reached only with a zero-attempt policy, which this crate never
    // constructs.
    Err(last.unwrap_or(RetryError::TimedOut {
        label,
        attempts: 0,
        attempt_timeout: policy.attempt_timeout,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            delay: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = retry_fixed(policy(5), "flaky", || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(io::Error::new(io::ErrorKind::ConnectionRefused, "down"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.expect("third attempt succeeds"), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_after_configured_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_fixed(policy(4), "always-down", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(io::Error::new(io::ErrorKind::ConnectionRefused, "down")) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        match result {
            Err(RetryError::Exhausted {
                label, attempts, ..
            }) => {
                assert_eq!(label, "always-down");
                assert_eq!(attempts, 4);
            }
            other => panic!("expected Exhausted, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failed_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<(), RetryError<io::Error>> = retry_fixed(policy(2), "hung", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                // Never resolves within the per-attempt timeout.
                sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(matches!(result, Err(RetryError::TimedOut { attempts: 2, .. })));
    }
}
