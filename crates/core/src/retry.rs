use std::time::Duration;

use rand::Rng;

use crate::error::{KursError, Result};

/// Retry policy shared by every outbound call: model requests, platform
/// lookups, and the rate limiter's own wrapper all go through
/// [`retry_with_backoff`] rather than carrying their own loops.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(32),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff with up to 10% jitter, capped at `max_backoff`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.initial_backoff.as_millis() as f64;
        let jitter = 1.0 + rand::rng().random_range(0.0..0.1);
        let delay = base * 2f64.powi(attempt as i32) * jitter;
        Duration::from_millis(delay as u64).min(self.max_backoff)
    }
}

/// Run `op`, retrying on errors whose [`ErrorKind`](crate::error::ErrorKind)
/// is retryable. Non-retryable errors propagate on the first attempt; after
/// the final attempt the last error is returned unchanged. `on_failure` is
/// invoked once per failed attempt, before any backoff sleep.
pub async fn retry_with_backoff<T, F, C>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
    mut on_failure: C,
) -> Result<T>
where
    F: AsyncFnMut() -> Result<T>,
    C: FnMut(&KursError, u32),
{
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            tracing::info!(target: "retry", label, attempt, max = policy.max_retries, "retrying");
        }

        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                tracing::warn!(
                    target: "retry",
                    label,
                    attempt,
                    kind = ?err.kind(),
                    error = %err,
                    "attempt failed"
                );
                on_failure(&err, attempt);

                if !err.is_retryable() || attempt >= policy.max_retries {
                    return Err(err);
                }

                let delay = policy.backoff_delay(attempt);
                tracing::debug!(target: "retry", label, delay_ms = delay.as_millis() as u64, "backing off");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn transient() -> KursError {
        KursError::UpstreamStatus {
            status: 503,
            body: "socket hang up".into(),
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(100),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors_up_to_the_cap() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_with_backoff(
            &fast_policy(),
            "test",
            async || {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(transient())
            },
            |_, _| {},
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        match result {
            Err(KursError::UpstreamStatus { status: 503, body }) => {
                assert_eq!(body, "socket hang up");
            }
            other => panic!("expected the original error, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(
            &fast_policy(),
            "test",
            async || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 { Err(transient()) } else { Ok(n) }
            },
            |_, _| {},
        )
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn does_not_retry_validation_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_with_backoff(
            &fast_policy(),
            "test",
            async || {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(KursError::InvalidResponse {
                    reason: "schema mismatch".into(),
                })
            },
            |_, _| {},
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(KursError::InvalidResponse { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_hook_sees_every_attempt() {
        let seen = std::sync::Mutex::new(Vec::new());
        let _: Result<()> = retry_with_backoff(
            &fast_policy(),
            "test",
            async || Err(transient()),
            |_, attempt| seen.lock().unwrap().push(attempt),
        )
        .await;

        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(500),
        };

        let d0 = policy.backoff_delay(0);
        let d1 = policy.backoff_delay(1);
        assert!(d0 >= Duration::from_millis(100) && d0 < Duration::from_millis(111));
        assert!(d1 >= Duration::from_millis(200) && d1 < Duration::from_millis(221));
        assert_eq!(policy.backoff_delay(4), Duration::from_millis(500));
    }
}
