use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::error::{KursError, Result};
use crate::retry::{RetryPolicy, retry_with_backoff};

const WINDOW: Duration = Duration::from_secs(60);
const PRUNE_INTERVAL: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Default)]
struct WindowState {
    /// Admission time and estimated token cost of each recent request.
    entries: VecDeque<(Instant, u32)>,
    /// Consecutive failures per operation id, cleared on success or when
    /// the window drains.
    error_counts: HashMap<String, u32>,
}

impl WindowState {
    fn prune(&mut self, now: Instant) {
        while let Some((at, _)) = self.entries.front() {
            if now.duration_since(*at) > WINDOW {
                self.entries.pop_front();
            } else {
                break;
            }
        }
        if self.entries.is_empty() && !self.error_counts.is_empty() {
            self.error_counts.clear();
        }
    }

    fn usage(&self) -> (u32, u64) {
        let tokens = self.entries.iter().map(|(_, t)| *t as u64).sum();
        (self.entries.len() as u32, tokens)
    }
}

/// Request/token budget enforcement over a rolling one-minute window.
///
/// Explicitly constructed and passed to call sites; there is no process
/// global. The constructor starts a periodic prune task, [`close`] stops it
/// (dropping the limiter stops it too). Pruning also runs inline on every
/// admission check, so correctness never depends on the task's timing.
///
/// [`close`]: RateLimiter::close
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Arc<Mutex<WindowState>>,
    prune_task: Mutex<Option<JoinHandle<()>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let state = Arc::new(Mutex::new(WindowState::default()));

        let prune_state = Arc::clone(&state);
        let prune_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(PRUNE_INTERVAL);
            loop {
                interval.tick().await;
                prune_state.lock().unwrap().prune(Instant::now());
            }
        });

        Self {
            config,
            state,
            prune_task: Mutex::new(Some(prune_task)),
        }
    }

    /// Stop the periodic prune task. Admission keeps working afterwards;
    /// only the background cleanup stops.
    pub fn close(&self) {
        if let Some(task) = self.prune_task.lock().unwrap().take() {
            task.abort();
        }
    }

    /// Rough token estimate from text length, one token per four characters.
    pub fn estimate_tokens(text: &str) -> u32 {
        (text.len().div_ceil(4)) as u32
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.config.max_retries,
            initial_backoff: Duration::from_millis(self.config.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.config.max_backoff_ms),
        }
    }

    /// Consecutive failure count recorded for an operation id.
    pub fn failure_count(&self, operation_id: &str) -> u32 {
        self.state
            .lock()
            .unwrap()
            .error_counts
            .get(operation_id)
            .copied()
            .unwrap_or(0)
    }

    /// Wait until the window has room for a request of `tokens`, then record
    /// it. The entry is admitted before the caller executes, so concurrent
    /// callers cannot overshoot the budget between check and call.
    async fn acquire(&self, tokens: u32) {
        loop {
            {
                let mut state = self.state.lock().unwrap();
                state.prune(Instant::now());
                let (requests, window_tokens) = state.usage();
                if requests < self.config.requests_per_minute
                    && window_tokens + tokens as u64 <= self.config.tokens_per_minute as u64
                {
                    state.entries.push_back((Instant::now(), tokens));
                    return;
                }
                tracing::debug!(
                    target: "limiter",
                    requests,
                    window_tokens,
                    wanted = tokens,
                    "budget exhausted, waiting for window"
                );
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Run `op` under budget enforcement with the shared retry policy.
    ///
    /// A request whose estimate exceeds the per-request ceiling fails
    /// immediately: it is never admitted, attempted, or retried.
    pub async fn with_retry<T, F>(
        &self,
        operation_id: &str,
        token_estimate: u32,
        mut op: F,
    ) -> Result<T>
    where
        F: AsyncFnMut() -> Result<T>,
    {
        if token_estimate > self.config.max_tokens_per_request {
            return Err(KursError::TokenBudget {
                estimated: token_estimate,
                limit: self.config.max_tokens_per_request,
            });
        }

        let result = retry_with_backoff(
            &self.retry_policy(),
            operation_id,
            async || {
                self.acquire(token_estimate).await;
                op().await
            },
            |_, _| {
                let mut state = self.state.lock().unwrap();
                *state
                    .error_counts
                    .entry(operation_id.to_string())
                    .or_insert(0) += 1;
            },
        )
        .await;

        if result.is_ok() {
            self.state.lock().unwrap().error_counts.remove(operation_id);
        }
        result
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.close();
    }
}
