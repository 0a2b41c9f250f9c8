//! Retry-with-backoff for adapter `fetch()` calls (spec §4.3, §7).
//!
//! Transient failures (5xx, timeout, connection error) are retried with
//! exponential backoff up to a configured cap. A 429 honors any
//! `Retry-After` the source provided instead of the backoff schedule.

use std::time::Duration;

/// What the inner fetch attempt reported, classified into the three
/// outcomes the retry loop cares about.
pub enum FetchOutcome<T> {
    Success(T),
    /// 5xx, timeout, connection reset — worth retrying with backoff.
    Transient,
    /// 429 with an optional `Retry-After` in seconds.
    RateLimited { retry_after_secs: Option<u64> },
    /// Anything else (4xx other than 429, malformed request) — not retried.
    Fatal,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let scaled = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_secs_f64(scaled.min(self.max_backoff.as_secs_f64()))
    }
}

/// Drive `attempt` until it succeeds, the retry budget is exhausted, or a
/// fatal error is returned. Returns `None` (the pipeline's signal to fall
/// back to the offline cache) when the budget is exhausted.
pub async fn fetch_with_retry<T, F, Fut>(policy: &RetryPolicy, mut attempt: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = FetchOutcome<T>>,
{
    for n in 0..policy.max_attempts {
        match attempt().await {
            FetchOutcome::Success(value) => return Some(value),
            FetchOutcome::Fatal => return None,
            FetchOutcome::RateLimited { retry_after_secs } => {
                let wait = retry_after_secs
                    .map(Duration::from_secs)
                    .unwrap_or_else(|| policy.backoff_for_attempt(n));
                tracing::warn!(attempt = n, wait_secs = wait.as_secs(), "adapter rate-limited, backing off");
                tokio::time::sleep(wait).await;
            }
            FetchOutcome::Transient => {
                let wait = policy.backoff_for_attempt(n);
                tracing::warn!(attempt = n, wait_secs = wait.as_secs(), "adapter transient failure, retrying");
                tokio::time::sleep(wait).await;
            }
        }
    }
    None
}
