use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError {
    #[error("circuit is open – refusing call")]
    Open,
    #[error("call timed out after {0:?}")]
    Timeout(Duration),
    #[error("inner error: {0}")]
    Inner(String),
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation – all calls pass through.
    Closed,
    /// Too many failures – calls are rejected immediately.
    Open,
    /// Testing recovery – limited calls are allowed through.
    HalfOpen,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// Unused by `record_success_inner` — a half-open breaker closes on its
    /// first successful probe regardless of this value. Kept on the config
    /// struct for callers that still construct it positionally.
    pub success_threshold: u32,
    /// How long the circuit stays open before transitioning to half-open.
    pub timeout: Duration,
    /// Maximum duration for an individual call.
    pub call_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout: Duration::from_secs(60),
            call_timeout: Duration::from_secs(30),
        }
    }
}

// ---------------------------------------------------------------------------
// Inner state (behind Mutex)
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct InnerState {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure_time: Option<Instant>,
}

// ---------------------------------------------------------------------------
// CircuitBreaker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Arc<Mutex<InnerState>>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Arc::new(Mutex::new(InnerState {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure_time: None,
            })),
        }
    }

    /// Returns the current state of the circuit breaker.
    pub async fn state(&self) -> CircuitState {
        let guard = self.inner.lock().await;
        guard.state
    }

    /// Returns the current failure count.
    pub async fn failure_count(&self) -> u32 {
        let guard = self.inner.lock().await;
        guard.failure_count
    }

    /// Returns the current success count (relevant in half-open).
    pub async fn success_count(&self) -> u32 {
        let guard = self.inner.lock().await;
        guard.success_count
    }

    /// Execute `f` through the circuit breaker.
    ///
    /// If the circuit is **Open** and the timeout has not elapsed the call is
    /// rejected immediately.  If the timeout *has* elapsed the circuit moves
    /// to **HalfOpen** and the call is allowed through.
    pub async fn call<F, Fut, T, E>(&self, f: F) -> Result<T, CircuitBreakerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        // --- pre-flight check ---
        {
            let mut guard = self.inner.lock().await;
            match guard.state {
                CircuitState::Open => {
                    // Check whether the timeout has elapsed.
                    if let Some(last) = guard.last_failure_time {
                        if last.elapsed() >= self.config.timeout {
                            info!("circuit breaker transitioning Open -> HalfOpen");
                            guard.state = CircuitState::HalfOpen;
                            guard.success_count = 0;
                        } else {
                            return Err(CircuitBreakerError::Open);
                        }
                    } else {
                        return Err(CircuitBreakerError::Open);
                    }
                }
                CircuitState::Closed | CircuitState::HalfOpen => { /* allow */ }
            }
        }

        // --- execute with timeout ---
        let result = tokio::time::timeout(self.config.call_timeout, f()).await;

        match result {
            Ok(Ok(value)) => {
                self.record_success().await;
                Ok(value)
            }
            Ok(Err(e)) => {
                self.record_failure().await;
                Err(CircuitBreakerError::Inner(e.to_string()))
            }
            Err(_elapsed) => {
                self.record_failure().await;
                Err(CircuitBreakerError::Timeout(self.config.call_timeout))
            }
        }
    }

    /// True in `Closed` and `HalfOpen` — i.e. whether a caller should
    /// attempt to route to the guarded target at all right now. Reading
    /// this performs the same lazy `Open` -> `HalfOpen` transition as
    /// [`CircuitBreaker::call`].
    pub async fn is_available(&self) -> bool {
        let mut guard = self.inner.lock().await;
        if guard.state == CircuitState::Open {
            if let Some(last) = guard.last_failure_time {
                if last.elapsed() >= self.config.timeout {
                    info!("circuit breaker transitioning Open -> HalfOpen");
                    guard.state = CircuitState::HalfOpen;
                    guard.success_count = 0;
                }
            }
        }
        guard.state != CircuitState::Open
    }

    /// Record a successful outcome observed by the caller directly, without
    /// routing the call itself through [`CircuitBreaker::call`]. Used when
    /// the guarded operation (an upstream LLM request) happens outside this
    /// crate's control.
    pub async fn record_success(&self) {
        self.record_success_inner().await;
    }

    /// Record a failed outcome observed by the caller directly. See
    /// [`CircuitBreaker::record_success`].
    pub async fn record_failure(&self) {
        self.record_failure_inner().await;
    }

    // ----- helpers -----

    async fn record_success_inner(&self) {
        let mut guard = self.inner.lock().await;
        match guard.state {
            // A single successful probe call closes the circuit outright,
            // regardless of `success_threshold` — a half-open breaker is
            // only ever probed with one call at a time, so demanding more
            // than one success here would mean it can never close.
            CircuitState::HalfOpen => {
                info!("circuit breaker transitioning HalfOpen -> Closed");
                guard.state = CircuitState::Closed;
                guard.failure_count = 0;
                guard.success_count = 0;
            }
            CircuitState::Closed => {
                // Reset failure streak on success.
                guard.failure_count = 0;
            }
            CircuitState::Open => { /* shouldn't happen */ }
        }
    }

    async fn record_failure_inner(&self) {
        let mut guard = self.inner.lock().await;
        guard.failure_count += 1;
        guard.last_failure_time = Some(Instant::now());

        match guard.state {
            CircuitState::Closed => {
                if guard.failure_count >= self.config.failure_threshold {
                    warn!(
                        failures = guard.failure_count,
                        "circuit breaker transitioning Closed -> Open"
                    );
                    guard.state = CircuitState::Open;
                }
            }
            CircuitState::HalfOpen => {
                warn!("circuit breaker transitioning HalfOpen -> Open (failure during probe)");
                guard.state = CircuitState::Open;
                guard.success_count = 0;
            }
            CircuitState::Open => { /* already open */ }
        }
    }

    /// Manually reset the circuit breaker to the **Closed** state.
    pub async fn reset(&self) {
        let mut guard = self.inner.lock().await;
        guard.state = CircuitState::Closed;
        guard.failure_count = 0;
        guard.success_count = 0;
        guard.last_failure_time = None;
    }
}

// ---------------------------------------------------------------------------
// Registry — one breaker per canonical model id, created lazily
// ---------------------------------------------------------------------------

/// Holds one [`CircuitBreaker`] per canonical model id, created on first use
/// with a shared config.
#[derive(Debug)]
pub struct CircuitBreakerRegistry {
    config: CircuitBreakerConfig,
    breakers: DashMap<i64, CircuitBreaker>,
}

impl CircuitBreakerRegistry {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self { config, breakers: DashMap::new() }
    }

    fn get_or_create(&self, model_id: i64) -> CircuitBreaker {
        self.breakers
            .entry(model_id)
            .or_insert_with(|| CircuitBreaker::new(self.config.clone()))
            .clone()
    }

    pub async fn is_available(&self, model_id: i64) -> bool {
        self.get_or_create(model_id).is_available().await
    }

    pub async fn record_success(&self, model_id: i64) {
        self.get_or_create(model_id).record_success().await;
    }

    pub async fn record_failure(&self, model_id: i64) {
        self.get_or_create(model_id).record_failure().await;
    }

    pub async fn state(&self, model_id: i64) -> CircuitState {
        self.get_or_create(model_id).state().await
    }

    pub async fn reset(&self, model_id: i64) {
        self.get_or_create(model_id).reset().await;
    }

    pub fn reset_all(&self) {
        self.breakers.clear();
    }
}

#[cfg(test)]
mod registry_tests {
    use super::*;

    fn fast_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 2,
            success_threshold: 1,
            timeout: Duration::from_millis(50),
            call_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn unknown_model_starts_available() {
        let registry = CircuitBreakerRegistry::new(fast_config());
        assert!(registry.is_available(42).await);
    }

    #[tokio::test]
    async fn failures_isolated_per_model() {
        let registry = CircuitBreakerRegistry::new(fast_config());
        registry.record_failure(1).await;
        registry.record_failure(1).await;
        assert!(!registry.is_available(1).await);
        assert!(registry.is_available(2).await);
    }

    #[tokio::test]
    async fn reset_all_clears_every_breaker() {
        let registry = CircuitBreakerRegistry::new(fast_config());
        registry.record_failure(1).await;
        registry.record_failure(1).await;
        assert!(!registry.is_available(1).await);
        registry.reset_all();
        assert!(registry.is_available(1).await);
    }
}
