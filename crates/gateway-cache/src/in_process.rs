//! In-process cache variant (C4): single-writer discipline behind a mutex,
//! with a background sweep task for opportunistic expiry.

use crate::entry::CacheEntry;
use crate::Cache;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

struct State {
    entries: HashMap<String, CacheEntry>,
    max_size: Option<usize>,
}

/// A mutex-guarded, single-process TTL cache. `retrieve_stale` bypasses the
/// TTL check entirely, which is the only sanctioned way to read an expired
/// entry (used when a live adapter fetch has failed).
pub struct InProcessCache {
    state: Arc<Mutex<State>>,
    sweep_handle: Option<JoinHandle<()>>,
}

impl InProcessCache {
    pub fn new(max_size: Option<usize>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State { entries: HashMap::new(), max_size })),
            sweep_handle: None,
        }
    }

    /// Spawn a background task that sweeps expired entries every
    /// `interval`. Dropping the returned cache (or calling
    /// `stop_sweeper`) cancels it.
    pub fn with_background_sweep(max_size: Option<usize>, interval: Duration) -> Self {
        let state = Arc::new(Mutex::new(State { entries: HashMap::new(), max_size }));
        let sweep_state = state.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let mut guard = sweep_state.lock().await;
                guard.entries.retain(|_, e| !e.is_expired());
            }
        });
        Self { state, sweep_handle: Some(handle) }
    }

    pub fn stop_sweeper(&mut self) {
        if let Some(handle) = self.sweep_handle.take() {
            handle.abort();
        }
    }

    /// Evict the oldest-by-creation-time entries until `max_size` is
    /// satisfied. Called with the lock already held.
    fn evict_over_capacity(state: &mut State) {
        let Some(max) = state.max_size else { return };
        while state.entries.len() > max {
            let oldest_key = state
                .entries
                .values()
                .min_by_key(|e| e.created_at)
                .map(|e| e.key.clone());
            match oldest_key {
                Some(k) => {
                    state.entries.remove(&k);
                }
                None => break,
            }
        }
    }
}

impl Drop for InProcessCache {
    fn drop(&mut self) {
        self.stop_sweeper();
    }
}

#[async_trait]
impl Cache for InProcessCache {
    async fn get_raw(&self, key: &str) -> Option<serde_json::Value> {
        let mut guard = self.state.lock().await;
        let expired = guard.entries.get(key).map(|e| e.is_expired());
        match expired {
            Some(true) => {
                guard.entries.remove(key);
                None
            }
            Some(false) => guard.entries.get(key).map(|e| e.value.clone()),
            None => None,
        }
    }

    async fn set_raw(&self, key: &str, value: serde_json::Value, ttl_seconds: Option<u64>) {
        let mut guard = self.state.lock().await;
        guard.entries.insert(key.to_string(), CacheEntry::new(key, value, ttl_seconds));
        Self::evict_over_capacity(&mut guard);
    }

    async fn delete(&self, key: &str) -> bool {
        let mut guard = self.state.lock().await;
        guard.entries.remove(key).is_some()
    }

    async fn exists(&self, key: &str) -> bool {
        self.get_raw(key).await.is_some()
    }

    async fn clear(&self, pattern: Option<&str>) -> usize {
        let mut guard = self.state.lock().await;
        match pattern {
            None => {
                let n = guard.entries.len();
                guard.entries.clear();
                n
            }
            Some(pat) => {
                let matcher = glob::Pattern::new(pat).ok();
                let before = guard.entries.len();
                guard.entries.retain(|k, _| match &matcher {
                    Some(m) => !m.matches(k),
                    None => k != pat,
                });
                before - guard.entries.len()
            }
        }
    }

    async fn retrieve_stale_raw(&self, key: &str) -> Option<serde_json::Value> {
        let guard = self.state.lock().await;
        guard.entries.get(key).map(|e| e.value.clone())
    }

    async fn increment(&self, key: &str, delta: i64, ttl_seconds: Option<u64>) -> i64 {
        let mut guard = self.state.lock().await;
        let current = match guard.entries.get(key) {
            Some(e) if !e.is_expired() => e.value.as_i64().unwrap_or(0),
            _ => 0,
        };
        let next = current + delta;
        guard
            .entries
            .insert(key.to_string(), CacheEntry::new(key, serde_json::json!(next), ttl_seconds));
        next
    }

    fn len(&self) -> usize {
        self.state.try_lock().map(|g| g.entries.len()).unwrap_or(0)
    }
}
