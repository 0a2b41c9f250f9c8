//! Offline cache (C4): a TTL-bounded persistent store of last-known-good
//! adapter payloads, with a stale-fallback escape hatch for when a live
//! fetch fails and the pipeline must degrade gracefully rather than stall.

pub mod entry;
pub mod in_process;

pub use entry::CacheEntry;
pub use in_process::InProcessCache;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("value for key {0:?} not found or expired")]
    Miss(String),
}

/// Capability set a cache implementation provides, per spec §4.4. Both the
/// in-process variant and a future shared (Redis-like) variant implement
/// this so callers (the adapters pipeline, the metrics-view cache) do not
/// need to know which backend they are talking to.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get_raw(&self, key: &str) -> Option<serde_json::Value>;
    async fn set_raw(&self, key: &str, value: serde_json::Value, ttl_seconds: Option<u64>);
    async fn delete(&self, key: &str) -> bool;
    async fn exists(&self, key: &str) -> bool;
    /// Clear entries matching `pattern` (glob semantics); `None` clears all.
    async fn clear(&self, pattern: Option<&str>) -> usize;
    /// Bypass the TTL check entirely and return the last-known value for
    /// `key`, expired or not. Used only on a live-fetch failure so that
    /// routing can proceed on degraded data instead of failing outright.
    async fn retrieve_stale_raw(&self, key: &str) -> Option<serde_json::Value>;
    async fn increment(&self, key: &str, delta: i64, ttl_seconds: Option<u64>) -> i64;
    fn len(&self) -> usize;
}

/// Typed convenience wrapper over the raw `Cache` trait. Implemented for
/// every `Cache` so callers can `cache.get::<MyType>("key")` directly.
#[async_trait]
pub trait TypedCache: Cache {
    async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get_raw(key).await?;
        serde_json::from_value(raw).ok()
    }

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl_seconds: Option<u64>) {
        if let Ok(raw) = serde_json::to_value(value) {
            self.set_raw(key, raw, ttl_seconds).await;
        }
    }

    async fn retrieve_stale<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.retrieve_stale_raw(key).await?;
        serde_json::from_value(raw).ok()
    }

    async fn get_many<T: DeserializeOwned>(&self, keys: &[String]) -> Vec<Option<T>> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            out.push(self.get(key).await);
        }
        out
    }

    async fn set_many<T: Serialize + Send + Sync>(&self, entries: &[(String, T)], ttl_seconds: Option<u64>) {
        for (key, value) in entries {
            self.set(key, value, ttl_seconds).await;
        }
    }

    /// Return the cached value for `key`, or compute and store it via
    /// `factory` on a miss. `factory` is only invoked when the cache does
    /// not already hold a live (non-expired) value.
    async fn get_or_compute<T, F, Fut>(&self, key: &str, ttl_seconds: Option<u64>, factory: F) -> T
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: std::future::Future<Output = T> + Send,
    {
        if let Some(existing) = self.get::<T>(key).await {
            return existing;
        }
        let computed = factory().await;
        self.set(key, &computed, ttl_seconds).await;
        computed
    }
}

impl<C: Cache + ?Sized> TypedCache for C {}
