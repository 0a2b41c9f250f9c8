use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single cached value with creation time and an optional TTL.
///
/// `ttl_seconds = None` means the entry never expires on its own (it can
/// still be evicted by `max_size` pressure).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub ttl_seconds: Option<u64>,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, value: serde_json::Value, ttl_seconds: Option<u64>) -> Self {
        Self { key: key.into(), value, created_at: Utc::now(), ttl_seconds }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.ttl_seconds.map(|ttl| self.created_at + chrono::Duration::seconds(ttl as i64))
    }

    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.created_at
    }

    /// `a > ttl` iff expired; an infinite-TTL entry never expires.
    pub fn is_expired(&self) -> bool {
        match self.expires_at() {
            Some(expiry) => Utc::now() > expiry,
            None => false,
        }
    }
}
