//! Benchmark adapters (C3): fetch + parse one external benchmark source
//! into raw metrics. Each adapter is independent — a failure in one must
//! not block the others — and recovers transient/rate-limited errors
//! internally; its public surface only ever signals `DataUnavailable`.

pub mod arena;
pub mod error;
pub mod leaderboard;
pub mod local_inference;
pub mod pricing;
pub mod retry;
pub mod security;

pub use error::AdapterError;
pub use retry::{fetch_with_retry, FetchOutcome, RetryPolicy};
pub use security::UrlValidator;

use async_trait::async_trait;
use gateway_cache::Cache;
use gateway_types::RawMetric;
use std::sync::Arc;

/// Capability set every benchmark adapter implements, per spec §4.3.
#[async_trait]
pub trait BenchmarkAdapter: Send + Sync {
    /// Unique tag identifying this source (`"pricing"`, `"arena"`, ...).
    fn source_tag(&self) -> &str;

    /// Recommended interval between syncs, for the scheduler to honor.
    fn sync_interval_minutes(&self) -> u32;

    /// Fetch the raw payload from the external source. May block on I/O;
    /// retried internally per `RetryPolicy` by the caller.
    async fn fetch(&self) -> Result<serde_json::Value, AdapterError>;

    /// Parse a fetched payload into the closed metric taxonomy. Must be
    /// pure and deterministic: same input, same output.
    fn parse(&self, raw: &serde_json::Value) -> Result<Vec<RawMetric>, AdapterError>;

    /// Structural sanity check run before `parse` is trusted.
    fn validate(&self, raw: &serde_json::Value) -> bool;
}

/// How long a fetched payload stays fresh in the offline cache before a
/// live fetch is preferred again. `retrieve_stale_raw` can still read it
/// past this point when a live fetch fails.
const CACHE_TTL_SECONDS: u64 = 3600;

/// Shared HTTP client, retry policy, and offline cache behind every
/// adapter's `fetch()`. One instance is built in `gateway-server`'s `main`
/// and handed to each adapter constructor, so all sources share one
/// connection pool and one cache keyed by `source_tag`.
pub struct AdapterFetcher {
    client: reqwest::Client,
    cache: Arc<dyn Cache>,
    policy: RetryPolicy,
}

impl AdapterFetcher {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { client: reqwest::Client::new(), cache, policy: RetryPolicy::default() }
    }

    /// Validate `url` through `validator`, fetch it with retry, and cache
    /// the result under `source_tag`. On an exhausted retry budget, falls
    /// back to the last-known (possibly expired) cached payload; only
    /// reports `DataUnavailable` when neither a live fetch nor a cached
    /// payload is available.
    pub async fn fetch_json(
        &self,
        source_tag: &str,
        url: &str,
        validator: &UrlValidator,
    ) -> Result<serde_json::Value, AdapterError> {
        validator.validate(url).map_err(|e| AdapterError::Http(format!("blocked outbound URL: {e}")))?;

        let cache_key = format!("adapter:{source_tag}:raw");
        let client = self.client.clone();
        let url = url.to_string();
        let outcome = fetch_with_retry(&self.policy, || {
            let client = client.clone();
            let url = url.clone();
            async move { attempt_fetch(&client, &url).await }
        })
        .await;

        match outcome {
            Some(value) => {
                self.cache.set_raw(&cache_key, value.clone(), Some(CACHE_TTL_SECONDS)).await;
                Ok(value)
            }
            None => match self.cache.retrieve_stale_raw(&cache_key).await {
                Some(stale) => {
                    tracing::warn!(source = source_tag, "live fetch exhausted retries, serving stale cached payload");
                    Ok(stale)
                }
                None => Err(AdapterError::DataUnavailable),
            },
        }
    }
}

async fn attempt_fetch(client: &reqwest::Client, url: &str) -> FetchOutcome<serde_json::Value> {
    let response = match client.get(url).send().await {
        Ok(resp) => resp,
        Err(e) if e.is_timeout() || e.is_connect() => return FetchOutcome::Transient,
        Err(_) => return FetchOutcome::Fatal,
    };

    let status = response.status();
    if status.as_u16() == 429 {
        let retry_after_secs =
            response.headers().get(reqwest::header::RETRY_AFTER).and_then(|v| v.to_str().ok()).and_then(|s| s.parse().ok());
        return FetchOutcome::RateLimited { retry_after_secs };
    }
    if status.is_server_error() {
        return FetchOutcome::Transient;
    }
    if !status.is_success() {
        return FetchOutcome::Fatal;
    }
    match response.json::<serde_json::Value>().await {
        Ok(value) => FetchOutcome::Success(value),
        Err(_) => FetchOutcome::Fatal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_deterministic_across_adapters() {
        let adapters: Vec<Box<dyn BenchmarkAdapter>> = vec![
            Box::new(crate::pricing::PricingAdapter::default()),
            Box::new(crate::arena::ArenaAdapter::default()),
            Box::new(crate::leaderboard::LeaderboardAdapter::default()),
        ];
        for adapter in adapters {
            let raw = sample_payload(adapter.source_tag());
            let first = adapter.parse(&raw).unwrap();
            let second = adapter.parse(&raw).unwrap();
            assert_eq!(
                first.iter().map(|m| (m.model_name.clone(), m.metric_type.as_str(), m.value)).collect::<Vec<_>>(),
                second.iter().map(|m| (m.model_name.clone(), m.metric_type.as_str(), m.value)).collect::<Vec<_>>(),
                "{} adapter parse() is not deterministic",
                adapter.source_tag()
            );
        }
    }

    fn sample_payload(tag: &str) -> serde_json::Value {
        match tag {
            "pricing" => serde_json::json!({"models": [
                {"name": "gpt-4", "prompt_cost_per_million": 10.0, "completion_cost_per_million": 30.0, "latency_p50_ms": 400.0, "latency_p90_ms": 900.0}
            ]}),
            "arena" => serde_json::json!({"leaderboard": [
                {"model": "gpt-4", "elo": 1280.0, "ci_width": 12.0}
            ]}),
            "leaderboard" => serde_json::json!({"results": [
                {"model": "gpt-4", "scores": {"mmlu": 88.0, "gsm8k": 92.0, "humaneval": 85.0}}
            ]}),
            _ => serde_json::json!({}),
        }
    }
}
