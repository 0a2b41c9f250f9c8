//! Pricing/latency source adapter: cost-per-million-token figures plus
//! whatever latency percentiles the source happens to publish.

use crate::{AdapterError, AdapterFetcher, BenchmarkAdapter, UrlValidator};
use async_trait::async_trait;
use gateway_types::{MetricKind, RawMetric};
use std::sync::Arc;

pub struct PricingAdapter {
    source_tag: String,
    url: Option<String>,
    fetcher: Arc<AdapterFetcher>,
    validator: UrlValidator,
}

impl Default for PricingAdapter {
    fn default() -> Self {
        Self::new(None, Arc::new(AdapterFetcher::new(Arc::new(gateway_cache::InProcessCache::new(None)))))
    }
}

impl PricingAdapter {
    /// `url` is the operator-configured pricing source; `None` leaves this
    /// adapter permanently reporting `DataUnavailable` (no default
    /// third-party endpoint is hardcoded here).
    pub fn new(url: Option<String>, fetcher: Arc<AdapterFetcher>) -> Self {
        Self { source_tag: "pricing".to_string(), url, fetcher, validator: UrlValidator::default() }
    }
}

#[async_trait]
impl BenchmarkAdapter for PricingAdapter {
    fn source_tag(&self) -> &str {
        &self.source_tag
    }

    fn sync_interval_minutes(&self) -> u32 {
        60
    }

    async fn fetch(&self) -> Result<serde_json::Value, AdapterError> {
        let Some(url) = &self.url else { return Err(AdapterError::DataUnavailable) };
        self.fetcher.fetch_json(&self.source_tag, url, &self.validator).await
    }

    fn validate(&self, raw: &serde_json::Value) -> bool {
        raw.get("models").and_then(|m| m.as_array()).is_some()
    }

    fn parse(&self, raw: &serde_json::Value) -> Result<Vec<RawMetric>, AdapterError> {
        if !self.validate(raw) {
            return Err(AdapterError::InvalidPayload);
        }
        let mut metrics = Vec::new();
        for entry in raw["models"].as_array().unwrap() {
            let Some(name) = entry.get("name").and_then(|n| n.as_str()) else { continue };
            let prompt = entry.get("prompt_cost_per_million").and_then(|v| v.as_f64());
            let completion = entry.get("completion_cost_per_million").and_then(|v| v.as_f64());

            if let Some(p) = prompt {
                metrics.push(RawMetric::new(name, MetricKind::CostPromptPerMillion, p, &self.source_tag));
            }
            if let Some(c) = completion {
                metrics.push(RawMetric::new(name, MetricKind::CostCompletionPerMillion, c, &self.source_tag));
            }
            if let (Some(p), Some(c)) = (prompt, completion) {
                let blended = p * 0.7 + c * 0.3;
                metrics.push(RawMetric::new(name, MetricKind::CostBlendedPerMillion, blended, &self.source_tag));
            }
            if let Some(p50) = entry.get("latency_p50_ms").and_then(|v| v.as_f64()) {
                metrics.push(RawMetric::new(name, MetricKind::LatencyP50, p50, &self.source_tag));
            }
            if let Some(p90) = entry.get("latency_p90_ms").and_then(|v| v.as_f64()) {
                metrics.push(RawMetric::new(name, MetricKind::LatencyP90, p90, &self.source_tag));
            }
        }
        Ok(metrics)
    }
}
