//! Arena-style quality source adapter: ELO ratings and, when a confidence
//! interval is present, a derived `elo_uncertainty`.

use crate::{AdapterError, AdapterFetcher, BenchmarkAdapter, UrlValidator};
use async_trait::async_trait;
use gateway_types::{MetricKind, RawMetric};
use std::sync::Arc;

pub struct ArenaAdapter {
    source_tag: String,
    url: Option<String>,
    fetcher: Arc<AdapterFetcher>,
    validator: UrlValidator,
}

impl Default for ArenaAdapter {
    fn default() -> Self {
        Self::new(None, Arc::new(AdapterFetcher::new(Arc::new(gateway_cache::InProcessCache::new(None)))))
    }
}

impl ArenaAdapter {
    pub fn new(url: Option<String>, fetcher: Arc<AdapterFetcher>) -> Self {
        Self { source_tag: "arena".to_string(), url, fetcher, validator: UrlValidator::default() }
    }
}

#[async_trait]
impl BenchmarkAdapter for ArenaAdapter {
    fn source_tag(&self) -> &str {
        &self.source_tag
    }

    fn sync_interval_minutes(&self) -> u32 {
        180
    }

    async fn fetch(&self) -> Result<serde_json::Value, AdapterError> {
        let Some(url) = &self.url else { return Err(AdapterError::DataUnavailable) };
        self.fetcher.fetch_json(&self.source_tag, url, &self.validator).await
    }

    fn validate(&self, raw: &serde_json::Value) -> bool {
        raw.get("leaderboard").and_then(|v| v.as_array()).is_some()
    }

    fn parse(&self, raw: &serde_json::Value) -> Result<Vec<RawMetric>, AdapterError> {
        if !self.validate(raw) {
            return Err(AdapterError::InvalidPayload);
        }
        let mut metrics = Vec::new();
        for entry in raw["leaderboard"].as_array().unwrap() {
            let Some(name) = entry.get("model").and_then(|n| n.as_str()) else { continue };
            let Some(elo) = entry.get("elo").and_then(|v| v.as_f64()) else { continue };
            metrics.push(RawMetric::new(name, MetricKind::EloRating, elo, &self.source_tag));
            if let Some(ci_width) = entry.get("ci_width").and_then(|v| v.as_f64()) {
                if elo != 0.0 {
                    metrics.push(RawMetric::new(
                        name,
                        MetricKind::EloUncertainty,
                        ci_width / elo,
                        &self.source_tag,
                    ));
                }
            }
        }
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_uncertainty_from_confidence_interval() {
        let adapter = ArenaAdapter::default();
        let payload = serde_json::json!({"leaderboard": [{"model": "gpt-4", "elo": 1280.0, "ci_width": 12.8}]});
        let metrics = adapter.parse(&payload).unwrap();
        let unc = metrics.iter().find(|m| matches!(m.metric_type, MetricKind::EloUncertainty)).unwrap();
        assert!((unc.value - 0.01).abs() < 1e-9);
    }

    #[test]
    fn missing_ci_width_skips_uncertainty_metric() {
        let adapter = ArenaAdapter::default();
        let payload = serde_json::json!({"leaderboard": [{"model": "gpt-4", "elo": 1280.0}]});
        let metrics = adapter.parse(&payload).unwrap();
        assert!(metrics.iter().all(|m| !matches!(m.metric_type, MetricKind::EloUncertainty)));
    }
}
