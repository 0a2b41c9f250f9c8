//! Leaderboard source adapter: per-benchmark scores normalized to [0,100]
//! by the source, plus a derived `benchmark_average` when at least 3
//! component scores are present.

use crate::{AdapterError, AdapterFetcher, BenchmarkAdapter, UrlValidator};
use async_trait::async_trait;
use gateway_types::{MetricKind, RawMetric};
use std::sync::Arc;

pub struct LeaderboardAdapter {
    source_tag: String,
    url: Option<String>,
    fetcher: Arc<AdapterFetcher>,
    validator: UrlValidator,
}

impl Default for LeaderboardAdapter {
    fn default() -> Self {
        Self::new(None, Arc::new(AdapterFetcher::new(Arc::new(gateway_cache::InProcessCache::new(None)))))
    }
}

impl LeaderboardAdapter {
    pub fn new(url: Option<String>, fetcher: Arc<AdapterFetcher>) -> Self {
        Self { source_tag: "leaderboard".to_string(), url, fetcher, validator: UrlValidator::default() }
    }
}

#[async_trait]
impl BenchmarkAdapter for LeaderboardAdapter {
    fn source_tag(&self) -> &str {
        &self.source_tag
    }

    fn sync_interval_minutes(&self) -> u32 {
        1440
    }

    async fn fetch(&self) -> Result<serde_json::Value, AdapterError> {
        let Some(url) = &self.url else { return Err(AdapterError::DataUnavailable) };
        self.fetcher.fetch_json(&self.source_tag, url, &self.validator).await
    }

    fn validate(&self, raw: &serde_json::Value) -> bool {
        raw.get("results").and_then(|v| v.as_array()).is_some()
    }

    fn parse(&self, raw: &serde_json::Value) -> Result<Vec<RawMetric>, AdapterError> {
        if !self.validate(raw) {
            return Err(AdapterError::InvalidPayload);
        }
        let mut metrics = Vec::new();
        for entry in raw["results"].as_array().unwrap() {
            let Some(name) = entry.get("model").and_then(|n| n.as_str()) else { continue };
            let Some(scores) = entry.get("scores").and_then(|v| v.as_object()) else { continue };

            let mut values = Vec::new();
            for (benchmark, value) in scores {
                let Some(v) = value.as_f64() else { continue };
                values.push(v);
                metrics.push(RawMetric::new(
                    name,
                    MetricKind::Benchmark(benchmark.clone()),
                    v,
                    &self.source_tag,
                ));
            }
            if values.len() >= 3 {
                let avg = values.iter().sum::<f64>() / values.len() as f64;
                metrics.push(RawMetric::new(name, MetricKind::BenchmarkAverage, avg, &self.source_tag));
            }
        }
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_emitted_only_with_three_or_more_scores() {
        let adapter = LeaderboardAdapter::default();
        let payload = serde_json::json!({"results": [
            {"model": "gpt-4", "scores": {"mmlu": 90.0, "gsm8k": 80.0}}
        ]});
        let metrics = adapter.parse(&payload).unwrap();
        assert!(metrics.iter().all(|m| !matches!(m.metric_type, MetricKind::BenchmarkAverage)));

        let payload = serde_json::json!({"results": [
            {"model": "gpt-4", "scores": {"mmlu": 90.0, "gsm8k": 80.0, "humaneval": 70.0}}
        ]});
        let metrics = adapter.parse(&payload).unwrap();
        let avg = metrics.iter().find(|m| matches!(m.metric_type, MetricKind::BenchmarkAverage)).unwrap();
        assert!((avg.value - 80.0).abs() < 1e-9);
    }
}
