//! Local-inference source adapter: present only when a local runtime
//! (e.g. an Ollama-style server) is reachable. Yields zero-cost metrics
//! plus a heuristic quality estimate derived from model family and
//! parameter size, tagged `is_local=true` in metadata.

use crate::{AdapterError, AdapterFetcher, BenchmarkAdapter, UrlValidator};
use async_trait::async_trait;
use gateway_types::{MetricKind, RawMetric};
use std::collections::HashMap;
use std::sync::Arc;

pub struct LocalInferenceAdapter {
    source_tag: String,
    url: Option<String>,
    fetcher: Arc<AdapterFetcher>,
    validator: UrlValidator,
}

impl Default for LocalInferenceAdapter {
    fn default() -> Self {
        Self::new(None, Arc::new(AdapterFetcher::new(Arc::new(gateway_cache::InProcessCache::new(None)))))
    }
}

impl LocalInferenceAdapter {
    /// Unlike the other adapters this one's whole purpose is reaching a
    /// local runtime, so its validator permits loopback/private targets.
    pub fn new(url: Option<String>, fetcher: Arc<AdapterFetcher>) -> Self {
        Self { source_tag: "local_inference".to_string(), url, fetcher, validator: UrlValidator::new(Vec::new(), false) }
    }
}

/// Heuristic ELO-ish quality estimate from parameter count (billions) and
/// whether the family name suggests an instruction-tuned checkpoint. This
/// is intentionally crude — the source has no real benchmark to offer, so
/// the estimate only needs to roughly separate small/base models from
/// large/instruct ones in the composite scorer.
fn heuristic_quality(family: &str, param_billions: f64) -> f64 {
    let family_bonus = if family.to_lowercase().contains("instruct") { 50.0 } else { 0.0 };
    let size_component = (param_billions.max(0.1).ln() * 40.0).max(0.0);
    (800.0 + size_component * 6.0 + family_bonus).min(1400.0)
}

#[async_trait]
impl BenchmarkAdapter for LocalInferenceAdapter {
    fn source_tag(&self) -> &str {
        &self.source_tag
    }

    fn sync_interval_minutes(&self) -> u32 {
        15
    }

    async fn fetch(&self) -> Result<serde_json::Value, AdapterError> {
        let Some(url) = &self.url else { return Err(AdapterError::DataUnavailable) };
        self.fetcher.fetch_json(&self.source_tag, url, &self.validator).await
    }

    fn validate(&self, raw: &serde_json::Value) -> bool {
        raw.get("models").and_then(|v| v.as_array()).is_some()
    }

    fn parse(&self, raw: &serde_json::Value) -> Result<Vec<RawMetric>, AdapterError> {
        if !self.validate(raw) {
            return Err(AdapterError::InvalidPayload);
        }
        let mut metrics = Vec::new();
        for entry in raw["models"].as_array().unwrap() {
            let Some(name) = entry.get("name").and_then(|n| n.as_str()) else { continue };
            let family = entry.get("family").and_then(|v| v.as_str()).unwrap_or("");
            let params_b = entry.get("param_billions").and_then(|v| v.as_f64()).unwrap_or(1.0);

            let mut metadata = HashMap::new();
            metadata.insert("is_local".to_string(), serde_json::json!(true));

            metrics.push(
                RawMetric::new(name, MetricKind::CostPromptPerMillion, 0.0, &self.source_tag)
                    .with_metadata(metadata.clone()),
            );
            metrics.push(
                RawMetric::new(name, MetricKind::CostCompletionPerMillion, 0.0, &self.source_tag)
                    .with_metadata(metadata.clone()),
            );
            metrics.push(
                RawMetric::new(name, MetricKind::CostBlendedPerMillion, 0.0, &self.source_tag)
                    .with_metadata(metadata.clone()),
            );
            metrics.push(
                RawMetric::new(name, MetricKind::EloRating, heuristic_quality(family, params_b), &self.source_tag)
                    .with_metadata(metadata),
            );
        }
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_models_are_zero_cost_and_flagged() {
        let adapter = LocalInferenceAdapter::default();
        let payload = serde_json::json!({"models": [{"name": "llama3-8b-instruct", "family": "llama-instruct", "param_billions": 8.0}]});
        let metrics = adapter.parse(&payload).unwrap();
        for m in &metrics {
            assert_eq!(m.metadata.get("is_local"), Some(&serde_json::json!(true)));
        }
        let cost = metrics.iter().find(|m| matches!(m.metric_type, MetricKind::CostBlendedPerMillion)).unwrap();
        assert_eq!(cost.value, 0.0);
    }

    #[test]
    fn larger_instruct_models_score_higher() {
        let small = heuristic_quality("base", 1.0);
        let large_instruct = heuristic_quality("instruct", 70.0);
        assert!(large_instruct > small);
    }
}
