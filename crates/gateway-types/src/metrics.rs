use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Closed set of metric kinds the core understands.
///
/// Anything an adapter emits outside this set is dropped at ingest time
/// rather than stored, so the store never has to guess at normalizer
/// behavior for an unknown kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    EloRating,
    EloUncertainty,
    BenchmarkAverage,
    /// A named benchmark score, e.g. `benchmark_mmlu`. Carries its own tag
    /// because the taxonomy is "one per benchmark".
    Benchmark(String),
    LatencyP50,
    LatencyP90,
    TtftP90,
    CostPromptPerMillion,
    CostCompletionPerMillion,
    CostBlendedPerMillion,
    ContextLength,
}

impl MetricKind {
    /// Parse the wire string used by adapters (`"elo_rating"`,
    /// `"benchmark_mmlu"`, ...) into a typed kind.
    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "elo_rating" => MetricKind::EloRating,
            "elo_uncertainty" => MetricKind::EloUncertainty,
            "benchmark_average" => MetricKind::BenchmarkAverage,
            "latency_p50" => MetricKind::LatencyP50,
            "latency_p90" => MetricKind::LatencyP90,
            "ttft_p90" => MetricKind::TtftP90,
            "cost_prompt_per_million" => MetricKind::CostPromptPerMillion,
            "cost_completion_per_million" => MetricKind::CostCompletionPerMillion,
            "cost_blended_per_million" => MetricKind::CostBlendedPerMillion,
            "context_length" => MetricKind::ContextLength,
            other if other.starts_with("benchmark_") => {
                MetricKind::Benchmark(other.trim_start_matches("benchmark_").to_string())
            }
            _ => return None,
        })
    }

    /// The wire string form, inverse of [`MetricKind::parse`].
    pub fn as_str(&self) -> String {
        match self {
            MetricKind::EloRating => "elo_rating".to_string(),
            MetricKind::EloUncertainty => "elo_uncertainty".to_string(),
            MetricKind::BenchmarkAverage => "benchmark_average".to_string(),
            MetricKind::Benchmark(name) => format!("benchmark_{name}"),
            MetricKind::LatencyP50 => "latency_p50".to_string(),
            MetricKind::LatencyP90 => "latency_p90".to_string(),
            MetricKind::TtftP90 => "ttft_p90".to_string(),
            MetricKind::CostPromptPerMillion => "cost_prompt_per_million".to_string(),
            MetricKind::CostCompletionPerMillion => "cost_completion_per_million".to_string(),
            MetricKind::CostBlendedPerMillion => "cost_blended_per_million".to_string(),
            MetricKind::ContextLength => "context_length".to_string(),
        }
    }
}

/// A single immutable measurement as emitted by a benchmark adapter, before
/// entity resolution or normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMetric {
    pub model_name: String,
    pub metric_type: MetricKind,
    pub value: f64,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl RawMetric {
    pub fn new(model_name: impl Into<String>, metric_type: MetricKind, value: f64, source: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            metric_type,
            value,
            source: source.into(),
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_kind_round_trips_through_wire_string() {
        for kind in [
            MetricKind::EloRating,
            MetricKind::LatencyP90,
            MetricKind::CostBlendedPerMillion,
            MetricKind::Benchmark("mmlu".to_string()),
        ] {
            let s = kind.as_str();
            assert_eq!(MetricKind::parse(&s), Some(kind));
        }
    }

    #[test]
    fn unknown_metric_kind_does_not_parse() {
        assert_eq!(MetricKind::parse("not_a_real_metric"), None);
    }
}
