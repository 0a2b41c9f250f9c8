use serde::{Deserialize, Serialize};

/// The per-model read-projection the scorer consumes: one representative
/// (most recent non-null) value per metric kind the scorer cares about.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelMetricsView {
    pub model_id: i64,
    pub model_name: String,
    pub elo_rating: Option<f64>,
    pub benchmark_average: Option<f64>,
    pub latency_p90: Option<f64>,
    pub ttft_p90: Option<f64>,
    pub cost_prompt_per_million: Option<f64>,
    pub cost_completion_per_million: Option<f64>,
    pub cost_blended_per_million: Option<f64>,
    pub context_length: Option<i64>,
}

/// Scorer output for one model under one profile. Ephemeral, produced per
/// request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelScore {
    pub model_id: i64,
    pub model_name: String,
    pub composite_score: f64,
    pub quality_score: f64,
    pub latency_score: f64,
    pub cost_score: f64,
    pub context_score: f64,
    pub meets_constraints: bool,
}

impl ModelScore {
    /// Ordering by composite score descending, ties broken by canonical id
    /// ascending for determinism.
    pub fn rank_cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .composite_score
            .partial_cmp(&self.composite_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| self.model_id.cmp(&other.model_id))
    }
}
