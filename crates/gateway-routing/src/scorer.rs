//! Composite scorer (C6): weighted aggregation of normalized metrics under a
//! routing profile.

use gateway_resolution::{ContextLengthNormalizer, CostNormalizer, LatencyNormalizer, QualityNormalizer};
use gateway_types::{ModelMetricsView, ModelScore, RoutingProfile};

/// Soft-demotion multiplier applied to the composite score when a candidate
/// fails one or more of the profile's hard constraints. The candidate is
/// kept, not excluded, so it remains available as a last-resort fallback
/// when nothing else qualifies.
const CONSTRAINT_VIOLATION_PENALTY: f64 = 0.1;

pub struct CompositeScorer {
    quality: QualityNormalizer,
    quality_benchmark: QualityNormalizer,
    latency: LatencyNormalizer,
    cost: CostNormalizer,
    context: ContextLengthNormalizer,
}

impl Default for CompositeScorer {
    fn default() -> Self {
        Self {
            quality: QualityNormalizer::ELO,
            quality_benchmark: QualityNormalizer::BENCHMARK,
            latency: LatencyNormalizer::default(),
            cost: CostNormalizer::default(),
            context: ContextLengthNormalizer::default(),
        }
    }
}

impl CompositeScorer {
    pub fn score_model(&self, metrics: &ModelMetricsView, profile: &RoutingProfile) -> ModelScore {
        let (quality_raw, quality_norm) = match metrics.elo_rating {
            Some(elo) => (elo, self.quality.normalize(elo)),
            None => match metrics.benchmark_average {
                Some(avg) => (avg, self.quality_benchmark.normalize(avg)),
                None => (0.5, 0.5),
            },
        };

        let (latency_raw, latency_norm) = match metrics.latency_p90.or(metrics.ttft_p90) {
            Some(ms) => (Some(ms), self.latency.normalize(ms)),
            None => (None, 0.5),
        };

        let (cost_raw, cost_norm) = match metrics.cost_blended_per_million {
            Some(blended) => (Some(blended), self.cost.normalize(blended)),
            None => match (metrics.cost_prompt_per_million, metrics.cost_completion_per_million) {
                (Some(prompt), Some(completion)) => {
                    let blended = prompt * 0.7 + completion * 0.3;
                    (Some(blended), self.cost.normalize(blended))
                }
                _ => (None, 0.5),
            },
        };

        let context_norm = match metrics.context_length {
            Some(ctx) => self.context.normalize(ctx as f64),
            None => 1.0,
        };

        let composite_raw = profile.calculate_score(quality_norm, latency_norm, cost_norm, context_norm);

        let meets_constraints =
            profile.meets_constraints(quality_raw, latency_raw, cost_raw, metrics.context_length);

        let composite = if meets_constraints {
            composite_raw
        } else {
            composite_raw * CONSTRAINT_VIOLATION_PENALTY
        };

        ModelScore {
            model_id: metrics.model_id,
            model_name: metrics.model_name.clone(),
            composite_score: composite,
            quality_score: quality_norm,
            latency_score: latency_norm,
            cost_score: cost_norm,
            context_score: context_norm,
            meets_constraints,
        }
    }

    pub fn score_models(&self, models: &[ModelMetricsView], profile: &RoutingProfile) -> Vec<ModelScore> {
        let mut scores: Vec<ModelScore> = models.iter().map(|m| self.score_model(m, profile)).collect();
        scores.sort_by(|a, b| a.rank_cmp(b));
        scores
    }

    /// Rank scored models under `profile`, optionally filtering to only
    /// those meeting the profile's hard constraints, and truncating to
    /// `limit` entries.
    pub fn rank_models(
        &self,
        models: &[ModelMetricsView],
        profile: &RoutingProfile,
        limit: Option<usize>,
        only_meeting_constraints: bool,
    ) -> Vec<ModelScore> {
        let mut scores = self.score_models(models, profile);
        if only_meeting_constraints {
            scores.retain(|s| s.meets_constraints);
        }
        if let Some(limit) = limit {
            scores.truncate(limit);
        }
        scores
    }

    /// The single best model for `profile`. Prefers a constraint-meeting
    /// candidate; if none meet constraints, falls back to the best overall
    /// (its soft-demoted score beats nothing).
    pub fn get_best_model(&self, models: &[ModelMetricsView], profile: &RoutingProfile) -> Option<ModelScore> {
        let scores = self.score_models(models, profile);
        scores
            .iter()
            .find(|s| s.meets_constraints)
            .cloned()
            .or_else(|| scores.first().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_types::profile::get_profile;

    fn view(id: i64, elo: f64, p90: f64, cost: f64) -> ModelMetricsView {
        ModelMetricsView {
            model_id: id,
            model_name: format!("model-{id}"),
            elo_rating: Some(elo),
            latency_p90: Some(p90),
            cost_blended_per_million: Some(cost),
            ..Default::default()
        }
    }

    #[test]
    fn quality_profile_prefers_high_elo_over_cheap_noise() {
        let scorer = CompositeScorer::default();
        let profile = get_profile("quality").unwrap();
        let a = view(1, 1350.0, 2000.0, 30.0);
        let b = view(2, 1100.0, 200.0, 1.0);
        let best = scorer.get_best_model(&[a, b], &profile).unwrap();
        assert_eq!(best.model_id, 1);
    }

    #[test]
    fn speed_profile_flips_the_winner() {
        let scorer = CompositeScorer::default();
        let profile = get_profile("speed").unwrap();
        let a = view(1, 1350.0, 2000.0, 30.0);
        let b = view(2, 1100.0, 200.0, 1.0);
        let best = scorer.get_best_model(&[a, b], &profile).unwrap();
        assert_eq!(best.model_id, 2);
    }

    #[test]
    fn budget_hard_cap_soft_demotes_expensive_candidate() {
        let scorer = CompositeScorer::default();
        let profile = get_profile("budget").unwrap();
        let expensive = view(1, 1300.0, 300.0, 40.0);
        let score = scorer.score_model(&expensive, &profile);
        assert!(!score.meets_constraints);

        let mut unconstrained = profile.clone();
        unconstrained.max_cost_per_million = None;
        let uncapped_score = scorer.score_model(&expensive, &unconstrained);
        assert!((score.composite_score - uncapped_score.composite_score * 0.1).abs() < 1e-9);
    }

    #[test]
    fn composite_score_always_in_unit_range() {
        let scorer = CompositeScorer::default();
        for profile_name in ["quality", "balanced", "speed", "budget", "long_context"] {
            let profile = get_profile(profile_name).unwrap();
            for v in [view(1, 800.0, 0.0, 0.0), view(2, 1400.0, 50_000.0, 500.0)] {
                let score = scorer.score_model(&v, &profile);
                assert!((0.0..=1.0).contains(&score.composite_score));
            }
        }
    }

    #[test]
    fn meets_constraints_false_for_every_candidate_still_returns_best() {
        let scorer = CompositeScorer::default();
        let profile = get_profile("budget").unwrap();
        let a = view(1, 1300.0, 300.0, 40.0);
        let b = view(2, 1200.0, 300.0, 45.0);
        let best = scorer.get_best_model(&[a, b], &profile).unwrap();
        assert!(!best.meets_constraints);
        // Cheaper-but-still-over-cap candidate should still win the
        // soft-demoted comparison.
        assert_eq!(best.model_id, 1);
    }
}
