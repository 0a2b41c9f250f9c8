use serde::{Deserialize, Serialize};

/// A named weight vector plus optional hard constraints driving composite
/// scoring.
///
/// Weights are normalized to sum to 1 at construction: if they do not, each
/// is divided by the sum. An all-zero weight vector is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingProfile {
    pub name: String,
    pub quality_weight: f64,
    pub latency_weight: f64,
    pub cost_weight: f64,
    pub context_weight: f64,
    pub min_quality_threshold: f64,
    pub max_latency_ms: Option<f64>,
    pub max_cost_per_million: Option<f64>,
    pub min_context_length: Option<i64>,
    pub description: String,
}

/// Error constructing a profile with a degenerate weight vector.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("profile weights must not all be zero")]
    AllZeroWeights,
}

impl RoutingProfile {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        quality_weight: f64,
        latency_weight: f64,
        cost_weight: f64,
        context_weight: f64,
        description: impl Into<String>,
    ) -> Result<Self, ProfileError> {
        let total = quality_weight + latency_weight + cost_weight + context_weight;
        if total <= 0.0 {
            return Err(ProfileError::AllZeroWeights);
        }
        Ok(Self {
            name: name.into(),
            quality_weight: quality_weight / total,
            latency_weight: latency_weight / total,
            cost_weight: cost_weight / total,
            context_weight: context_weight / total,
            min_quality_threshold: 0.0,
            max_latency_ms: None,
            max_cost_per_million: None,
            min_context_length: None,
            description: description.into(),
        })
    }

    pub fn with_min_quality(mut self, v: f64) -> Self {
        self.min_quality_threshold = v;
        self
    }

    pub fn with_max_latency_ms(mut self, v: f64) -> Self {
        self.max_latency_ms = Some(v);
        self
    }

    pub fn with_max_cost_per_million(mut self, v: f64) -> Self {
        self.max_cost_per_million = Some(v);
        self
    }

    pub fn with_min_context_length(mut self, v: i64) -> Self {
        self.min_context_length = Some(v);
        self
    }

    /// Weighted sum of the normalized sub-scores. Does not apply the
    /// constraint soft-demotion; callers combine this with
    /// [`RoutingProfile::meets_constraints`].
    pub fn calculate_score(&self, quality: f64, latency: f64, cost: f64, context: f64) -> f64 {
        self.quality_weight * quality
            + self.latency_weight * latency
            + self.cost_weight * cost
            + self.context_weight * context
    }

    /// Evaluate hard constraints against *raw*, non-normalized metric values.
    pub fn meets_constraints(
        &self,
        quality: f64,
        latency_ms: Option<f64>,
        cost_per_million: Option<f64>,
        context_length: Option<i64>,
    ) -> bool {
        if quality < self.min_quality_threshold {
            return false;
        }
        if let (Some(max_latency), Some(latency)) = (self.max_latency_ms, latency_ms) {
            if latency > max_latency {
                return false;
            }
        }
        if let (Some(max_cost), Some(cost)) = (self.max_cost_per_million, cost_per_million) {
            if cost > max_cost {
                return false;
            }
        }
        if let (Some(min_ctx), Some(ctx)) = (self.min_context_length, context_length) {
            if ctx < min_ctx {
                return false;
            }
        }
        true
    }
}

/// The five built-in profiles named in the product requirements.
pub fn builtin_profiles() -> Vec<RoutingProfile> {
    vec![
        RoutingProfile::new("quality", 0.70, 0.15, 0.15, 0.0, "Optimize for model quality")
            .expect("builtin weights are non-zero")
            .with_min_quality(0.6),
        RoutingProfile::new("balanced", 0.40, 0.30, 0.30, 0.0, "Balance quality, latency, and cost")
            .expect("builtin weights are non-zero"),
        RoutingProfile::new("speed", 0.20, 0.60, 0.20, 0.0, "Optimize for low latency")
            .expect("builtin weights are non-zero")
            .with_max_latency_ms(1000.0),
        RoutingProfile::new("budget", 0.25, 0.15, 0.60, 0.0, "Optimize for low cost")
            .expect("builtin weights are non-zero")
            .with_max_cost_per_million(1.0),
        RoutingProfile::new(
            "long_context",
            0.30,
            0.20,
            0.20,
            0.30,
            "Optimize for large context windows",
        )
        .expect("builtin weights are non-zero")
        .with_min_context_length(100_000),
    ]
}

pub fn get_profile(name: &str) -> Option<RoutingProfile> {
    builtin_profiles().into_iter().find(|p| p.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_always_sum_to_one() {
        for profile in builtin_profiles() {
            let total = profile.quality_weight
                + profile.latency_weight
                + profile.cost_weight
                + profile.context_weight;
            assert!((total - 1.0).abs() < 1e-6, "{}: {}", profile.name, total);
        }
    }

    #[test]
    fn unnormalized_weights_are_scaled() {
        let p = RoutingProfile::new("custom", 2.0, 1.0, 1.0, 0.0, "").unwrap();
        assert!((p.quality_weight - 0.5).abs() < 1e-9);
        assert!((p.latency_weight - 0.25).abs() < 1e-9);
    }

    #[test]
    fn all_zero_weights_rejected() {
        assert!(matches!(
            RoutingProfile::new("bad", 0.0, 0.0, 0.0, 0.0, ""),
            Err(ProfileError::AllZeroWeights)
        ));
    }

    #[test]
    fn speed_profile_rejects_slow_candidate() {
        let p = get_profile("speed").unwrap();
        assert!(!p.meets_constraints(1.0, Some(1500.0), None, None));
        assert!(p.meets_constraints(1.0, Some(500.0), None, None));
    }
}
