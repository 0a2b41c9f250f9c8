//! Router (C11): admission → selection → fallback ordering.
//!
//! The router owns the circuit breaker registry directly but treats rate
//! limiting and budget enforcement as pluggable gates (`RateLimitGate`,
//! `BudgetGate`) so this crate does not need to depend on `gateway-admission`
//! — the binary wiring in `gateway-server` supplies the concrete
//! implementations.

use crate::circuit_breaker::CircuitBreakerRegistry;
use crate::scorer::CompositeScorer;
use async_trait::async_trait;
use gateway_types::{ModelMetricsView, ModelScore, RoutingProfile};
use std::time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("budget exceeded: {0}")]
    BudgetExceeded(String),
    #[error("no candidate models available")]
    NoCandidates,
}

/// Admission gate for per-identity request quotas (C8), implemented by
/// `gateway-admission`.
#[async_trait]
pub trait RateLimitGate: Send + Sync {
    async fn check(&self, identity: &str) -> Result<(), String>;
}

/// Admission gate for spend budgets (C9), implemented by
/// `gateway-admission`.
#[async_trait]
pub trait BudgetGate: Send + Sync {
    async fn check(&self, identity: &str, estimated_cost: f64) -> Result<(), String>;
}

#[derive(Debug, Clone)]
pub struct RouteDecision {
    pub primary: ModelScore,
    pub fallbacks: Vec<ModelScore>,
    /// True when every candidate was circuit-open and the primary was
    /// chosen purely by score, bypassing availability filtering.
    pub degraded: bool,
    pub routing_time_ms: f64,
}

pub struct Router {
    scorer: CompositeScorer,
    breakers: CircuitBreakerRegistry,
}

impl Router {
    pub fn new(breakers: CircuitBreakerRegistry) -> Self {
        Self { scorer: CompositeScorer::default(), breakers }
    }

    pub fn circuit_breakers(&self) -> &CircuitBreakerRegistry {
        &self.breakers
    }

    pub async fn record_success(&self, model_id: i64) {
        self.breakers.record_success(model_id).await;
    }

    pub async fn record_failure(&self, model_id: i64) {
        self.breakers.record_failure(model_id).await;
    }

    /// Full admission-and-select path: rate limiter, budget gate, then
    /// scoring with circuit-breaker-filtered fallback ordering.
    pub async fn route(
        &self,
        identity: &str,
        estimated_cost: f64,
        candidates: &[ModelMetricsView],
        profile: &RoutingProfile,
        rate_limiter: &dyn RateLimitGate,
        budget: &dyn BudgetGate,
    ) -> Result<RouteDecision, RouterError> {
        let started = Instant::now();
        rate_limiter.check(identity).await.map_err(RouterError::RateLimited)?;
        budget.check(identity, estimated_cost).await.map_err(RouterError::BudgetExceeded)?;
        self.select(candidates, profile, started).await
    }

    /// Selection only, skipping rate-limit/budget admission — used by
    /// read-only ranking endpoints (`/v1/models/rankings`).
    pub async fn select_only(
        &self,
        candidates: &[ModelMetricsView],
        profile: &RoutingProfile,
    ) -> Result<RouteDecision, RouterError> {
        self.select(candidates, profile, Instant::now()).await
    }

    async fn select(
        &self,
        candidates: &[ModelMetricsView],
        profile: &RoutingProfile,
        started: Instant,
    ) -> Result<RouteDecision, RouterError> {
        if candidates.is_empty() {
            return Err(RouterError::NoCandidates);
        }
        let ranked = self.scorer.rank_models(candidates, profile, None, false);

        let mut available = Vec::with_capacity(ranked.len());
        for score in &ranked {
            if self.breakers.is_available(score.model_id).await {
                available.push(score.clone());
            }
        }

        let (ordered, degraded) = if available.is_empty() {
            (ranked, true)
        } else {
            (available, false)
        };

        let mut iter = ordered.into_iter();
        let primary = iter.next().ok_or(RouterError::NoCandidates)?;
        let fallbacks: Vec<ModelScore> = iter.collect();

        Ok(RouteDecision {
            primary,
            fallbacks,
            degraded,
            routing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_breaker::CircuitBreakerConfig;
    use gateway_types::profile::get_profile;

    struct AllowAll;
    #[async_trait]
    impl RateLimitGate for AllowAll {
        async fn check(&self, _identity: &str) -> Result<(), String> {
            Ok(())
        }
    }
    #[async_trait]
    impl BudgetGate for AllowAll {
        async fn check(&self, _identity: &str, _estimated_cost: f64) -> Result<(), String> {
            Ok(())
        }
    }

    struct DenyAll;
    #[async_trait]
    impl RateLimitGate for DenyAll {
        async fn check(&self, _identity: &str) -> Result<(), String> {
            Err("too many requests".to_string())
        }
    }

    fn view(id: i64, elo: f64) -> ModelMetricsView {
        ModelMetricsView { model_id: id, model_name: format!("model-{id}"), elo_rating: Some(elo), ..Default::default() }
    }

    fn router() -> Router {
        Router::new(CircuitBreakerRegistry::new(CircuitBreakerConfig::default()))
    }

    #[tokio::test]
    async fn rate_limited_identity_never_reaches_scoring() {
        let router = router();
        let profile = get_profile("balanced").unwrap();
        let err = router
            .route("user-1", 0.0, &[view(1, 1300.0)], &profile, &DenyAll, &AllowAll)
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::RateLimited(_)));
    }

    #[tokio::test]
    async fn best_scoring_model_is_primary_with_rest_as_fallbacks() {
        let router = router();
        let profile = get_profile("quality").unwrap();
        let decision = router
            .route("user-1", 0.0, &[view(1, 1100.0), view(2, 1350.0)], &profile, &AllowAll, &AllowAll)
            .await
            .unwrap();
        assert_eq!(decision.primary.model_id, 2);
        assert_eq!(decision.fallbacks.len(), 1);
        assert!(!decision.degraded);
    }

    #[tokio::test]
    async fn open_circuit_is_skipped_in_favor_of_next_candidate() {
        let router = router();
        let profile = get_profile("quality").unwrap();
        router.record_failure(2).await;
        router.record_failure(2).await;
        router.record_failure(2).await;
        router.record_failure(2).await;
        router.record_failure(2).await;
        let decision = router
            .route("user-1", 0.0, &[view(1, 1100.0), view(2, 1350.0)], &profile, &AllowAll, &AllowAll)
            .await
            .unwrap();
        assert_eq!(decision.primary.model_id, 1);
        assert!(!decision.degraded);
    }

    #[tokio::test]
    async fn every_candidate_circuit_open_falls_back_to_best_score_degraded() {
        let router = router();
        let profile = get_profile("quality").unwrap();
        for _ in 0..5 {
            router.record_failure(1).await;
            router.record_failure(2).await;
        }
        let decision = router
            .route("user-1", 0.0, &[view(1, 1100.0), view(2, 1350.0)], &profile, &AllowAll, &AllowAll)
            .await
            .unwrap();
        assert!(decision.degraded);
        assert_eq!(decision.primary.model_id, 2);
    }
}
