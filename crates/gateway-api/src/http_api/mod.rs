//! The gateway's HTTP/WebSocket surface (spec §6): wires every handler
//! module onto one [`axum::Router`] behind the shared middleware stack —
//! metrics, request-id tracing, bearer auth, per-identity quota, and CORS.

mod analytics;
mod chat;
mod gates;
mod health;
mod models;
mod profiles;
mod sse;
mod state;
mod websocket;

pub use state::ApiState;

use crate::auth::AuthLayer;
use crate::rate_limit_middleware::QuotaLayer;
use axum::middleware as axum_middleware;
use axum::routing::{get, post};
use axum::Extension;
use axum::Router;
use gateway_telemetry::middleware::metrics_middleware;
use gateway_telemetry::tracing_setup::request_id_middleware;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Builds the full application router.
///
/// `api_key` enables bearer-token auth when `Some`; `allowed_origins`
/// extends the always-allowed `localhost`/`127.0.0.1` CORS origins with
/// any production front-end origins. The same combined list is threaded
/// to the WebSocket handler's Origin check via an `Extension`, so both
/// surfaces enforce the operator's configured origins consistently.
pub fn build_router(state: Arc<ApiState>, api_key: Option<String>, allowed_origins: Vec<String>) -> Router {
    let ws_allowed_origins: Arc<Vec<String>> = Arc::new(
        crate::origin_validation::get_default_allowed_origins()
            .into_iter()
            .chain(allowed_origins.iter().cloned())
            .collect(),
    );

    Router::new()
        .route("/health", get(health::health))
        .route("/v1/chat/completions", post(chat::chat_completions))
        .route("/v1/models", get(models::list_models))
        .route("/v1/models/rankings", get(models::rankings))
        .route("/v1/routing/profiles", get(profiles::list_profiles))
        .route("/v1/analytics/summary", get(analytics::summary))
        .route("/v1/analytics/usage", get(analytics::usage))
        .route("/v1/analytics/models", get(analytics::models))
        .route("/v1/stream", get(websocket::ws_handler))
        .route("/v1/stream/sse", post(sse::stream_sse))
        .layer(Extension(ws_allowed_origins))
        .layer(axum_middleware::from_fn(metrics_middleware))
        .layer(axum_middleware::from_fn(request_id_middleware))
        .layer(AuthLayer::new(api_key))
        .layer(QuotaLayer::new(state.quota.clone()))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::AllowOrigin::predicate(
                    move |origin: &axum::http::HeaderValue, _parts: &axum::http::request::Parts| {
                        if let Ok(origin_str) = origin.to_str() {
                            if origin_str.starts_with("http://localhost")
                                || origin_str.starts_with("http://127.0.0.1")
                                || origin_str.starts_with("https://localhost")
                                || origin_str.starts_with("https://127.0.0.1")
                            {
                                return true;
                            }
                            allowed_origins.iter().any(|allowed| origin_str == allowed)
                        } else {
                            false
                        }
                    },
                ))
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([axum::http::header::CONTENT_TYPE, axum::http::header::AUTHORIZATION])
                .allow_credentials(true),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producer::EchoProducer;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use gateway_admission::{BudgetManager, QuotaConfig, QuotaManager};
    use gateway_analytics::AnalyticsCollector;
    use gateway_core::MetricStore;
    use gateway_routing::{CircuitBreakerConfig, CircuitBreakerRegistry, Router as GatewayRouter};
    use gateway_streaming::{CancellationRegistry, ConnectionManager};
    use tower::ServiceExt;

    async fn test_state() -> Arc<ApiState> {
        let store = Arc::new(MetricStore::new_in_memory().await.unwrap());
        let analytics = Arc::new(AnalyticsCollector::new_in_memory().await.unwrap());
        let breakers = CircuitBreakerRegistry::new(CircuitBreakerConfig::default());
        let router = Arc::new(GatewayRouter::new(breakers));
        let quota = Arc::new(QuotaManager::new(QuotaConfig { per_minute: 1000, per_hour: 10_000, per_day: 100_000, warning_threshold: 0.1 }));
        let dir = tempfile::tempdir().unwrap();
        let budget = Arc::new(BudgetManager::new(analytics.clone(), dir.path().join("budget.json")));
        Arc::new(ApiState {
            store,
            router,
            quota,
            budget,
            analytics,
            connections: Arc::new(ConnectionManager::new(100)),
            cancellations: Arc::new(CancellationRegistry::new()),
            producer: Arc::new(EchoProducer),
        })
    }

    #[tokio::test]
    async fn health_is_reachable_without_auth() {
        let state = test_state().await;
        let app = build_router(state, Some("secret".to_string()), vec![]);
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn models_requires_auth_when_api_key_is_configured() {
        let state = test_state().await;
        let app = build_router(state, Some("secret".to_string()), vec![]);
        let req = Request::builder().uri("/v1/models").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn routing_profiles_lists_builtins() {
        let state = test_state().await;
        let app = build_router(state, None, vec![]);
        let req = Request::builder().uri("/v1/routing/profiles").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
