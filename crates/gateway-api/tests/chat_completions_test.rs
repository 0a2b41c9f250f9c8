//! End-to-end `/v1/chat/completions` test: seeds the store through the real
//! ingestion write path, then drives a full request through admission,
//! selection, and the echo producer.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use gateway_admission::{BudgetManager, QuotaConfig, QuotaManager};
use gateway_analytics::AnalyticsCollector;
use gateway_api::http_api::{build_router, ApiState};
use gateway_api::producer::EchoProducer;
use gateway_core::MetricStore;
use gateway_resolution::EntityResolver;
use gateway_routing::{CircuitBreakerConfig, CircuitBreakerRegistry, Router as GatewayRouter};
use gateway_streaming::{CancellationRegistry, ConnectionManager};
use gateway_types::{MetricKind, RawMetric};
use std::sync::Arc;
use tower::ServiceExt;

async fn seeded_state() -> Arc<ApiState> {
    let store = Arc::new(MetricStore::new_in_memory().await.unwrap());
    let resolver = EntityResolver::default();
    let metrics = vec![
        RawMetric::new("gpt-4", MetricKind::EloRating, 1250.0, "arena"),
        RawMetric::new("gpt-4", MetricKind::CostPromptPerMillion, 10.0, "pricing"),
        RawMetric::new("gpt-4", MetricKind::CostCompletionPerMillion, 30.0, "pricing"),
        RawMetric::new("gpt-4", MetricKind::CostBlendedPerMillion, 16.0, "pricing"),
    ];
    store.record_source_metrics(&resolver, "test-seed", metrics).await.unwrap();

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
async fn chat_completions_routes_to_seeded_model_and_echoes_content() {
    let state = seeded_state().await;
    let app = build_router(state, None, vec![]);

    let body = serde_json::json!({
        "model": "auto",
        "messages": [{"role": "user", "content": "hello gateway"}],
    });
    let req = Request::builder()
        .method("POST")
        .uri("/v1/chat/completions")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["model"], "gpt-4");
    assert_eq!(json["choices"][0]["message"]["content"], "hello gateway");
    assert_eq!(json["routing_info"]["model_selected"], "gpt-4");
}

#[tokio::test]
async fn chat_completions_rejects_empty_messages() {
    let state = seeded_state().await;
    let app = build_router(state, None, vec![]);

    let body = serde_json::json!({"model": "auto", "messages": []});
    let req = Request::builder()
        .method("POST")
        .uri("/v1/chat/completions")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chat_completions_unknown_model_is_not_found() {
    let state = seeded_state().await;
    let app = build_router(state, None, vec![]);

    let body = serde_json::json!({
        "model": "does-not-exist",
        "messages": [{"role": "user", "content": "hi"}],
    });
    let req = Request::builder()
        .method("POST")
        .uri("/v1/chat/completions")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
