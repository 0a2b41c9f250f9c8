//! Per-identity request quota middleware (C8, spec §6).
//!
//! Identity is taken from the `X-API-Key`/`Authorization: Bearer` token that
//! [`crate::auth`] already validated, falling back to the caller's IP when no
//! token is configured (development mode). Each request consumes one unit
//! across the minute/hour/day sliding windows in [`gateway_admission::QuotaManager`];
//! a denial at any tier returns 429 with `Retry-After` set to the longest
//! wait among the tiers that are over.

use axum::{
    body::Body,
    http::{header, HeaderValue, Request, Response, StatusCode},
    response::IntoResponse,
};
use gateway_admission::{QuotaManager, QuotaStatus};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Paths that never count against quota.
const EXEMPT_PATHS: &[&str] = &["/health", "/"];

pub(crate) fn identity_for(req: &Request<Body>) -> String {
    req.headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            req.headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
        })
        .map(|s| s.to_string())
        .or_else(|| {
            req.headers()
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(|s| s.trim().to_string())
        })
        .unwrap_or_else(|| "anonymous".to_string())
}

#[derive(Clone)]
pub struct QuotaLayer {
    manager: Arc<QuotaManager>,
}

impl QuotaLayer {
    pub fn new(manager: Arc<QuotaManager>) -> Self {
        Self { manager }
    }
}

impl<S> Layer<S> for QuotaLayer {
    type Service = QuotaMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        QuotaMiddleware { inner, manager: self.manager.clone() }
    }
}

#[derive(Clone)]
pub struct QuotaMiddleware<S> {
    inner: S,
    manager: Arc<QuotaManager>,
}

impl<S> Service<Request<Body>> for QuotaMiddleware<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future =
        std::pin::Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let manager = self.manager.clone();
        let mut inner = self.inner.clone();
        let exempt = EXEMPT_PATHS.contains(&req.uri().path());

        Box::pin(async move {
            if exempt {
                return inner.call(req).await;
            }

            let identity = identity_for(&req);
            let outcome = manager.check_and_consume(&identity);

            if outcome.status == QuotaStatus::Exceeded {
                let retry_after = outcome.retry_after.map(|d| d.as_secs()).unwrap_or(60);
                let mut resp = (
                    StatusCode::TOO_MANY_REQUESTS,
                    axum::Json(serde_json::json!({
                        "error": "quota exceeded",
                        "retry_after": retry_after,
                    })),
                )
                    .into_response();
                if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                    resp.headers_mut().insert(header::RETRY_AFTER, value);
                }
                return Ok(resp);
            }

            inner.call(req).await
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use axum::Router;
    use gateway_admission::QuotaConfig;
    use tower::ServiceExt;

    fn test_router(config: QuotaConfig) -> Router {
        let manager = Arc::new(QuotaManager::new(config));
        Router::new()
            .route("/v1/models", get(|| async { "ok" }))
            .route("/health", get(|| async { "ok" }))
            .layer(QuotaLayer::new(manager))
    }

    #[tokio::test]
    async fn health_is_exempt_from_quota() {
        let config = QuotaConfig { per_minute: 1, per_hour: 1, per_day: 1, warning_threshold: 0.1 };
        let app = test_router(config);
        for _ in 0..5 {
            let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
            let resp = app.clone().oneshot(req).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn sixth_request_in_a_five_per_minute_window_is_denied_with_retry_after() {
        let config = QuotaConfig { per_minute: 5, per_hour: 1000, per_day: 10_000, warning_threshold: 0.1 };
        let app = test_router(config);
        for _ in 0..5 {
            let req = Request::builder()
                .uri("/v1/models")
                .header("x-api-key", "user-1")
                .body(Body::empty())
                .unwrap();
            let resp = app.clone().oneshot(req).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
        }
        let req = Request::builder()
            .uri("/v1/models")
            .header("x-api-key", "user-1")
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(resp.headers().get(header::RETRY_AFTER).is_some());
    }

    #[tokio::test]
    async fn distinct_identities_have_independent_quotas() {
        let config = QuotaConfig { per_minute: 1, per_hour: 1000, per_day: 10_000, warning_threshold: 0.1 };
        let app = test_router(config);
        for identity in ["user-a", "user-b"] {
            let req = Request::builder()
                .uri("/v1/models")
                .header("x-api-key", identity)
                .body(Body::empty())
                .unwrap();
            let resp = app.clone().oneshot(req).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
        }
    }
}
