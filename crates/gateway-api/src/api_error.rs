//! HTTP API error taxonomy (spec §7).
//!
//! Provides a unified `ApiError` enum for consistent error responses across
//! the HTTP API layer. Implements Axum's `IntoResponse` trait to automatically
//! convert errors into appropriate HTTP responses. `CircuitOpen` exists for
//! completeness of the taxonomy but is never constructed at this boundary —
//! per spec §7 the router's degradation path absorbs it before a response is
//! built.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur in the HTTP API layer, per spec §7's error kinds.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad input: unknown profile, malformed body, unparsable query param.
    #[error("validation: {0}")]
    Validation(String),

    /// Internal quota denial. Carries seconds until the window frees up.
    #[error("rate limited: {0}")]
    RateLimited { message: String, retry_after_secs: u64 },

    /// Timeout, connection error, or upstream 5xx that exhausted retries.
    #[error("transient: {0}")]
    Transient(String),

    /// Missing model/profile/client/alias.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate alias, duplicate custom model, scheduling overlap.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Spend budget denial.
    #[error("budget exceeded: {0}")]
    BudgetExceeded(String),

    /// Per-identity quota denial, distinct from `RateLimited` when the
    /// caller needs to distinguish quota from raw rate-limiting.
    #[error("quota exceeded: {0}")]
    QuotaExceeded { message: String, retry_after_secs: u64 },

    /// Every candidate's circuit was open. Never surfaced to a client in
    /// practice — the router's degraded-selection path always returns a
    /// best-effort candidate instead — kept here so the taxonomy is closed.
    #[error("circuit open: {0}")]
    CircuitOpen(String),

    /// Live fetch failed and the offline cache held nothing usable.
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    /// Programming error. Logged with detail; surfaced to the client as an
    /// opaque message.
    #[error("internal error: {0}")]
    InternalError(String),
}

// ---------------------------------------------------------------------------
// IntoResponse implementation
// ---------------------------------------------------------------------------

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, Json(json!({"error": msg}))).into_response(),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, Json(json!({"error": msg}))).into_response(),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, Json(json!({"error": msg}))).into_response(),
            ApiError::Transient(msg) => (StatusCode::BAD_GATEWAY, Json(json!({"error": msg}))).into_response(),
            ApiError::BudgetExceeded(msg) => {
                (StatusCode::PAYMENT_REQUIRED, Json(json!({"error": msg}))).into_response()
            }
            ApiError::DataUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"error": msg, "stale": true}))).into_response()
            }
            ApiError::CircuitOpen(msg) => {
                tracing::error!(msg, "CircuitOpen reached the HTTP boundary unexpectedly");
                (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"error": "temporarily unavailable"}))).into_response()
            }
            ApiError::InternalError(msg) => {
                tracing::error!(error = %msg, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "internal error"}))).into_response()
            }
            ApiError::RateLimited { message, retry_after_secs } => {
                let mut resp = (StatusCode::TOO_MANY_REQUESTS, Json(json!({"error": message, "retry_after": retry_after_secs})))
                    .into_response();
                if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                    resp.headers_mut().insert(header::RETRY_AFTER, value);
                }
                resp
            }
            ApiError::QuotaExceeded { message, retry_after_secs } => {
                let mut resp = (StatusCode::TOO_MANY_REQUESTS, Json(json!({"error": message, "retry_after": retry_after_secs})))
                    .into_response();
                if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                    resp.headers_mut().insert(header::RETRY_AFTER, value);
                }
                resp
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
