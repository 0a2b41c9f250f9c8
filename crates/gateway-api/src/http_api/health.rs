use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// `GET /health` — always bypasses auth and quota (spec §6).
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
