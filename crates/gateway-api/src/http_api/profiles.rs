//! `GET /v1/routing/profiles` (spec §6).

use axum::response::IntoResponse;
use axum::Json;
use gateway_types::profile::builtin_profiles;

pub async fn list_profiles() -> impl IntoResponse {
    Json(builtin_profiles())
}
