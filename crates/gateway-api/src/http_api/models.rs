//! `GET /v1/models` and `GET /v1/models/rankings` (spec §6).

use super::state::ApiState;
use crate::api_error::ApiError;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use gateway_types::profile::get_profile;
use gateway_routing::CompositeScorer;
use serde::Deserialize;
use std::sync::Arc;

pub async fn list_models(State(state): State<Arc<ApiState>>) -> Result<impl IntoResponse, ApiError> {
    let views = state.store.list_model_metrics_views().await.map_err(|e| ApiError::InternalError(e.to_string()))?;
    Ok(Json(views))
}

#[derive(Debug, Deserialize)]
pub struct RankingsQuery {
    #[serde(default = "default_profile")]
    pub profile: String,
    pub limit: Option<usize>,
}

fn default_profile() -> String {
    "balanced".to_string()
}

pub async fn rankings(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<RankingsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = get_profile(&query.profile)
        .ok_or_else(|| ApiError::Validation(format!("unknown routing profile: {}", query.profile)))?;
    let views = state.store.list_model_metrics_views().await.map_err(|e| ApiError::InternalError(e.to_string()))?;
    let scorer = CompositeScorer::default();
    let ranked = scorer.rank_models(&views, &profile, query.limit, false);
    Ok(Json(ranked))
}
