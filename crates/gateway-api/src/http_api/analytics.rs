//! `GET /v1/analytics/{summary,usage,models}` (spec §6).

use super::state::ApiState;
use crate::api_error::ApiError;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

/// `period` ∈ {1h, 24h, 7d, 30d}, per spec §6.
fn period_to_hours(period: &str) -> Result<i64, ApiError> {
    match period {
        "1h" => Ok(1),
        "24h" => Ok(24),
        "7d" => Ok(24 * 7),
        "30d" => Ok(24 * 30),
        other => Err(ApiError::Validation(format!("unknown period '{other}', expected one of 1h, 24h, 7d, 30d"))),
    }
}

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    #[serde(default = "default_period")]
    pub period: String,
}

fn default_period() -> String {
    "24h".to_string()
}

pub async fn summary(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<PeriodQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let hours = period_to_hours(&query.period)?;
    let summary = state.analytics.summary(hours).await.map_err(|e| ApiError::InternalError(e.to_string()))?;
    Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
pub struct UsageQuery {
    #[serde(default = "default_period")]
    pub period: String,
    #[serde(default = "default_bucket_minutes")]
    pub bucket: i64,
}

fn default_bucket_minutes() -> i64 {
    60
}

pub async fn usage(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<UsageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let hours = period_to_hours(&query.period)?;
    if query.bucket <= 0 {
        return Err(ApiError::Validation("bucket must be a positive number of minutes".to_string()));
    }
    let series = state
        .analytics
        .usage_timeseries(hours, query.bucket)
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    Ok(Json(series))
}

pub async fn models(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<PeriodQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let hours = period_to_hours(&query.period)?;
    let breakdown =
        state.analytics.model_breakdown(hours).await.map_err(|e| ApiError::InternalError(e.to_string()))?;
    Ok(Json(breakdown))
}
