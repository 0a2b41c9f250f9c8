//! `POST /v1/chat/completions` (spec §6, §4.13): OpenAI-compatible
//! chat-completion request routed through admission, selection, and the
//! pluggable producer.
//!
//! Non-streaming only: the `stream` field is accepted for OpenAI wire
//! compatibility but true incremental delivery is served by `/v1/stream`
//! (WebSocket) and `/v1/stream/sse` instead.

use super::gates::{QuotaGate, SpendGate};
use super::state::ApiState;
use crate::api_error::ApiError;
use crate::producer::ChatRequest;
use crate::rate_limit_middleware::identity_for;
use axum::extract::State;
use axum::http::Request as HttpRequest;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use gateway_routing::RouterError;
use gateway_streaming::protocol::ChatMessage;
use gateway_types::profile::get_profile;
use gateway_types::{ModelScore, RoutingEvent, StreamChunk};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

#[derive(Debug, Deserialize)]
pub struct ChatCompletionRequest {
    /// `"auto"` lets the router pick; anything else is taken as an exact
    /// `model_name` filter over the catalog.
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<i64>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub routing_profile: Option<String>,
}

#[derive(Debug, Serialize)]
struct ResponseMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseChoice {
    index: u64,
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct Usage {
    prompt_tokens: i64,
    completion_tokens: i64,
    total_tokens: i64,
}

#[derive(Debug, Serialize)]
struct RoutingInfo {
    model_selected: String,
    profile_used: String,
    fallbacks: Vec<ModelScore>,
    degraded: bool,
    routing_time_ms: f64,
}

#[derive(Debug, Serialize)]
struct ChatCompletionResponse {
    id: String,
    object: &'static str,
    model: String,
    choices: Vec<ResponseChoice>,
    usage: Usage,
    routing_info: RoutingInfo,
}

pub(crate) fn map_router_error(err: RouterError) -> ApiError {
    match err {
        RouterError::NoCandidates => ApiError::NotFound("no candidate models match this request".to_string()),
        RouterError::RateLimited(msg) => {
            let retry_after_secs = parse_trailing_seconds(&msg).unwrap_or(60);
            ApiError::QuotaExceeded { message: msg, retry_after_secs }
        }
        RouterError::BudgetExceeded(msg) => ApiError::BudgetExceeded(msg),
    }
}

/// Parses the retry-after seconds embedded by [`super::gates::QuotaGate`]'s
/// `"... retry after {N}s"` message format.
fn parse_trailing_seconds(msg: &str) -> Option<u64> {
    msg.rsplit("retry after ").next()?.trim_end_matches('s').parse().ok()
}

pub async fn chat_completions(
    State(state): State<Arc<ApiState>>,
    request: HttpRequest<axum::body::Body>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = identity_for(&request);
    let body: ChatCompletionRequest = {
        let bytes = axum::body::to_bytes(request.into_body(), 10 * 1024 * 1024)
            .await
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Validation(format!("malformed request body: {e}")))?
    };

    if body.messages.is_empty() {
        return Err(ApiError::Validation("messages must not be empty".to_string()));
    }

    let profile_name = body.routing_profile.as_deref().unwrap_or("balanced");
    let profile = get_profile(profile_name)
        .ok_or_else(|| ApiError::Validation(format!("unknown routing profile: {profile_name}")))?;

    let all_views = state.store.list_model_metrics_views().await.map_err(|e| ApiError::InternalError(e.to_string()))?;
    let candidates: Vec<_> = if body.model == "auto" {
        all_views
    } else {
        all_views.into_iter().filter(|v| v.model_name == body.model).collect()
    };
    if candidates.is_empty() {
        return Err(ApiError::NotFound(format!("no model matching '{}'", body.model)));
    }

    let prompt_tokens: i64 =
        body.messages.iter().map(|m| m.content.split_whitespace().count() as i64).sum();
    let max_blended_cost =
        candidates.iter().filter_map(|c| c.cost_blended_per_million).fold(0.0_f64, f64::max);
    let estimated_cost = (prompt_tokens as f64 / 1_000_000.0) * max_blended_cost;

    let quota_gate = QuotaGate(state.quota.clone());
    let budget_gate = SpendGate(state.budget.clone());
    let decision = state
        .router
        .route(&identity, estimated_cost, &candidates, &profile, &quota_gate, &budget_gate)
        .await
        .map_err(map_router_error)?;

    let request_id = uuid::Uuid::new_v4().to_string();

    // Try the primary, then each fallback in ranked order, recording the
    // outcome against that model's circuit breaker as we go. The response
    // reports whichever model actually produced output.
    let attempt_order: Vec<ModelScore> =
        std::iter::once(decision.primary.clone()).chain(decision.fallbacks.iter().cloned()).collect();

    let mut selected = decision.primary.clone();
    let mut content_chunks: Vec<StreamChunk> = Vec::new();
    let mut last_error: Option<String> = None;
    let mut outcome = None;

    for (i, candidate) in attempt_order.iter().enumerate() {
        let chat_request = ChatRequest {
            request_id: request_id.clone(),
            model: candidate.model_name.clone(),
            messages: body.messages.clone(),
        };
        let received = Arc::new(Mutex::new(Vec::<StreamChunk>::new()));
        let received_for_closure = received.clone();
        let production = state
            .producer
            .produce(&chat_request, &move |chunk| received_for_closure.lock().unwrap().push(chunk))
            .await;
        match production {
            Ok(o) => {
                state.router.record_success(candidate.model_id).await;
                selected = candidate.clone();
                content_chunks = Arc::try_unwrap(received).map(|m| m.into_inner().unwrap()).unwrap_or_default();
                outcome = Some(o);
                break;
            }
            Err(e) => {
                state.router.record_failure(candidate.model_id).await;
                last_error = Some(e.to_string());
                if i + 1 == attempt_order.len() {
                    break;
                }
                tracing::warn!(model = %candidate.model_name, error = %e, "producer failed, trying next fallback");
            }
        }
    }

    let event_base = RoutingEvent {
        timestamp: Utc::now(),
        model_selected: selected.model_name.clone(),
        profile_used: profile.name.clone(),
        routing_time_ms: decision.routing_time_ms,
        prompt_tokens,
        completion_tokens: 0,
        total_tokens: prompt_tokens,
        estimated_cost,
        was_fallback: decision.degraded || selected.model_id != decision.primary.model_id,
        success: false,
        error_message: None,
    };

    let Some(outcome) = outcome else {
        let event = RoutingEvent { error_message: last_error.clone(), ..event_base };
        if let Err(log_err) = state.analytics.record_routing(event).await {
            tracing::warn!(error = %log_err, "failed to record routing event");
        }
        return Err(ApiError::Transient(last_error.unwrap_or_else(|| "all candidates failed".to_string())));
    };

    let content = content_chunks.iter().map(|c| c.content.as_str()).collect::<Vec<_>>().join("");

    let event = RoutingEvent {
        completion_tokens: outcome.completion_tokens as i64,
        total_tokens: prompt_tokens + outcome.completion_tokens as i64,
        success: true,
        ..event_base
    };
    if let Err(e) = state.analytics.record_routing(event).await {
        tracing::warn!(error = %e, "failed to record routing event");
    }
    if let Err(e) = state.store.upsert_routing_index(selected.model_id, &profile.name, selected.composite_score).await {
        tracing::warn!(error = %e, "failed to refresh routing index cache");
    }

    Ok(Json(ChatCompletionResponse {
        id: request_id,
        object: "chat.completion",
        model: selected.model_name.clone(),
        choices: vec![ResponseChoice {
            index: 0,
            message: ResponseMessage { role: "assistant", content },
            finish_reason: outcome.finish_reason,
        }],
        usage: Usage {
            prompt_tokens,
            completion_tokens: outcome.completion_tokens as i64,
            total_tokens: prompt_tokens + outcome.completion_tokens as i64,
        },
        routing_info: RoutingInfo {
            model_selected: selected.model_name.clone(),
            profile_used: profile.name,
            fallbacks: decision.fallbacks,
            degraded: decision.degraded,
            routing_time_ms: decision.routing_time_ms,
        },
    }))
}
