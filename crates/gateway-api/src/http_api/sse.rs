//! `POST /v1/stream/sse` (spec §4.13, §6): one-shot SSE delivery of a chat
//! completion, using the frame format in [`gateway_streaming::sse`].

use super::chat::{map_router_error, ChatCompletionRequest};
use super::gates::{QuotaGate, SpendGate};
use super::state::ApiState;
use crate::api_error::ApiError;
use crate::producer::ChatRequest;
use crate::rate_limit_middleware::identity_for;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, Request as HttpRequest};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use gateway_streaming::sse;
use gateway_types::profile::get_profile;
use gateway_types::RoutingEvent;
use std::convert::Infallible;
use std::sync::Arc;

pub async fn stream_sse(
    State(state): State<Arc<ApiState>>,
    request: HttpRequest<Body>,
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

    let profile_name = body.routing_profile.clone().unwrap_or_else(|| "balanced".to_string());
    let profile = get_profile(&profile_name)
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

    let prompt_tokens: i64 = body.messages.iter().map(|m| m.content.split_whitespace().count() as i64).sum();
    let max_blended_cost = candidates.iter().filter_map(|c| c.cost_blended_per_million).fold(0.0_f64, f64::max);
    let estimated_cost = (prompt_tokens as f64 / 1_000_000.0) * max_blended_cost;

    let quota_gate = QuotaGate(state.quota.clone());
    let budget_gate = SpendGate(state.budget.clone());
    let decision = state
        .router
        .route(&identity, estimated_cost, &candidates, &profile, &quota_gate, &budget_gate)
        .await
        .map_err(map_router_error)?;

    let request_id = uuid::Uuid::new_v4().to_string();

    let attempt_order: Vec<gateway_types::ModelScore> =
        std::iter::once(decision.primary.clone()).chain(decision.fallbacks.iter().cloned()).collect();

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    let _ = tx.send(sse::routing_preamble(&request_id, &decision.primary.model_name, &profile.name));

    let state_for_task = state.clone();
    let profile_name_for_task = profile.name.clone();
    let routing_time_ms = decision.routing_time_ms;
    let degraded = decision.degraded;
    let messages = body.messages;

    tokio::spawn(async move {
        let mut completion_tokens: i64 = 0;
        let mut model_selected = decision.primary.model_name.clone();
        let mut model_id = decision.primary.model_id;
        let mut composite_score = decision.primary.composite_score;
        let mut final_result = None;

        for (i, candidate) in attempt_order.iter().enumerate() {
            let chat_request = ChatRequest {
                request_id: request_id.clone(),
                model: candidate.model_name.clone(),
                messages: messages.clone(),
            };
            let (chunk_tx, mut chunk_rx) = tokio::sync::mpsc::unbounded_channel::<gateway_types::StreamChunk>();
            let on_chunk = move |chunk: gateway_types::StreamChunk| {
                let _ = chunk_tx.send(chunk);
            };
            let producer = state_for_task.producer.clone();
            let produce_fut = producer.produce(&chat_request, &on_chunk);
            tokio::pin!(produce_fut);

            let mut first = true;
            let mut forwarded_any = false;
            let mut attempt_tokens: i64 = 0;
            let result = loop {
                tokio::select! {
                    biased;
                    maybe_chunk = chunk_rx.recv() => {
                        match maybe_chunk {
                            Some(chunk) => {
                                attempt_tokens += chunk.content.split_whitespace().count() as i64;
                                let _ = tx.send(sse::format_chunk_event(&chunk, first));
                                first = false;
                                forwarded_any = true;
                            }
                            None => continue,
                        }
                    }
                    res = &mut produce_fut => break res,
                }
            };
            while let Ok(chunk) = chunk_rx.try_recv() {
                attempt_tokens += chunk.content.split_whitespace().count() as i64;
                let _ = tx.send(sse::format_chunk_event(&chunk, first));
                first = false;
                forwarded_any = true;
            }

            match result {
                Ok(_outcome) => {
                    state_for_task.router.record_success(candidate.model_id).await;
                    completion_tokens = attempt_tokens;
                    model_selected = candidate.model_name.clone();
                    model_id = candidate.model_id;
                    composite_score = candidate.composite_score;
                    final_result = Some(Ok(()));
                    break;
                }
                Err(e) => {
                    state_for_task.router.record_failure(candidate.model_id).await;
                    // Once output has been streamed to the client the failure
                    // can't be un-sent, so only the fallback model can still
                    // be retried when nothing has gone out yet.
                    if forwarded_any || i + 1 == attempt_order.len() {
                        completion_tokens = attempt_tokens;
                        final_result = Some(Err(e));
                        break;
                    }
                    tracing::warn!(model = %candidate.model_name, error = %e, "producer failed before streaming any output, trying next fallback");
                }
            }
        }

        let success = matches!(final_result, Some(Ok(()) ));
        let error_message = match final_result {
            Some(Err(e)) => Some(e.to_string()),
            _ => None,
        };
        let _ = tx.send(sse::usage_event(prompt_tokens, completion_tokens));
        let _ = tx.send(sse::DONE_SENTINEL.to_string());
        drop(tx);

        let event = RoutingEvent {
            timestamp: Utc::now(),
            model_selected,
            profile_used: profile_name_for_task.clone(),
            routing_time_ms,
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            estimated_cost,
            was_fallback: degraded || model_id != decision.primary.model_id,
            success,
            error_message,
        };
        if let Err(e) = state_for_task.analytics.record_routing(event).await {
            tracing::warn!(error = %e, "failed to record routing event");
        }
        if success {
            if let Err(e) = state_for_task.store.upsert_routing_index(model_id, &profile_name_for_task, composite_score).await {
                tracing::warn!(error = %e, "failed to refresh routing index cache");
            }
        }
    });

    let stream = futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|frame| (Ok::<_, Infallible>(Bytes::from(frame)), rx))
    });

    let response = Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    Ok(response)
}
