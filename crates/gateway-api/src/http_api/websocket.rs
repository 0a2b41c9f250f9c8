//! `GET /v1/stream` (spec §4.13, §6): bidirectional WebSocket streaming.
//!
//! One task per connection reads `ClientMessage` frames; each `Chat`
//! request spawns its own producer-driving task so multiple in-flight
//! requests on one socket make progress independently, serialized only by
//! [`ConnectionManager::send_to_request`]'s per-request ordering guarantee.

use super::gates::{QuotaGate, SpendGate};
use super::state::ApiState;
use crate::producer::ChatRequest;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Extension, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use gateway_streaming::manager::Transport;
use gateway_streaming::protocol::{ClientMessage, ServerMessage};
use gateway_types::{profile::get_profile, RoutingEvent};
use std::sync::Arc;

struct WsTransport {
    tx: tokio::sync::mpsc::UnboundedSender<Message>,
}

#[async_trait::async_trait]
impl Transport for WsTransport {
    async fn send(&self, message: &ServerMessage) -> Result<(), ()> {
        let text = serde_json::to_string(message).map_err(|_| ())?;
        self.tx.send(Message::Text(text.into())).map_err(|_| ())
    }

    async fn send_text(&self, text: &str) -> Result<(), ()> {
        self.tx.send(Message::Text(text.to_string().into())).map_err(|_| ())
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ApiState>>,
    Extension(allowed_origins): Extension<Arc<Vec<String>>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if crate::origin_validation::validate_websocket_origin(&headers, &allowed_origins).is_err() {
        return axum::http::StatusCode::FORBIDDEN.into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<ApiState>) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Message>();
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                break;
            }
        }
    });

    let client_id = uuid::Uuid::new_v4().to_string();
    let transport = Arc::new(WsTransport { tx: tx.clone() });
    if state.connections.connect(client_id.clone(), transport, None).await.is_err() {
        let _ = tx.send(Message::Close(None));
        drop(tx);
        let _ = writer.await;
        return;
    }
    state.connections.send_to_client(&client_id, &ServerMessage::Connected { client_id: client_id.clone() }).await;

    while let Some(Ok(msg)) = stream.next().await {
        let Message::Text(text) = msg else { continue };
        let Ok(client_msg) = serde_json::from_str::<ClientMessage>(&text) else { continue };
        match client_msg {
            ClientMessage::Ping => {
                state.connections.send_to_client(&client_id, &ServerMessage::Pong).await;
            }
            ClientMessage::Cancel { request_id } => {
                state.cancellations.cancel(&request_id);
                state.connections.send_to_client(&client_id, &ServerMessage::CancelAcknowledged { request_id }).await;
            }
            ClientMessage::Chat { request_id, model, messages, routing_profile, .. } => {
                let state = state.clone();
                let client_id = client_id.clone();
                state.connections.subscribe(&client_id, &request_id).await;
                tokio::spawn(async move {
                    run_chat(state, client_id, request_id, model, messages, routing_profile).await;
                });
            }
        }
    }

    state.connections.disconnect(&client_id).await;
    drop(tx);
    let _ = writer.await;
}

async fn run_chat(
    state: Arc<ApiState>,
    client_id: String,
    request_id: String,
    model: String,
    messages: Vec<gateway_streaming::protocol::ChatMessage>,
    routing_profile: Option<String>,
) {
    let profile_name = routing_profile.unwrap_or_else(|| "balanced".to_string());
    let profile = match get_profile(&profile_name) {
        Some(p) => p,
        None => {
            state
                .connections
                .send_to_request(&request_id, &ServerMessage::Error { request_id: request_id.clone(), message: format!("unknown routing profile: {profile_name}") })
                .await;
            return;
        }
    };

    let all_views = match state.store.list_model_metrics_views().await {
        Ok(v) => v,
        Err(e) => {
            state
                .connections
                .send_to_request(&request_id, &ServerMessage::Error { request_id: request_id.clone(), message: e.to_string() })
                .await;
            return;
        }
    };
    let candidates: Vec<_> =
        if model == "auto" { all_views } else { all_views.into_iter().filter(|v| v.model_name == model).collect() };

    let prompt_tokens: i64 = messages.iter().map(|m| m.content.split_whitespace().count() as i64).sum();
    let max_blended_cost = candidates.iter().filter_map(|c| c.cost_blended_per_million).fold(0.0_f64, f64::max);
    let estimated_cost = (prompt_tokens as f64 / 1_000_000.0) * max_blended_cost;

    let quota_gate = QuotaGate(state.quota.clone());
    let budget_gate = SpendGate(state.budget.clone());
    let decision = match state.router.route(&client_id, estimated_cost, &candidates, &profile, &quota_gate, &budget_gate).await {
        Ok(d) => d,
        Err(e) => {
            state
                .connections
                .send_to_request(&request_id, &ServerMessage::Error { request_id: request_id.clone(), message: e.to_string() })
                .await;
            return;
        }
    };

    state
        .connections
        .send_to_request(
            &request_id,
            &ServerMessage::Start { request_id: request_id.clone(), model: decision.primary.model_name.clone() },
        )
        .await;

    let chat_request = ChatRequest { request_id: request_id.clone(), model: decision.primary.model_name.clone(), messages };

    let manager = state.connections.clone();
    let cancellations = state.cancellations.clone();
    let forward_request_id = request_id.clone();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<gateway_types::StreamChunk>();
    let forward = tokio::spawn(async move {
        while let Some(chunk) = rx.recv().await {
            if cancellations.is_cancelled(&forward_request_id) {
                continue;
            }
            manager.send_to_request(&forward_request_id, &ServerMessage::Chunk(chunk)).await;
        }
    });

    let on_chunk = move |chunk: gateway_types::StreamChunk| {
        let _ = tx.send(chunk);
    };
    let result = state.producer.produce(&chat_request, &on_chunk).await;
    drop(on_chunk);
    let _ = forward.await;

    let cancelled = state.cancellations.is_cancelled(&request_id);
    state.cancellations.clear(&request_id);

    let terminal = if cancelled {
        ServerMessage::Cancelled { request_id: request_id.clone() }
    } else {
        match &result {
            Ok(_) => ServerMessage::Done { request_id: request_id.clone() },
            Err(e) => ServerMessage::Error { request_id: request_id.clone(), message: e.to_string() },
        }
    };
    state.connections.send_to_request(&request_id, &terminal).await;
    state.connections.unsubscribe(&client_id, &request_id).await;

    let completion_tokens = result.as_ref().map(|o| o.completion_tokens as i64).unwrap_or(0);
    let event = RoutingEvent {
        timestamp: Utc::now(),
        model_selected: decision.primary.model_name,
        profile_used: profile.name,
        routing_time_ms: decision.routing_time_ms,
        prompt_tokens,
        completion_tokens,
        total_tokens: prompt_tokens + completion_tokens,
        estimated_cost,
        was_fallback: decision.degraded,
        success: result.is_ok() && !cancelled,
        error_message: result.err().map(|e| e.to_string()),
    };
    if let Err(e) = state.analytics.record_routing(event).await {
        tracing::warn!(error = %e, "failed to record routing event");
    }
}
