//! SSE transport (C13): renders the shared `StreamChunk` model into
//! OpenAI-compatible `text/event-stream` frames.
//!
//! Frame sequence for one request: a `routing` preamble event naming the
//! model actually selected, one `chunk.created` delta with
//! `delta.role = "assistant"`, zero or more content deltas, a final delta
//! carrying `finish_reason`, an optional `usage` event, then the
//! `data: [DONE]` sentinel. A heartbeat comment line is emitted on an
//! idle timer so intermediary proxies do not time out the connection.

use gateway_types::StreamChunk;
use serde::Serialize;
use serde_json::json;

pub const DONE_SENTINEL: &str = "data: [DONE]\n\n";

/// SSE comment line used as a heartbeat; comments are ignored by the
/// `EventSource` parser but keep the TCP connection alive.
pub fn heartbeat_comment() -> String {
    ": heartbeat\n\n".to_string()
}

#[derive(Debug, Serialize)]
struct Delta {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct Choice {
    index: u64,
    delta: Delta,
    finish_reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct OpenAiChunk {
    id: String,
    object: &'static str,
    model: String,
    choices: Vec<Choice>,
}

/// `event: routing` preamble naming the model and profile that were
/// actually selected, sent once before the first content delta.
pub fn routing_preamble(request_id: &str, model: &str, profile: &str) -> String {
    let payload = json!({
        "request_id": request_id,
        "model": model,
        "profile": profile,
    });
    format!("event: routing\ndata: {}\n\n", payload)
}

/// Render one `StreamChunk` as an OpenAI-style `chat.completion.chunk`
/// SSE frame. `is_first` adds `delta.role = "assistant"` to the opening
/// frame, matching the OpenAI wire format.
pub fn format_chunk_event(chunk: &StreamChunk, is_first: bool) -> String {
    let delta = Delta {
        role: if is_first { Some("assistant") } else { None },
        content: if chunk.content.is_empty() { None } else { Some(chunk.content.clone()) },
    };
    let body = OpenAiChunk {
        id: chunk.request_id.clone(),
        object: "chat.completion.chunk",
        model: chunk.model.clone(),
        choices: vec![Choice { index: 0, delta, finish_reason: chunk.finish_reason.clone() }],
    };
    format!("data: {}\n\n", serde_json::to_string(&body).unwrap())
}

/// Optional trailing `event: usage` frame, sent after the terminal chunk
/// when token accounting is available.
pub fn usage_event(prompt_tokens: i64, completion_tokens: i64) -> String {
    let payload = json!({
        "prompt_tokens": prompt_tokens,
        "completion_tokens": completion_tokens,
        "total_tokens": prompt_tokens + completion_tokens,
    });
    format!("event: usage\ndata: {}\n\n", payload)
}
