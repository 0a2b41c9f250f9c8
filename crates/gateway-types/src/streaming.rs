use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle state of one streaming client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Streaming,
    Closing,
    Closed,
}

/// One chunk of a streamed chat completion, shared between the WebSocket and
/// SSE transports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    pub request_id: String,
    pub index: u64,
    pub model: String,
    pub content: String,
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}
