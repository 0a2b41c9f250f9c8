//! WebSocket wire protocol (C13): typed inbound/outbound frames sharing
//! the `StreamChunk` chunk model with the SSE transport.
//!
//! Ordering guarantee: for one `request_id`, chunks are sent with strictly
//! increasing `index` and the terminal event (`Done`, `Error`, or
//! `Cancelled`) is always the last frame for that request.

use gateway_types::StreamChunk;
use serde::{Deserialize, Serialize};

/// Inbound frames, sent by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,
    Chat {
        request_id: String,
        model: String,
        messages: Vec<ChatMessage>,
        routing_profile: Option<String>,
        stream: bool,
    },
    Cancel {
        request_id: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Outbound frames, sent by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected { client_id: String },
    Pong,
    Start { request_id: String, model: String },
    Chunk(StreamChunk),
    Done { request_id: String },
    Error { request_id: String, message: String },
    Cancelled { request_id: String },
    CancelAcknowledged { request_id: String },
}

impl ServerMessage {
    /// True for the three frame kinds allowed to be the last frame of a
    /// request's stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ServerMessage::Done { .. } | ServerMessage::Error { .. } | ServerMessage::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_message_round_trips_through_json() {
        let msg = ClientMessage::Chat {
            request_id: "r1".into(),
            model: "auto".into(),
            messages: vec![ChatMessage { role: "user".into(), content: "hi".into() }],
            routing_profile: Some("balanced".into()),
            stream: true,
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: ClientMessage = serde_json::from_str(&json).unwrap();
        match back {
            ClientMessage::Chat { request_id, .. } => assert_eq!(request_id, "r1"),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn only_done_error_cancelled_are_terminal() {
        assert!(ServerMessage::Done { request_id: "r".into() }.is_terminal());
        assert!(ServerMessage::Error { request_id: "r".into(), message: "x".into() }.is_terminal());
        assert!(ServerMessage::Cancelled { request_id: "r".into() }.is_terminal());
        assert!(!ServerMessage::Pong.is_terminal());
        assert!(!ServerMessage::Start { request_id: "r".into(), model: "m".into() }.is_terminal());
    }
}
