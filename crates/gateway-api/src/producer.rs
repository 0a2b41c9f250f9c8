//! Pluggable chat-completion content generation (spec §1).
//!
//! The gateway orchestrates admission, selection, streaming, and
//! accounting; the actual call to an upstream inference API is out of
//! scope and injected through [`ChatProducer`]. Implementations own the
//! client for whichever backend they target — this crate never calls one
//! directly.

use async_trait::async_trait;
use gateway_streaming::protocol::ChatMessage;
use gateway_types::StreamChunk;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub request_id: String,
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// Token accounting handed back to the caller once generation completes,
/// feeding the analytics collector and budget manager.
#[derive(Debug, Clone, Default)]
pub struct ProductionOutcome {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub finish_reason: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProducerError {
    #[error("producer failed: {0}")]
    Failed(String),
}

/// Emits one [`StreamChunk`] per generated fragment through `on_chunk`, in
/// increasing `index` order, and returns token accounting once the model
/// reaches a stop condition. `on_chunk` callers are expected to check the
/// request's cancellation flag between chunks and stop calling `produce`'s
/// driving loop on a hit — cancellation is cooperative, not a signal this
/// trait itself carries.
#[async_trait]
pub trait ChatProducer: Send + Sync {
    async fn produce(
        &self,
        request: &ChatRequest,
        on_chunk: &(dyn Fn(StreamChunk) + Send + Sync),
    ) -> Result<ProductionOutcome, ProducerError>;
}

/// Deterministic stand-in for local development and tests: echoes the
/// last user message back as a single chunk. No real upstream client is
/// wired in — production deployments supply their own [`ChatProducer`].
pub struct EchoProducer;

#[async_trait]
impl ChatProducer for EchoProducer {
    async fn produce(
        &self,
        request: &ChatRequest,
        on_chunk: &(dyn Fn(StreamChunk) + Send + Sync),
    ) -> Result<ProductionOutcome, ProducerError> {
        let content = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
        let prompt_tokens: u64 =
            request.messages.iter().map(|m| m.content.split_whitespace().count() as u64).sum();
        let completion_tokens = content.split_whitespace().count() as u64;

        on_chunk(StreamChunk {
            request_id: request.request_id.clone(),
            index: 0,
            model: request.model.clone(),
            content,
            finish_reason: Some("stop".to_string()),
            metadata: HashMap::new(),
        });

        Ok(ProductionOutcome { prompt_tokens, completion_tokens, finish_reason: Some("stop".to_string()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn echo_producer_emits_last_message_as_a_single_chunk() {
        let producer = EchoProducer;
        let request = ChatRequest {
            request_id: "r1".to_string(),
            model: "auto".to_string(),
            messages: vec![
                ChatMessage { role: "system".to_string(), content: "be terse".to_string() },
                ChatMessage { role: "user".to_string(), content: "hello there".to_string() },
            ],
        };
        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = received.clone();
        let outcome = producer
            .produce(&request, &move |chunk| received_clone.lock().unwrap().push(chunk))
            .await
            .unwrap();

        let chunks = received.lock().unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "hello there");
        assert_eq!(chunks[0].finish_reason.as_deref(), Some("stop"));
        assert_eq!(outcome.completion_tokens, 2);
        assert_eq!(outcome.prompt_tokens, 4);
    }
}
