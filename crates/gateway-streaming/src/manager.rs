//! Connection manager (C12): owns the `client_id -> client` and
//! `request_id -> set<client_id>` mappings. Both mappings are mutated
//! under a single mutex; connect/disconnect callbacks fire after the lock
//! is released so a callback can never deadlock against the manager.

use crate::protocol::ServerMessage;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gateway_types::ConnectionState;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

pub type ClientId = String;

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("connection manager at capacity ({0} connections)")]
    Capacity(usize),
    #[error("client {0} not found")]
    NotFound(ClientId),
}

/// A client's send-side transport, abstracted over the actual WebSocket or
/// SSE channel so this crate can be unit-tested without a running server.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, message: &ServerMessage) -> Result<(), ()>;
    async fn send_text(&self, text: &str) -> Result<(), ()>;
}

pub struct StreamingClient {
    pub id: ClientId,
    pub transport: Arc<dyn Transport>,
    pub state: ConnectionState,
    pub connected_at: DateTime<Utc>,
    pub current_request_id: Option<String>,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ConnectionStats {
    pub client_count: usize,
    pub subscription_count: usize,
    pub max_connections: usize,
}

struct State {
    clients: HashMap<ClientId, StreamingClient>,
    subscriptions: HashMap<String, HashSet<ClientId>>,
}

pub struct ConnectionManager {
    state: Mutex<State>,
    max_connections: usize,
    on_connect: Option<Box<dyn Fn(&ClientId) + Send + Sync>>,
    on_disconnect: Option<Box<dyn Fn(&ClientId) + Send + Sync>>,
}

impl ConnectionManager {
    pub fn new(max_connections: usize) -> Self {
        Self {
            state: Mutex::new(State { clients: HashMap::new(), subscriptions: HashMap::new() }),
            max_connections,
            on_connect: None,
            on_disconnect: None,
        }
    }

    pub fn with_callbacks(
        max_connections: usize,
        on_connect: impl Fn(&ClientId) + Send + Sync + 'static,
        on_disconnect: impl Fn(&ClientId) + Send + Sync + 'static,
    ) -> Self {
        Self {
            state: Mutex::new(State { clients: HashMap::new(), subscriptions: HashMap::new() }),
            max_connections,
            on_connect: Some(Box::new(on_connect)),
            on_disconnect: Some(Box::new(on_disconnect)),
        }
    }

    /// Register a new client. Rejects with `Capacity` once
    /// `len(clients) >= max_connections` — the caller is expected to close
    /// the transport with a policy-coded reason.
    pub async fn connect(
        &self,
        client_id: ClientId,
        transport: Arc<dyn Transport>,
        metadata: Option<serde_json::Value>,
    ) -> Result<(), ConnectionError> {
        {
            let mut guard = self.state.lock().await;
            if guard.clients.len() >= self.max_connections {
                return Err(ConnectionError::Capacity(self.max_connections));
            }
            guard.clients.insert(
                client_id.clone(),
                StreamingClient {
                    id: client_id.clone(),
                    transport,
                    state: ConnectionState::Connected,
                    connected_at: Utc::now(),
                    current_request_id: None,
                    metadata: metadata.unwrap_or(serde_json::Value::Null),
                },
            );
        }
        if let Some(cb) = &self.on_connect {
            cb(&client_id);
        }
        Ok(())
    }

    /// Remove a client and every subscription it held. Idempotent: a
    /// disconnect of an already-removed client is a no-op.
    pub async fn disconnect(&self, client_id: &ClientId) {
        let removed = {
            let mut guard = self.state.lock().await;
            let removed = guard.clients.remove(client_id).is_some();
            for subscribers in guard.subscriptions.values_mut() {
                subscribers.remove(client_id);
            }
            guard.subscriptions.retain(|_, subs| !subs.is_empty());
            removed
        };
        if removed {
            if let Some(cb) = &self.on_disconnect {
                cb(client_id);
            }
        }
    }

    /// Send one message to one client. A failed send triggers that
    /// client's disconnect exactly once.
    pub async fn send_to_client(&self, client_id: &ClientId, message: &ServerMessage) -> bool {
        let transport = {
            let guard = self.state.lock().await;
            guard.clients.get(client_id).map(|c| c.transport.clone())
        };
        match transport {
            Some(t) => {
                if t.send(message).await.is_err() {
                    self.disconnect(client_id).await;
                    false
                } else {
                    true
                }
            }
            None => false,
        }
    }

    pub async fn send_text_to_client(&self, client_id: &ClientId, text: &str) -> bool {
        let transport = {
            let guard = self.state.lock().await;
            guard.clients.get(client_id).map(|c| c.transport.clone())
        };
        match transport {
            Some(t) => {
                if t.send_text(text).await.is_err() {
                    self.disconnect(client_id).await;
                    false
                } else {
                    true
                }
            }
            None => false,
        }
    }

    pub async fn broadcast(&self, message: &ServerMessage, exclude: Option<&ClientId>) {
        let targets: Vec<ClientId> = {
            let guard = self.state.lock().await;
            guard.clients.keys().filter(|id| Some(*id) != exclude).cloned().collect()
        };
        for id in targets {
            self.send_to_client(&id, message).await;
        }
    }

    /// Deliver `message` in order to every subscriber of `request_id`.
    /// Callers (the streaming protocol's producer loop) are responsible for
    /// calling this sequentially per request so chunk order is preserved.
    pub async fn send_to_request(&self, request_id: &str, message: &ServerMessage) {
        let subscribers: Vec<ClientId> = {
            let guard = self.state.lock().await;
            guard.subscriptions.get(request_id).map(|s| s.iter().cloned().collect()).unwrap_or_default()
        };
        for client_id in subscribers {
            self.send_to_client(&client_id, message).await;
        }
    }

    pub async fn subscribe(&self, client_id: &ClientId, request_id: &str) {
        let mut guard = self.state.lock().await;
        if let Some(client) = guard.clients.get_mut(client_id) {
            client.current_request_id = Some(request_id.to_string());
            client.state = ConnectionState::Streaming;
        }
        guard.subscriptions.entry(request_id.to_string()).or_default().insert(client_id.clone());
    }

    pub async fn unsubscribe(&self, client_id: &ClientId, request_id: &str) {
        let mut guard = self.state.lock().await;
        if let Some(subs) = guard.subscriptions.get_mut(request_id) {
            subs.remove(client_id);
            if subs.is_empty() {
                guard.subscriptions.remove(request_id);
            }
        }
        if let Some(client) = guard.clients.get_mut(client_id) {
            if client.current_request_id.as_deref() == Some(request_id) {
                client.current_request_id = None;
                client.state = ConnectionState::Connected;
            }
        }
    }

    pub async fn stats(&self) -> ConnectionStats {
        let guard = self.state.lock().await;
        ConnectionStats {
            client_count: guard.clients.len(),
            subscription_count: guard.subscriptions.len(),
            max_connections: self.max_connections,
        }
    }

    /// Send a liveness ping to every client; a failed send harvests that
    /// connection via the normal disconnect path.
    pub async fn heartbeat_tick(&self) {
        self.broadcast(&ServerMessage::Pong, None).await;
    }
}
