//! Streaming fan-out: connection manager (C12) and streaming protocol
//! (C13). Two transports — WebSocket and SSE — share one chunk model
//! (`gateway_types::StreamChunk`) and one cancellation mechanism.

pub mod cancellation;
pub mod manager;
pub mod protocol;
pub mod sse;

pub use cancellation::CancellationRegistry;
pub use manager::{ClientId, ConnectionManager, ConnectionStats, StreamingClient, Transport};
pub use protocol::{ClientMessage, ServerMessage};
