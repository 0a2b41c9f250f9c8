//! Shared data types for the routing gateway.
//!
//! These are the wire/value types passed between `gateway-core`,
//! `gateway-resolution`, `gateway-routing`, `gateway-admission`,
//! `gateway-streaming` and `gateway-api` so that no crate needs to depend on
//! another crate's internals just to pass a metric or a score around.

pub mod metrics;
pub mod profile;
pub mod score;
pub mod streaming;

pub use metrics::{MetricKind, RawMetric};
pub use profile::RoutingProfile;
pub use score::{ModelMetricsView, ModelScore};
pub use streaming::{ConnectionState, StreamChunk};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique catalog entry. Name is unique and immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalModel {
    pub id: i64,
    pub name: String,
    pub provider: String,
    pub context_length: Option<i64>,
    pub active: bool,
}

/// A source-specific name mapped to a canonical model with a match confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelAlias {
    pub alias: String,
    pub canonical_id: i64,
    pub confidence: f64,
    pub reviewed: bool,
    pub source: Option<String>,
}

/// Immutable record of one completed routing decision/request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingEvent {
    pub timestamp: DateTime<Utc>,
    pub model_selected: String,
    pub profile_used: String,
    pub routing_time_ms: f64,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
    pub estimated_cost: f64,
    pub was_fallback: bool,
    pub success: bool,
    pub error_message: Option<String>,
}
