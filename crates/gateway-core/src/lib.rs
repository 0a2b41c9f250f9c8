//! Metric store (C5) and static service configuration for the routing
//! gateway: canonical-model catalog, alias bookkeeping, the append-only
//! raw-metric log, per-source ingest status, and the routing-index cache,
//! all backed by one SQLite connection in WAL mode.

pub mod config;
pub mod error;
pub mod store;

pub use config::ServiceConfig;
pub use error::StoreError;
pub use store::{MetricStore, PruneReport, SourceStatus};
