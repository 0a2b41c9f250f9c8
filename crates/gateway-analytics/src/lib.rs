//! Analytics collector (C14): a size-bounded write buffer in front of the
//! event table, plus the read-side aggregations the budget manager and the
//! `/v1/analytics/*` HTTP surface consume.
//!
//! Write path: `record_routing` appends to an in-memory buffer and flushes
//! it to storage in one transaction once the buffer fills. Read path
//! (`summary`, `usage_timeseries`, `model_breakdown`) flushes first so a
//! query never misses events still sitting in the buffer.

pub mod error;

pub use error::AnalyticsError;

use chrono::{DateTime, Duration, Utc};
use gateway_types::RoutingEvent;
use rusqlite::params;
use std::path::Path;
use tokio::sync::Mutex;
use tokio_rusqlite::Connection;
use tracing::debug;

const DEFAULT_BUFFER_LIMIT: usize = 100;

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct AnalyticsSummary {
    pub window_hours: i64,
    pub total_requests: i64,
    pub successful_requests: i64,
    pub failed_requests: i64,
    pub fallback_requests: i64,
    pub total_tokens: i64,
    pub total_cost: f64,
    pub avg_routing_time_ms: f64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct UsageBucket {
    pub bucket_start: DateTime<Utc>,
    pub request_count: i64,
    pub total_tokens: i64,
    pub total_cost: f64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ModelBreakdown {
    pub model: String,
    pub request_count: i64,
    pub total_tokens: i64,
    pub total_cost: f64,
    pub success_rate: f64,
    pub avg_routing_time_ms: f64,
}

pub struct AnalyticsCollector {
    conn: Connection,
    buffer: Mutex<Vec<RoutingEvent>>,
    buffer_limit: usize,
}

impl AnalyticsCollector {
    pub async fn new(path: impl AsRef<Path>) -> Result<Self, AnalyticsError> {
        Self::with_buffer_limit(path, DEFAULT_BUFFER_LIMIT).await
    }

    pub async fn new_in_memory() -> Result<Self, AnalyticsError> {
        let conn = Connection::open_in_memory().await?;
        let collector = Self { conn, buffer: Mutex::new(Vec::new()), buffer_limit: DEFAULT_BUFFER_LIMIT };
        collector.init_schema().await?;
        Ok(collector)
    }

    pub async fn with_buffer_limit(path: impl AsRef<Path>, buffer_limit: usize) -> Result<Self, AnalyticsError> {
        let conn = Connection::open(path.as_ref()).await?;
        let collector = Self { conn, buffer: Mutex::new(Vec::new()), buffer_limit };
        collector.init_schema().await?;
        Ok(collector)
    }

    async fn init_schema(&self) -> Result<(), AnalyticsError> {
        self.conn
            .call(|conn| {
                conn.execute_batch(
                    "
                    PRAGMA journal_mode=WAL;
                    PRAGMA synchronous=NORMAL;
                    PRAGMA foreign_keys=ON;

                    CREATE TABLE IF NOT EXISTS routing_events (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        timestamp TEXT NOT NULL,
                        model_selected TEXT NOT NULL,
                        profile_used TEXT NOT NULL,
                        routing_time_ms REAL NOT NULL,
                        prompt_tokens INTEGER NOT NULL,
                        completion_tokens INTEGER NOT NULL,
                        total_tokens INTEGER NOT NULL,
                        estimated_cost REAL NOT NULL,
                        was_fallback INTEGER NOT NULL,
                        success INTEGER NOT NULL,
                        error_message TEXT
                    );
                    CREATE INDEX IF NOT EXISTS idx_routing_events_timestamp
                        ON routing_events(timestamp);
                    ",
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Append one event to the write buffer, flushing synchronously if the
    /// buffer is now full. Per spec §4.14/§5, all writers block while a
    /// full-buffer flush swaps the buffer out.
    pub async fn record_routing(&self, event: RoutingEvent) -> Result<(), AnalyticsError> {
        let should_flush = {
            let mut buffer = self.buffer.lock().await;
            buffer.push(event);
            buffer.len() >= self.buffer_limit
        };
        if should_flush {
            self.flush().await?;
        }
        Ok(())
    }

    /// Swap the buffer out and write its contents to the event table in a
    /// single transaction. A no-op when the buffer is empty.
    pub async fn flush(&self) -> Result<usize, AnalyticsError> {
        let drained: Vec<RoutingEvent> = {
            let mut buffer = self.buffer.lock().await;
            std::mem::take(&mut *buffer)
        };
        if drained.is_empty() {
            return Ok(0);
        }
        let count = drained.len();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                for event in &drained {
                    tx.execute(
                        "INSERT INTO routing_events (
                            timestamp, model_selected, profile_used, routing_time_ms,
                            prompt_tokens, completion_tokens, total_tokens, estimated_cost,
                            was_fallback, success, error_message
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                        params![
                            event.timestamp.to_rfc3339(),
                            event.model_selected,
                            event.profile_used,
                            event.routing_time_ms,
                            event.prompt_tokens,
                            event.completion_tokens,
                            event.total_tokens,
                            event.estimated_cost,
                            event.was_fallback as i64,
                            event.success as i64,
                            event.error_message,
                        ],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await?;
        debug!(count, "flushed analytics buffer");
        Ok(count)
    }

    /// Aggregate totals over the trailing `hours` window.
    pub async fn summary(&self, hours: i64) -> Result<AnalyticsSummary, AnalyticsError> {
        self.flush().await?;
        let cutoff = (Utc::now() - Duration::hours(hours)).to_rfc3339();
        let summary = self
            .conn
            .call(move |conn| {
                let row = conn.query_row(
                    "SELECT
                        COUNT(*),
                        COALESCE(SUM(success), 0),
                        COALESCE(SUM(1 - success), 0),
                        COALESCE(SUM(was_fallback), 0),
                        COALESCE(SUM(total_tokens), 0),
                        COALESCE(SUM(estimated_cost), 0.0),
                        COALESCE(AVG(routing_time_ms), 0.0)
                    FROM routing_events WHERE timestamp >= ?1",
                    params![cutoff],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, i64>(2)?,
                            row.get::<_, i64>(3)?,
                            row.get::<_, i64>(4)?,
                            row.get::<_, f64>(5)?,
                            row.get::<_, f64>(6)?,
                        ))
                    },
                )?;
                Ok(row)
            })
            .await?;
        let (total, ok, failed, fallback, tokens, cost, avg_ms) = summary;
        Ok(AnalyticsSummary {
            window_hours: hours,
            total_requests: total,
            successful_requests: ok,
            failed_requests: failed,
            fallback_requests: fallback,
            total_tokens: tokens,
            total_cost: cost,
            avg_routing_time_ms: avg_ms,
        })
    }

    /// Total spend over the trailing `hours` window — the budget manager's
    /// sole read into this collector.
    pub async fn spend_in_window(&self, hours: i64) -> Result<f64, AnalyticsError> {
        self.flush().await?;
        let cutoff = (Utc::now() - Duration::hours(hours)).to_rfc3339();
        let spend = self
            .conn
            .call(move |conn| {
                let total: f64 = conn.query_row(
                    "SELECT COALESCE(SUM(estimated_cost), 0.0) FROM routing_events WHERE timestamp >= ?1",
                    params![cutoff],
                    |row| row.get(0),
                )?;
                Ok(total)
            })
            .await?;
        Ok(spend)
    }

    /// Bucket request volume, tokens, and cost into `bucket_minutes`-wide
    /// buckets over the trailing `hours` window. Empty buckets are omitted.
    pub async fn usage_timeseries(&self, hours: i64, bucket_minutes: i64) -> Result<Vec<UsageBucket>, AnalyticsError> {
        self.flush().await?;
        let cutoff = (Utc::now() - Duration::hours(hours)).to_rfc3339();
        let bucket_seconds = (bucket_minutes.max(1)) * 60;
        let rows: Vec<(i64, i64, i64, f64)> = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT
                        (CAST(strftime('%s', timestamp) AS INTEGER) / ?2) * ?2 AS bucket,
                        COUNT(*),
                        COALESCE(SUM(total_tokens), 0),
                        COALESCE(SUM(estimated_cost), 0.0)
                    FROM routing_events
                    WHERE timestamp >= ?1
                    GROUP BY bucket
                    ORDER BY bucket ASC",
                )?;
                let rows = stmt
                    .query_map(params![cutoff, bucket_seconds], |row| {
                        Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?, row.get::<_, f64>(3)?))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        Ok(rows
            .into_iter()
            .map(|(bucket_epoch, count, tokens, cost)| UsageBucket {
                bucket_start: DateTime::from_timestamp(bucket_epoch, 0).unwrap_or_else(Utc::now),
                request_count: count,
                total_tokens: tokens,
                total_cost: cost,
            })
            .collect())
    }

    /// Per-model aggregates over the trailing `hours` window.
    pub async fn model_breakdown(&self, hours: i64) -> Result<Vec<ModelBreakdown>, AnalyticsError> {
        self.flush().await?;
        let cutoff = (Utc::now() - Duration::hours(hours)).to_rfc3339();
        let rows: Vec<(String, i64, i64, f64, f64, f64)> = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT
                        model_selected,
                        COUNT(*),
                        COALESCE(SUM(total_tokens), 0),
                        COALESCE(SUM(estimated_cost), 0.0),
                        COALESCE(AVG(success), 0.0),
                        COALESCE(AVG(routing_time_ms), 0.0)
                    FROM routing_events
                    WHERE timestamp >= ?1
                    GROUP BY model_selected
                    ORDER BY COUNT(*) DESC",
                )?;
                let rows = stmt
                    .query_map(params![cutoff], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, i64>(2)?,
                            row.get::<_, f64>(3)?,
                            row.get::<_, f64>(4)?,
                            row.get::<_, f64>(5)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        Ok(rows
            .into_iter()
            .map(|(model, count, tokens, cost, success_rate, avg_ms)| ModelBreakdown {
                model,
                request_count: count,
                total_tokens: tokens,
                total_cost: cost,
                success_rate,
                avg_routing_time_ms: avg_ms,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(model: &str, cost: f64, success: bool) -> RoutingEvent {
        RoutingEvent {
            timestamp: Utc::now(),
            model_selected: model.to_string(),
            profile_used: "balanced".to_string(),
            routing_time_ms: 12.5,
            prompt_tokens: 100,
            completion_tokens: 50,
            total_tokens: 150,
            estimated_cost: cost,
            was_fallback: false,
            success,
            error_message: None,
        }
    }

    #[tokio::test]
    async fn record_then_summary_flushes_buffer_automatically() {
        let collector = AnalyticsCollector::new_in_memory().await.unwrap();
        collector.record_routing(event("gpt-4o", 0.02, true)).await.unwrap();
        collector.record_routing(event("gpt-4o", 0.03, false)).await.unwrap();

        let summary = collector.summary(24).await.unwrap();
        assert_eq!(summary.total_requests, 2);
        assert_eq!(summary.successful_requests, 1);
        assert_eq!(summary.failed_requests, 1);
        assert!((summary.total_cost - 0.05).abs() < 1e-9);
    }

    #[tokio::test]
    async fn buffer_fill_triggers_synchronous_flush() {
        let dir = tempfile::tempdir().unwrap();
        let collector = AnalyticsCollector::with_buffer_limit(dir.path().join("events.db"), 3).await.unwrap();
        for _ in 0..3 {
            collector.record_routing(event("a", 1.0, true)).await.unwrap();
        }
        // Buffer should already be empty post-flush: a direct flush finds nothing.
        assert_eq!(collector.flush().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn model_breakdown_groups_by_model() {
        let collector = AnalyticsCollector::new_in_memory().await.unwrap();
        collector.record_routing(event("a", 1.0, true)).await.unwrap();
        collector.record_routing(event("a", 2.0, true)).await.unwrap();
        collector.record_routing(event("b", 5.0, false)).await.unwrap();

        let breakdown = collector.model_breakdown(24).await.unwrap();
        assert_eq!(breakdown.len(), 2);
        let a = breakdown.iter().find(|m| m.model == "a").unwrap();
        assert_eq!(a.request_count, 2);
        assert!((a.total_cost - 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn spend_in_window_excludes_events_outside_window() {
        let collector = AnalyticsCollector::new_in_memory().await.unwrap();
        collector.record_routing(event("a", 10.0, true)).await.unwrap();
        let spend = collector.spend_in_window(24).await.unwrap();
        assert!((spend - 10.0).abs() < 1e-9);
    }
}
