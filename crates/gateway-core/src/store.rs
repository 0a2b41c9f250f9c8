//! Metric store (C5): canonical-model catalog, alias table, append-only
//! raw-metric log, per-source ingest bookkeeping, and a precomputed
//! routing-index cache, all against one SQLite connection in WAL mode.
//!
//! Write path for one adapter run: resolve each source model name against
//! the canonical catalog, upsert a canonical row for anything the resolver
//! could not match (a genuinely new model), then append the run's metrics
//! and alias updates in a single transaction.

use crate::error::StoreError;
use chrono::{DateTime, Duration, Utc};
use gateway_resolution::{EntityResolver, MatchConfidence};
use gateway_types::{CanonicalModel, ModelAlias, ModelMetricsView, RawMetric, RoutingEvent};
use rusqlite::OptionalExtension;
use std::collections::BTreeMap;
use std::path::Path;
use tokio_rusqlite::Connection;

pub struct MetricStore {
    conn: Connection,
}

/// Bookkeeping row for one benchmark source, per spec.md §4.5.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SourceStatus {
    pub source: String,
    pub url: Option<String>,
    pub last_sync: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub status: String,
    pub error_message: Option<String>,
    pub sync_interval_minutes: u32,
}

impl MetricStore {
    pub async fn new(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref()).await?;
        let store = Self { conn };
        store.init_schema().await?;
        Ok(store)
    }

    pub async fn new_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().await?;
        let store = Self { conn };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        self.conn
            .call(|conn| {
                conn.execute_batch(
                    "
                    PRAGMA journal_mode=WAL;
                    PRAGMA synchronous=NORMAL;
                    PRAGMA busy_timeout=5000;
                    PRAGMA foreign_keys=ON;

                    CREATE TABLE IF NOT EXISTS canonical_models (
                        id              INTEGER PRIMARY KEY AUTOINCREMENT,
                        name            TEXT NOT NULL UNIQUE,
                        provider        TEXT NOT NULL,
                        context_length  INTEGER,
                        active          INTEGER NOT NULL DEFAULT 1
                    );

                    CREATE TABLE IF NOT EXISTS model_aliases (
                        alias        TEXT PRIMARY KEY,
                        canonical_id INTEGER NOT NULL REFERENCES canonical_models(id),
                        confidence   REAL NOT NULL,
                        reviewed     INTEGER NOT NULL DEFAULT 0,
                        source       TEXT
                    );

                    CREATE INDEX IF NOT EXISTS idx_aliases_canonical ON model_aliases(canonical_id);

                    CREATE TABLE IF NOT EXISTS raw_metrics (
                        id           INTEGER PRIMARY KEY AUTOINCREMENT,
                        canonical_id INTEGER NOT NULL REFERENCES canonical_models(id),
                        source       TEXT NOT NULL,
                        metric_type  TEXT NOT NULL,
                        value        REAL NOT NULL,
                        timestamp    TEXT NOT NULL,
                        metadata     TEXT
                    );

                    CREATE INDEX IF NOT EXISTS idx_metrics_model_type ON raw_metrics(canonical_id, metric_type);
                    CREATE INDEX IF NOT EXISTS idx_metrics_timestamp ON raw_metrics(timestamp);

                    CREATE TABLE IF NOT EXISTS benchmark_sources (
                        source               TEXT PRIMARY KEY,
                        url                  TEXT,
                        last_sync            TEXT,
                        last_success         TEXT,
                        status               TEXT NOT NULL DEFAULT 'never_run',
                        error_message        TEXT,
                        sync_interval_minutes INTEGER NOT NULL DEFAULT 60
                    );

                    CREATE TABLE IF NOT EXISTS routing_index (
                        canonical_id   INTEGER NOT NULL REFERENCES canonical_models(id),
                        profile_name   TEXT NOT NULL,
                        composite_score REAL NOT NULL,
                        computed_at    TEXT NOT NULL,
                        PRIMARY KEY (canonical_id, profile_name)
                    );

                    CREATE TABLE IF NOT EXISTS routing_events (
                        id                INTEGER PRIMARY KEY AUTOINCREMENT,
                        timestamp         TEXT NOT NULL,
                        model_selected    TEXT NOT NULL,
                        profile_used      TEXT NOT NULL,
                        routing_time_ms   REAL NOT NULL,
                        prompt_tokens     INTEGER NOT NULL,
                        completion_tokens INTEGER NOT NULL,
                        total_tokens      INTEGER NOT NULL,
                        estimated_cost    REAL NOT NULL,
                        was_fallback      INTEGER NOT NULL,
                        success           INTEGER NOT NULL,
                        error_message     TEXT
                    );
                    ",
                )?;
                Ok(())
            })
            .await
            .map_err(StoreError::from)
    }

    // -----------------------------------------------------------------------
    // Canonical models
    // -----------------------------------------------------------------------

    pub async fn load_canonical_catalog(&self) -> Result<BTreeMap<i64, String>, StoreError> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT id, name FROM canonical_models WHERE active = 1")?;
                let rows = stmt.query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?)))?;
                let mut out = BTreeMap::new();
                for row in rows {
                    let (id, name) = row?;
                    out.insert(id, name);
                }
                Ok(out)
            })
            .await
            .map_err(StoreError::from)
    }

    pub async fn get_canonical_model(&self, id: i64) -> Result<Option<CanonicalModel>, StoreError> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, name, provider, context_length, active FROM canonical_models WHERE id = ?1",
                )?;
                let mut rows = stmt.query(rusqlite::params![id])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row_to_canonical(row)?)),
                    None => Ok(None),
                }
            })
            .await
            .map_err(StoreError::from)
    }

    async fn create_canonical_model(&self, name: &str, provider: &str) -> Result<i64, StoreError> {
        let name = name.to_string();
        let provider = provider.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO canonical_models (name, provider, context_length, active)
                     VALUES (?1, ?2, NULL, 1)
                     ON CONFLICT(name) DO NOTHING",
                    rusqlite::params![name, provider],
                )?;
                let id: i64 =
                    conn.query_row("SELECT id FROM canonical_models WHERE name = ?1", rusqlite::params![name], |r| r.get(0))?;
                Ok(id)
            })
            .await
            .map_err(StoreError::from)
    }

    /// Mark models inactive when no metric has arrived within `inactivity`.
    /// Never deletes rows. Returns the number of models newly marked.
    pub async fn mark_inactive_models(&self, inactivity: Duration) -> Result<usize, StoreError> {
        let cutoff = (Utc::now() - inactivity).to_rfc3339();
        self.conn
            .call(move |conn| {
                let updated = conn.execute(
                    "UPDATE canonical_models SET active = 0
                     WHERE active = 1
                       AND id NOT IN (
                           SELECT canonical_id FROM raw_metrics WHERE timestamp >= ?1
                       )",
                    rusqlite::params![cutoff],
                )?;
                Ok(updated)
            })
            .await
            .map_err(StoreError::from)
    }

    // -----------------------------------------------------------------------
    // Ingestion write path
    // -----------------------------------------------------------------------

    /// Resolve every distinct model name in `metrics` against the current
    /// catalog, creating canonical rows for unmatched names, then append
    /// the whole run (metrics + alias upserts) in one transaction.
    ///
    /// Returns the set of canonical ids touched, for cache invalidation.
    pub async fn record_source_metrics(
        &self,
        resolver: &EntityResolver,
        source: &str,
        metrics: Vec<RawMetric>,
    ) -> Result<Vec<i64>, StoreError> {
        if metrics.is_empty() {
            return Ok(Vec::new());
        }

        let mut catalog = self.load_canonical_catalog().await?;
        let mut resolved_ids: BTreeMap<String, (i64, f64, bool)> = BTreeMap::new();

        for name in metrics.iter().map(|m| m.model_name.clone()).collect::<std::collections::BTreeSet<_>>() {
            let resolution = resolver.resolve(&name, &catalog);
            let (canonical_id, confidence, reviewed) = match resolution.confidence {
                MatchConfidence::Exact | MatchConfidence::High => {
                    (resolution.canonical_id.expect("matched confidence implies an id"), resolution.score, true)
                }
                MatchConfidence::Medium => {
                    (resolution.canonical_id.expect("medium confidence implies a candidate id"), resolution.score, false)
                }
                MatchConfidence::Low => {
                    let provider = metrics
                        .iter()
                        .find(|m| m.model_name == name)
                        .and_then(|m| m.metadata.get("provider"))
                        .and_then(|v| v.as_str())
                        .unwrap_or("unknown");
                    let id = self.create_canonical_model(&name, provider).await?;
                    catalog.insert(id, name.clone());
                    (id, 1.0, true)
                }
            };
            resolved_ids.insert(name, (canonical_id, confidence, reviewed));
        }

        let source = source.to_string();
        let rows: Vec<(i64, RawMetric)> = metrics
            .into_iter()
            .map(|m| (resolved_ids[&m.model_name].0, m))
            .collect();
        let aliases: Vec<(String, i64, f64, bool)> = resolved_ids
            .into_iter()
            .map(|(alias, (id, confidence, reviewed))| (alias, id, confidence, reviewed))
            .collect();

        let touched: Vec<i64> = rows.iter().map(|(id, _)| *id).collect();

        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                for (alias, canonical_id, confidence, reviewed) in &aliases {
                    tx.execute(
                        "INSERT INTO model_aliases (alias, canonical_id, confidence, reviewed, source)
                         VALUES (?1, ?2, ?3, ?4, ?5)
                         ON CONFLICT(alias) DO UPDATE SET
                            canonical_id = excluded.canonical_id,
                            confidence = excluded.confidence,
                            source = excluded.source
                         WHERE model_aliases.reviewed = 0 OR excluded.reviewed = 1",
                        rusqlite::params![alias, canonical_id, confidence, *reviewed as i64, source],
                    )?;
                }
                for (canonical_id, metric) in &rows {
                    let metadata = serde_json::to_string(&metric.metadata).ok();
                    tx.execute(
                        "INSERT INTO raw_metrics (canonical_id, source, metric_type, value, timestamp, metadata)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        rusqlite::params![
                            canonical_id,
                            metric.source,
                            metric.metric_type.as_str(),
                            metric.value,
                            metric.timestamp.to_rfc3339(),
                            metadata,
                        ],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(StoreError::from)?;

        // Cheap invalidation: drop every cached routing-index row touched
        // by this run rather than threading a variadic IN-list through the
        // closure above.
        self.invalidate_routing_index_for(&touched).await?;
        Ok(touched)
    }

    async fn invalidate_routing_index_for(&self, canonical_ids: &[i64]) -> Result<(), StoreError> {
        let ids = canonical_ids.to_vec();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                for id in &ids {
                    tx.execute("DELETE FROM routing_index WHERE canonical_id = ?1", rusqlite::params![id])?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(StoreError::from)
    }

    /// Retention-based pruning: delete raw metrics older than
    /// `retention` and mark long-inactive models. Idempotent; foreign keys
    /// are respected because inactive models are never deleted, only
    /// flagged, so alias/metric rows referencing them stay valid.
    pub async fn prune(&self, retention: Duration, inactivity: Duration) -> Result<PruneReport, StoreError> {
        let cutoff = (Utc::now() - retention).to_rfc3339();
        let deleted = self
            .conn
            .call(move |conn| {
                let deleted = conn.execute("DELETE FROM raw_metrics WHERE timestamp < ?1", rusqlite::params![cutoff])?;
                Ok(deleted)
            })
            .await
            .map_err(StoreError::from)?;
        let marked_inactive = self.mark_inactive_models(inactivity).await?;
        Ok(PruneReport { metrics_deleted: deleted, models_marked_inactive: marked_inactive })
    }

    // -----------------------------------------------------------------------
    // Model metrics view
    // -----------------------------------------------------------------------

    /// Most-recent non-null value per metric kind the scorer consumes.
    pub async fn get_model_metrics_view(&self, canonical_id: i64) -> Result<Option<ModelMetricsView>, StoreError> {
        let model = match self.get_canonical_model(canonical_id).await? {
            Some(m) => m,
            None => return Ok(None),
        };
        let view = self
            .conn
            .call(move |conn| {
                let latest = |kind: &str| -> rusqlite::Result<Option<f64>> {
                    conn.query_row(
                        "SELECT value FROM raw_metrics WHERE canonical_id = ?1 AND metric_type = ?2
                         ORDER BY timestamp DESC LIMIT 1",
                        rusqlite::params![canonical_id, kind],
                        |r| r.get(0),
                    )
                    .optional()
                };
                Ok(ModelMetricsView {
                    model_id: canonical_id,
                    model_name: String::new(),
                    elo_rating: latest("elo_rating")?,
                    benchmark_average: latest("benchmark_average")?,
                    latency_p90: latest("latency_p90")?,
                    ttft_p90: latest("ttft_p90")?,
                    cost_prompt_per_million: latest("cost_prompt_per_million")?,
                    cost_completion_per_million: latest("cost_completion_per_million")?,
                    cost_blended_per_million: latest("cost_blended_per_million")?,
                    context_length: None,
                })
            })
            .await
            .map_err(StoreError::from)?;
        Ok(Some(ModelMetricsView {
            model_name: model.name,
            context_length: model.context_length,
            ..view
        }))
    }

    pub async fn list_model_metrics_views(&self) -> Result<Vec<ModelMetricsView>, StoreError> {
        let catalog = self.load_canonical_catalog().await?;
        let mut out = Vec::with_capacity(catalog.len());
        for id in catalog.keys() {
            if let Some(view) = self.get_model_metrics_view(*id).await? {
                out.push(view);
            }
        }
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Source bookkeeping
    // -----------------------------------------------------------------------

    pub async fn record_ingest_attempt(
        &self,
        source: &str,
        url: Option<&str>,
        success: bool,
        error_message: Option<&str>,
        sync_interval_minutes: u32,
    ) -> Result<(), StoreError> {
        let source = source.to_string();
        let url = url.map(|s| s.to_string());
        let now = Utc::now().to_rfc3339();
        let error_message = error_message.map(|s| s.to_string());
        let status = if success { "ok" } else { "error" }.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO benchmark_sources (source, url, last_sync, last_success, status, error_message, sync_interval_minutes)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                     ON CONFLICT(source) DO UPDATE SET
                        url = excluded.url,
                        last_sync = excluded.last_sync,
                        last_success = CASE WHEN ?8 THEN excluded.last_sync ELSE benchmark_sources.last_success END,
                        status = excluded.status,
                        error_message = excluded.error_message,
                        sync_interval_minutes = excluded.sync_interval_minutes",
                    rusqlite::params![
                        source,
                        url,
                        now,
                        if success { Some(now.clone()) } else { None },
                        status,
                        error_message,
                        sync_interval_minutes,
                        success,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(StoreError::from)
    }

    pub async fn get_source_status(&self, source: &str) -> Result<Option<SourceStatus>, StoreError> {
        let source = source.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT source, url, last_sync, last_success, status, error_message, sync_interval_minutes
                     FROM benchmark_sources WHERE source = ?1",
                )?;
                let mut rows = stmt.query(rusqlite::params![source])?;
                match rows.next()? {
                    Some(row) => Ok(Some(SourceStatus {
                        source: row.get(0)?,
                        url: row.get(1)?,
                        last_sync: parse_optional_ts(row.get(2)?),
                        last_success: parse_optional_ts(row.get(3)?),
                        status: row.get(4)?,
                        error_message: row.get(5)?,
                        sync_interval_minutes: row.get(6)?,
                    })),
                    None => Ok(None),
                }
            })
            .await
            .map_err(StoreError::from)
    }

    // -----------------------------------------------------------------------
    // Routing events / routing index
    // -----------------------------------------------------------------------

    pub async fn record_routing_event(&self, event: RoutingEvent) -> Result<(), StoreError> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO routing_events (timestamp, model_selected, profile_used, routing_time_ms,
                        prompt_tokens, completion_tokens, total_tokens, estimated_cost, was_fallback, success, error_message)
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
                    rusqlite::params![
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
                Ok(())
            })
            .await
            .map_err(StoreError::from)
    }

    pub async fn upsert_routing_index(&self, canonical_id: i64, profile_name: &str, composite_score: f64) -> Result<(), StoreError> {
        let profile_name = profile_name.to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO routing_index (canonical_id, profile_name, composite_score, computed_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(canonical_id, profile_name) DO UPDATE SET
                        composite_score = excluded.composite_score, computed_at = excluded.computed_at",
                    rusqlite::params![canonical_id, profile_name, composite_score, now],
                )?;
                Ok(())
            })
            .await
            .map_err(StoreError::from)
    }

    pub async fn get_routing_index(&self, profile_name: &str) -> Result<Vec<(i64, f64)>, StoreError> {
        let profile_name = profile_name.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT canonical_id, composite_score FROM routing_index WHERE profile_name = ?1",
                )?;
                let rows = stmt.query_map(rusqlite::params![profile_name], |r| Ok((r.get(0)?, r.get(1)?)))?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row?);
                }
                Ok(out)
            })
            .await
            .map_err(StoreError::from)
    }

    pub async fn get_alias(&self, alias: &str) -> Result<Option<ModelAlias>, StoreError> {
        let alias_owned = alias.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT alias, canonical_id, confidence, reviewed, source FROM model_aliases WHERE alias = ?1",
                )?;
                let mut rows = stmt.query(rusqlite::params![alias_owned])?;
                match rows.next()? {
                    Some(row) => Ok(Some(ModelAlias {
                        alias: row.get(0)?,
                        canonical_id: row.get(1)?,
                        confidence: row.get(2)?,
                        reviewed: row.get::<_, i64>(3)? != 0,
                        source: row.get(4)?,
                    })),
                    None => Ok(None),
                }
            })
            .await
            .map_err(StoreError::from)
    }

    /// Resolve a medium-confidence alias review decision. Accepting leaves
    /// the alias as-is but flips `reviewed`; rejecting zeroes the
    /// confidence and flips `reviewed` so the alias is never used for
    /// resolution again. Historical metrics/events already attributed to
    /// the canonical model are left untouched either way.
    pub async fn resolve_alias_review(&self, alias: &str, accept: bool) -> Result<(), StoreError> {
        let alias = alias.to_string();
        self.conn
            .call(move |conn| {
                if accept {
                    conn.execute(
                        "UPDATE model_aliases SET reviewed = 1 WHERE alias = ?1",
                        rusqlite::params![alias],
                    )?;
                } else {
                    conn.execute(
                        "UPDATE model_aliases SET reviewed = 1, confidence = 0.0 WHERE alias = ?1",
                        rusqlite::params![alias],
                    )?;
                }
                Ok(())
            })
            .await
            .map_err(StoreError::from)
    }
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct PruneReport {
    pub metrics_deleted: usize,
    pub models_marked_inactive: usize,
}

fn row_to_canonical(row: &rusqlite::Row<'_>) -> rusqlite::Result<CanonicalModel> {
    Ok(CanonicalModel {
        id: row.get(0)?,
        name: row.get(1)?,
        provider: row.get(2)?,
        context_length: row.get(3)?,
        active: row.get::<_, i64>(4)? != 0,
    })
}

fn parse_optional_ts(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok()).map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_types::MetricKind;

    async fn store() -> MetricStore {
        MetricStore::new_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn first_metric_run_creates_a_canonical_model() {
        let store = store().await;
        let resolver = EntityResolver::default();
        let metrics = vec![RawMetric::new("gpt-4-turbo", MetricKind::EloRating, 1300.0, "arena")];
        let touched = store.record_source_metrics(&resolver, "arena", metrics).await.unwrap();
        assert_eq!(touched.len(), 1);
        let catalog = store.load_canonical_catalog().await.unwrap();
        assert_eq!(catalog.get(&touched[0]).map(String::as_str), Some("gpt-4-turbo"));
    }

    #[tokio::test]
    async fn second_run_with_same_name_reuses_canonical_id() {
        let store = store().await;
        let resolver = EntityResolver::default();
        let first = store
            .record_source_metrics(&resolver, "arena", vec![RawMetric::new("gpt-4-turbo", MetricKind::EloRating, 1300.0, "arena")])
            .await
            .unwrap();
        let second = store
            .record_source_metrics(&resolver, "arena", vec![RawMetric::new("gpt-4-turbo", MetricKind::EloRating, 1310.0, "arena")])
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn model_metrics_view_reflects_most_recent_value() {
        let store = store().await;
        let resolver = EntityResolver::default();
        let id = store
            .record_source_metrics(&resolver, "arena", vec![RawMetric::new("claude-x", MetricKind::EloRating, 1200.0, "arena")])
            .await
            .unwrap()[0];
        store
            .record_source_metrics(&resolver, "arena", vec![RawMetric::new("claude-x", MetricKind::EloRating, 1250.0, "arena")])
            .await
            .unwrap();
        let view = store.get_model_metrics_view(id).await.unwrap().unwrap();
        assert_eq!(view.elo_rating, Some(1250.0));
        assert_eq!(view.model_name, "claude-x");
    }

    #[tokio::test]
    async fn prune_deletes_metrics_older_than_retention_and_keeps_foreign_keys_valid() {
        let store = store().await;
        let resolver = EntityResolver::default();
        store
            .record_source_metrics(&resolver, "arena", vec![RawMetric::new("old-model", MetricKind::EloRating, 900.0, "arena")])
            .await
            .unwrap();
        let report = store.prune(Duration::seconds(-1), Duration::seconds(-1)).await.unwrap();
        assert_eq!(report.metrics_deleted, 1);
        assert_eq!(report.models_marked_inactive, 1);
    }

    #[tokio::test]
    async fn ingest_bookkeeping_round_trips() {
        let store = store().await;
        store.record_ingest_attempt("arena", Some("https://example.test"), true, None, 30).await.unwrap();
        let status = store.get_source_status("arena").await.unwrap().unwrap();
        assert_eq!(status.status, "ok");
        assert!(status.last_success.is_some());
    }

    #[tokio::test]
    async fn rejecting_alias_review_zeroes_confidence_but_keeps_alias_row() {
        let store = store().await;
        let resolver = EntityResolver::default();
        store
            .record_source_metrics(&resolver, "arena", vec![RawMetric::new("mystery-model", MetricKind::EloRating, 1000.0, "arena")])
            .await
            .unwrap();
        store.resolve_alias_review("mystery-model", false).await.unwrap();
        let alias = store.get_alias("mystery-model").await.unwrap().unwrap();
        assert_eq!(alias.confidence, 0.0);
        assert!(alias.reviewed);
    }
}
