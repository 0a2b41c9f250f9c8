//! Scheduler job bodies: one benchmark-adapter ingest per source plus the
//! metric-retention prune, both registered onto the shared [`Scheduler`]
//! by `main`.

use gateway_adapters::BenchmarkAdapter;
use gateway_core::config::RetentionConfig;
use gateway_core::MetricStore;
use gateway_resolution::EntityResolver;
use gateway_scheduler::JobFn;
use std::sync::Arc;

/// Wraps one adapter's fetch→validate→parse→store pipeline as a job body.
///
/// When an adapter is backed by a configured URL, its `fetch` already goes
/// through `AdapterFetcher::fetch_json`, which retries transient failures
/// via `fetch_with_retry` and falls back to a stale cached payload before
/// giving up. So the `Err` this sees is already final — this layer does not
/// retry again, it just records the attempt and moves on to the next
/// scheduled tick.
pub fn adapter_job(adapter: Arc<dyn BenchmarkAdapter>, store: Arc<MetricStore>, resolver: Arc<EntityResolver>) -> JobFn {
    let interval = adapter.sync_interval_minutes();
    Arc::new(move || {
        let adapter = adapter.clone();
        let store = store.clone();
        let resolver = resolver.clone();
        Box::pin(async move {
            let source = adapter.source_tag().to_string();
            let outcome = adapter.fetch().await;
            let raw = match outcome {
                Ok(raw) => raw,
                Err(e) => {
                    let _ = store.record_ingest_attempt(&source, None, false, Some(&e.to_string()), interval).await;
                    return Err(e.to_string());
                }
            };
            if !adapter.validate(&raw) {
                let msg = "payload failed validation".to_string();
                let _ = store.record_ingest_attempt(&source, None, false, Some(&msg), interval).await;
                return Err(msg);
            }
            let metrics = adapter.parse(&raw).map_err(|e| e.to_string())?;
            let count = metrics.len();
            store
                .record_source_metrics(&resolver, &source, metrics)
                .await
                .map_err(|e| e.to_string())?;
            store.record_ingest_attempt(&source, None, true, None, interval).await.map_err(|e| e.to_string())?;
            tracing::info!(source = %source, metrics = count, "benchmark ingest completed");
            Ok(())
        })
    })
}

/// Deletes raw metrics older than `retention.metric_retention_days` and
/// marks models with no recent activity inactive (spec §4.5).
pub fn prune_job(store: Arc<MetricStore>, retention: RetentionConfig) -> JobFn {
    Arc::new(move || {
        let store = store.clone();
        let retention = retention.clone();
        Box::pin(async move {
            let report = store
                .prune(chrono::Duration::days(retention.metric_retention_days), chrono::Duration::days(retention.model_inactivity_days))
                .await
                .map_err(|e| e.to_string())?;
            tracing::info!(
                metrics_deleted = report.metrics_deleted,
                models_marked_inactive = report.models_marked_inactive,
                "retention prune completed"
            );
            Ok(())
        })
    })
}
