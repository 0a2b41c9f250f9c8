//! Routing gateway binary: loads service config, opens the metric store,
//! wires admission/routing/streaming state, registers the benchmark-ingest
//! and retention-prune scheduler jobs, and serves the HTTP/WebSocket API.

use anyhow::{Context, Result};
use gateway_adapters::{arena::ArenaAdapter, leaderboard::LeaderboardAdapter, local_inference::LocalInferenceAdapter, pricing::PricingAdapter, AdapterFetcher, BenchmarkAdapter};
use gateway_cache::InProcessCache;
use gateway_admission::{BudgetManager, QuotaConfig, QuotaManager};
use gateway_analytics::AnalyticsCollector;
use gateway_api::http_api::{build_router, ApiState};
use gateway_api::producer::EchoProducer;
use gateway_core::{MetricStore, ServiceConfig};
use gateway_resolution::EntityResolver;
use gateway_routing::{CircuitBreakerConfig, CircuitBreakerRegistry, Router as GatewayRouter};
use gateway_scheduler::Scheduler;
use gateway_server::ingest::{adapter_job, prune_job};
use gateway_streaming::{CancellationRegistry, ConnectionManager};
use std::sync::Arc;
use tracing::info;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<()> {
    gateway_telemetry::logging::init_logging("gateway-server", "info");

    let config = ServiceConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        ServiceConfig::default()
    });

    let data_dir = expand_home(&config.storage.data_dir);
    std::fs::create_dir_all(&data_dir).with_context(|| format!("failed to create data dir {}", data_dir.display()))?;

    let store = Arc::new(MetricStore::new(data_dir.join("gateway.db")).await.context("failed to open metric store")?);
    let resolver = Arc::new(EntityResolver::default());

    let analytics = Arc::new(AnalyticsCollector::new(data_dir.join("analytics.db")).await.context("failed to open analytics store")?);
    let budget = Arc::new(BudgetManager::new(analytics.clone(), data_dir.join("budget.json")));
    let quota = Arc::new(QuotaManager::new(QuotaConfig::default()));

    let breakers = CircuitBreakerRegistry::new(CircuitBreakerConfig::default());
    let router = Arc::new(GatewayRouter::new(breakers));

    let connections = Arc::new(ConnectionManager::new(1000));
    let cancellations = Arc::new(CancellationRegistry::new());

    let scheduler = Scheduler::new(config.scheduler.worker_pool_size, data_dir.join("jobs.json")).build().await;

    let adapter_cache = Arc::new(InProcessCache::with_background_sweep(Some(256), std::time::Duration::from_secs(300)));
    let fetcher = Arc::new(AdapterFetcher::new(adapter_cache));

    let adapters: Vec<Arc<dyn BenchmarkAdapter>> = vec![
        Arc::new(PricingAdapter::new(config.adapters.pricing_url.clone(), fetcher.clone())),
        Arc::new(ArenaAdapter::new(config.adapters.arena_url.clone(), fetcher.clone())),
        Arc::new(LeaderboardAdapter::new(config.adapters.leaderboard_url.clone(), fetcher.clone())),
        Arc::new(LocalInferenceAdapter::new(config.adapters.local_inference_url.clone(), fetcher.clone())),
    ];
    for adapter in adapters {
        let interval = adapter.sync_interval_minutes();
        let job_id = format!("ingest:{}", adapter.source_tag());
        scheduler
            .add_job(job_id, adapter_job(adapter, store.clone(), resolver.clone()), interval, true)
            .await
            .context("failed to register benchmark ingest job")?;
    }
    scheduler
        .add_job("prune", prune_job(store.clone(), config.retention.clone()), config.scheduler.prune_interval_minutes, false)
        .await
        .context("failed to register prune job")?;

    let state = Arc::new(ApiState {
        store,
        router,
        quota,
        budget,
        analytics,
        connections,
        cancellations,
        producer: Arc::new(EchoProducer),
    });

    let api_key = std::env::var("GATEWAY_API_KEY").ok();
    let allowed_origins = std::env::var("GATEWAY_ALLOWED_ORIGINS")
        .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
        .unwrap_or_default();
    let app = build_router(state, api_key, allowed_origins);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await.with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("ctrl-c received, shutting down");
        })
        .await
        .context("server error")?;

    Ok(())
}

fn expand_home(path: &str) -> std::path::PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    std::path::PathBuf::from(path)
}
