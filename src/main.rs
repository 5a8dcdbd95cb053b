//! Scoreline - Resilient cricket standings backend
//!
//! Keeps a durable standings store in sync with an unreliable upstream
//! provider on a schedule, and serves reads through a graceful-degradation
//! chain so a read never fails, even with the provider or the store down.

use anyhow::{Context, Result};
use scoreline_backend::{
    api::{self, ApiState},
    cache::EphemeralCache,
    fallback::FallbackChain,
    models::Config,
    reconciler::Reconciler,
    scheduler::SyncScheduler,
    store::StandingsStore,
    upstream::CricketApiClient,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("🏏 Scoreline backend starting");

    // Missing required configuration is fatal here, before anything is
    // spawned; it is not retried or swallowed.
    let config = Config::from_env().context("Invalid configuration")?;
    info!(
        series = config.tracked_series.len(),
        db = %config.database_path,
        "Configuration loaded"
    );

    let store = Arc::new(
        StandingsStore::open(&config.database_path)
            .with_context(|| format!("Failed to open database at {}", config.database_path))?,
    );

    let source = Arc::new(
        CricketApiClient::new(
            config.api_base.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.fetch_timeout_secs),
        )
        .context("Failed to build upstream client")?,
    );

    let reconciler = Arc::new(Reconciler::new(source, store.clone()));
    let cache = Arc::new(EphemeralCache::new());
    let chain = Arc::new(FallbackChain::new(store.clone(), cache));

    let scheduler = SyncScheduler::start(
        reconciler.clone(),
        store.clone(),
        config.tracked_series.clone(),
        Duration::from_secs(config.sync_interval_hours * 3600),
        config.max_age_hours,
    );

    let app = api::router(ApiState {
        chain,
        reconciler,
        store,
    });

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("🎯 API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    scheduler.stop().await;
    info!("Scoreline backend stopped");

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scoreline_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
