//! Herdcache server binary.

use std::sync::Arc;

use anyhow::Context;
use herdcache_core::StaticSource;
use herdcache_lock::LockManager;
use herdcache_server::metrics::init_metrics;
use herdcache_server::{AppState, CacheOrchestrator, Settings, StoreBackend, run_server};
use herdcache_store::{MemoryStore, RedisStore, RemoteStore};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load().context("failed to load settings")?;
    let addr = settings.server.addr()?;

    tracing::info!("Starting herdcache server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        strategy = %settings.cache.strategy,
        lock_scope = %settings.cache.lock_scope,
        prefix = %settings.cache.prefix,
        "Cache configured"
    );

    let prometheus = init_metrics().context("failed to install metrics recorder")?;

    let store: Arc<dyn RemoteStore> = match settings.store.backend {
        StoreBackend::Redis => {
            tracing::info!("Connecting to Redis at {}", settings.store.redis_url);
            let store = RedisStore::connect(&settings.store.redis_url)
                .await
                .context("failed to connect to Redis")?;
            Arc::new(store)
        },
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; locks only exclude within this process");
            Arc::new(MemoryStore::new())
        },
    };

    let source = Arc::new(StaticSource::reference());
    let locks = LockManager::new(store.clone(), settings.lock.clone());
    let cache = CacheOrchestrator::new(store, source, locks, settings.cache.clone())
        .with_polling(settings.polling.clone());

    let state = AppState::new(Arc::new(cache));
    run_server(addr, state, prometheus).await?;

    Ok(())
}
