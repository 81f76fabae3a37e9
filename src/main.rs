use std::sync::Arc;

use anyhow::{Context, Result};
use skycache::{router, WeatherQueries};
use skycache_core::Config;
use skycache_weather::{OpenWeatherProvider, SqliteRecordStore, WeatherCache};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; real deployments use the environment.
    dotenvy::dotenv().ok();

    skycache_core::init()?;

    let (config, _warnings) = Config::load_validated()?;

    let store = SqliteRecordStore::open(&config.database.path)
        .context("Failed to open weather store")?;
    let provider = OpenWeatherProvider::from_config(&config.provider)
        .context("Failed to create weather provider")?;

    let cache = WeatherCache::new(Arc::new(store), Arc::new(provider))
        .with_inflight_dedupe(config.cache.dedupe_inflight);
    let app = router(Arc::new(WeatherQueries::new(Arc::new(cache))));

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;

    tracing::info!("SkyCache listening on {}", config.server.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("SkyCache stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
