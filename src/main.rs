mod app;
mod config;
mod errors;
mod extractors;
mod handlers;
mod middleware;
mod models;
mod repositories;
mod services;

use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use crate::{
    app::{build_router, AppState},
    config::{Config, StorageBackend},
    repositories::{wait_for_redis, MemoryRepository, RedisRepository},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let state = match config.storage.backend {
        StorageBackend::Redis => {
            let redis_client = Arc::new(
                redis::Client::open(config.redis.url.as_str())
                    .context("Invalid Redis URL")?,
            );

            if let Err(e) = wait_for_redis(&redis_client, &config.redis).await {
                if config.is_development() {
                    tracing::error!("Redis unavailable in development mode, exiting: {}", e);
                    std::process::exit(1);
                }
                tracing::error!("Redis unavailable, serving anyway: {}", e);
            }

            AppState::new(RedisRepository::new(redis_client), config.clone())
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            AppState::new(MemoryRepository::new(), config.clone())
        }
    };

    let app = build_router(state);

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind server to {}", address))?;

    tracing::info!("Server running on {}", address);
    axum::serve(listener, app.into_make_service())
        .await
        .context("Failed to start server")?;

    Ok(())
}
