// src/main.rs
//! Newsdesk backend -- binary entrypoint. Boots tracing, config, the SQLite
//! store, and the Axum HTTP server with the Prometheus endpoint mounted
//! alongside the API.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use newsdesk::api::{create_router, AppState};
use newsdesk::config::AppConfig;
use newsdesk::metrics::Metrics;
use newsdesk::store::ContentStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("newsdesk=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();

    let config = AppConfig::load()?;

    let store = ContentStore::connect(&config.database.url)
        .await
        .with_context(|| format!("connect to {}", config.database.url))?;
    store.init_schema().await.context("initialize schema")?;
    info!(url = %config.database.url, "database ready");

    let metrics = Metrics::init();

    let bind = config.server.bind.clone();
    let state = AppState::new(config, store);
    let app = create_router(state).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("bind {bind}"))?;
    info!(%bind, "newsdesk listening");

    axum::serve(listener, app).await?;
    Ok(())
}
