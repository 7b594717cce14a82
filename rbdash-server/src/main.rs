//! rbdash server - reproducible-build dashboard API

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rbdash_core::config::DashboardConfig;
use rbdash_core::log::LogStore;

use rbdash_server::{router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rbdash_server=info,rbdash_core=info,tower_http=info")),
        )
        .init();

    let config_path = std::env::var("RBDASH_CONFIG").ok().map(PathBuf::from);
    let config = DashboardConfig::load_or_default(config_path.as_deref())?;
    info!("tracking {} applications", config.apps.len());

    let store = LogStore::with_http_source(&config)?;
    // Warm the cache so the first dashboard load does not pay fetch latency.
    store.warm().await;

    let state = AppState::new(config, store);
    let app = router(state);

    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()
        .unwrap_or(3000);
    let addr = std::env::var("RBDASH_ADDR").unwrap_or_else(|_| format!("0.0.0.0:{port}"));
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
