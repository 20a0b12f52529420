mod api;
mod economy;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use common::config::Config;
use common::store::CsvStore;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(Config::default_config_path);
    tracing::info!(path = %config_path, "loading config");
    let config = Config::load(&config_path)?;

    let store = Arc::new(CsvStore::open(&config.storage.data_dir)?);
    let state = api::AppState::new(
        store,
        config.economy.clone(),
        Duration::from_secs(config.storage.matches_cache_ttl_secs),
    );
    let app = api::router(state).layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(addr = %addr, "prediction companion server starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
