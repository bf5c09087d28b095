use anyhow::Context;
use std::sync::Arc;

use propview_server::host::SqliteHost;
use propview_server::{AppConfig, AppState, build_router, storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "propview_server=info,tower_http=info".into()),
        )
        .init();

    let config = AppConfig::from_env();
    tracing::info!("data directory: {}", config.data_dir.display());

    // Initialize database
    let db = storage::init_db(&config.data_dir)?;
    tracing::info!("database initialized");

    let host = Arc::new(SqliteHost::new(db.clone()));
    let port = config.port;
    let base_url = config.base_url.clone();
    let app = build_router(AppState::new(db, host, config));

    tracing::info!("starting server at {base_url}");

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .with_context(|| format!("binding port {port}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
