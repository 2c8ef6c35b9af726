use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use voicebook::config::{AppConfig, StoreBackend};
use voicebook::db;
use voicebook::handlers;
use voicebook::services::directory::ProviderDirectory;
use voicebook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let directory = match &config.providers_file {
        Some(path) => {
            tracing::info!("loading provider directory from {path}");
            ProviderDirectory::from_file(path)?
        }
        None => ProviderDirectory::builtin(),
    };
    tracing::info!(providers = directory.all().len(), "provider directory ready");

    let state = match config.store_backend {
        StoreBackend::Sqlite => {
            tracing::info!("using SQLite store (path: {})", config.database_url);
            let conn = db::init_db(&config.database_url)?;
            conn.busy_timeout(config.store_timeout)?;
            AppState::sqlite(config.clone(), directory, conn)
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store, nothing will survive a restart");
            AppState::in_memory(config.clone(), directory)
        }
    };

    let app = handlers::router(Arc::new(state));

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
