//! Newsroom - admin service for news articles and venues

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use newsroom::{
    api::{self, AppState},
    config::{BackendDriver, Config},
    gateway::{GraphqlClient, HttpObjectStorage, MemoryBackend},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "newsroom=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Newsroom admin service...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    let state = match config.backend.driver {
        BackendDriver::Graphql => {
            let client = Arc::new(GraphqlClient::new(&config.backend)?);
            let storage = Arc::new(HttpObjectStorage::from_client(&client));
            tracing::info!(endpoint = %config.backend.endpoint, "Using GraphQL backend");
            AppState::new(&config, client.clone(), client.clone(), client, storage)
        }
        BackendDriver::Memory => {
            // Demo mode: in-process content with a few seeded entries
            let backend = Arc::new(MemoryBackend::with_demo_data().await);
            tracing::info!("Using in-memory demo backend");
            AppState::new(&config, backend.clone(), backend.clone(), backend.clone(), backend)
        }
    };

    let cors_origin = config
        .server
        .cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin: {}", config.server.cors_origin))?;

    // Build router
    let app = api::build_router(state, cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
