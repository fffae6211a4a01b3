//! Cardcast Deck Gateway
//!
//! A REST gateway that serves Cardcast decks through an in-memory
//! fetch-through cache. Each deck is assembled from two catalog calls
//! (its cards, then its metadata) and cached as one object for a
//! configurable TTL.
//!
//! # Architecture
//!
//! - **Domain**: deck models, error taxonomy, the `DeckSource` trait
//! - **Application**: the fetch-through `DeckCache`
//! - **Infrastructure**: the Cardcast HTTP client
//! - **API**: HTTP handlers, routing, and middleware
//!
//! # Configuration
//!
//! The gateway is configured via `config.yaml` and environment variables:
//! - `CONFIG_PATH`: config file location (default: config.yaml)
//! - `PORT`: overrides `server.port`
//! - `CARDCAST_BASE_URL`: overrides `catalog.base_url`
//! - `DECK_CACHE_TTL_SECONDS`: overrides `cache.ttl_seconds`
//! - `RUST_LOG`: Logging level (default: info)
//! - `LOG_FORMAT`: `json` for structured logs, anything else for text
//!
//! # Quick Start
//!
//! ```bash
//! cargo run --release
//!
//! curl http://localhost:3010/health
//! curl http://localhost:3010/v1/decks/CAHBS
//! curl -X DELETE http://localhost:3010/v1/decks/CAHBS
//! ```

use anyhow::Context;
use cardcast_deck_gateway::api::routes::create_router;
use cardcast_deck_gateway::api::state::AppState;
use cardcast_deck_gateway::application::DeckCache;
use cardcast_deck_gateway::config::Config;
use cardcast_deck_gateway::infrastructure::CardcastClient;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::env;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let env_filter = EnvFilter::new(env::var("RUST_LOG").unwrap_or_else(|_| "info".into()));

    if log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Load Config
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
    let mut config = Config::load(&config_path)?;
    config.apply_env_overrides();

    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    // Infrastructure
    let client = CardcastClient::from_config(&config.catalog)?;
    let catalog_url = client.base_url().to_string();
    tracing::info!("Cardcast catalog: {}", catalog_url);

    // Application
    let deck_cache = Arc::new(DeckCache::new(Arc::new(client), config.cache.ttl_seconds));

    let state = AppState {
        deck_cache,
        catalog_url,
        metrics: Some(metrics_handle),
    };

    let app = create_router(state, &config.server.allowed_origins);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to address {}", addr))?;
    tracing::info!("Cardcast deck gateway running at http://{}", addr);

    // Graceful shutdown handling
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error during operation")?;

    Ok(())
}

/// Wait for SIGTERM or SIGINT (Ctrl+C) to initiate graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}
