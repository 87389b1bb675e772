mod auth;
mod backend;
mod config;
mod errors;
mod relay;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::backend::BackendClient;
use crate::config::Config;
use crate::relay::connector::WebSocketConnector;
use crate::relay::{Relay, RelaySettings};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting relay API v{}", env!("CARGO_PKG_VERSION"));

    // Relay: one WebSocket connection per generation call
    let relay = Relay::new(RelaySettings::from(&config), Arc::new(WebSocketConnector));
    info!(
        "Relay configured: orchestrator={} path={} timeout={}s",
        config.orchestrator_url,
        config.orchestrator_ws_path,
        config.relay_timeout.as_secs()
    );

    let backend = BackendClient::new(&config.backend_api_url);
    info!("Backend client initialized ({})", config.backend_api_url);

    let state = AppState { relay, backend };

    let app = build_router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
