//! Main HTTP Gateway Server.

use anyhow::{Context, Result};
use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use manasik_agent::RelayHandler;

use crate::chat_api;
use crate::health_api;
use crate::sessions_api;

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    pub relay: Arc<RelayHandler>,
    pub started_at: Instant,
}

impl GatewayState {
    pub fn new(relay: RelayHandler) -> Self {
        Self {
            relay: Arc::new(relay),
            started_at: Instant::now(),
        }
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/chat", post(chat_api::chat))
        .route("/api/health", get(health_api::get_health))
        .route(
            "/api/sessions/:id",
            get(sessions_api::get_session).delete(sessions_api::delete_session),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the gateway until Ctrl-C.
#[instrument(skip(state))]
pub async fn start_server(addr: SocketAddr, state: GatewayState) -> Result<()> {
    let app = build_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Gateway HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
