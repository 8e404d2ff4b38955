use crate::signaling::{RelayService, ws_handler};
use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use huddle_core::utils::{DEFAULT_SIGNALING_PORT, LIVENESS_PATH, SIGNALING_PATH};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind: SocketAddr,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], DEFAULT_SIGNALING_PORT)),
        }
    }
}

pub fn router(service: RelayService) -> Router {
    Router::new()
        .route(LIVENESS_PATH, get(|| async { "ok" }))
        .route(SIGNALING_PATH, get(ws_handler))
        .with_state(service)
}

/// Serves the relay on an already bound listener until the task is dropped.
pub async fn serve(listener: TcpListener, service: RelayService) -> Result<()> {
    let addr = listener.local_addr()?;
    info!("Signaling relay listening on {}", addr);

    axum::serve(listener, router(service))
        .await
        .context("Relay server stopped")
}

pub async fn run(config: RelayConfig) -> Result<()> {
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;

    serve(listener, RelayService::new()).await
}
