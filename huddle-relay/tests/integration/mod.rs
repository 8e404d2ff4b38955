
use std::net::SocketAddr;

use huddle_relay::{RelayService, serve};
use tokio::net::TcpListener;
use tracing::Level;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Runs a relay on a loopback port for the rest of the test.
pub async fn start_relay() -> (SocketAddr, RelayService) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let service = RelayService::new();

    let relay = service.clone();
    tokio::spawn(async move {
        if let Err(e) = serve(listener, relay).await {
            tracing::warn!("Relay stopped: {}", e);
        }
    });

    (addr, service)
}
