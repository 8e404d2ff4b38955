use crate::room::Seat;
use crate::signaling::RelayService;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use huddle_core::{ClientEvent, ConnectionId};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Identity metadata a client attaches to the upgrade request. Informational
/// only: membership comes from `join_room`.
#[derive(Debug, Default, Deserialize)]
pub struct ConnectMeta {
    pub room: Option<String>,
    pub user_id: Option<String>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(meta): Query<ConnectMeta>,
    State(service): State<RelayService>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, meta, service))
}

async fn handle_socket(socket: WebSocket, meta: ConnectMeta, service: RelayService) {
    let connection = ConnectionId::new();
    info!(
        "New WebSocket connection {} (room {:?}, user {:?})",
        connection, meta.room, meta.user_id
    );

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut seat: Option<Seat> = None;

    loop {
        tokio::select! {
            _ = (&mut send_task) => break,

            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ClientEvent>(text.as_str()) {
                        Ok(event) => {
                            debug!("{} -> {}", connection, event.name());
                            service.handle(connection, &tx, &mut seat, event);
                        }
                        Err(e) => warn!("Invalid event from {}: {}", connection, e),
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket error on {}: {}", connection, e);
                    break;
                }
            },
        }
    }

    send_task.abort();
    service.disconnect(connection, seat);
    info!("WebSocket disconnected: {}", connection);
}
