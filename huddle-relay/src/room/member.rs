use axum::extract::ws::Message;
use huddle_core::{ConnectionId, RoomId, UserId};
use tokio::sync::mpsc;

/// A participant as the relay knows it: one socket, one room.
#[derive(Debug, Clone)]
pub struct Member {
    pub user_id: UserId,
    pub user_name: String,
    pub is_interviewer: bool,
    pub connection: ConnectionId,
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Where a socket has joined, kept by its handler for routing and cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub room: RoomId,
    pub user_id: UserId,
}
