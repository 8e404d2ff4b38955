use huddle_core::{ConnectionId, ServerEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Idle,
    Connecting,
    Open,
    Closed,
    /// Reconnection budget exhausted.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The relay closed the socket.
    Remote,
    /// Transport error while open.
    Error(String),
}

/// Notifications from the channel driver to its owner, in transport order.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// A new connection is open and `join_room` has been written on it.
    Opened { connection: ConnectionId },
    Closed {
        connection: ConnectionId,
        reason: CloseReason,
    },
    ConnectError { attempt: u32, error: String },
    Failed { attempts: u32 },
    Message(ServerEvent),
}
