use crate::presence::RoomMembership;
use crate::session::SessionStatus;
use crate::transport::{PeerState, RemoteStream};
use huddle_core::{ChatMessage, UserId, UserJoined};

/// UI callbacks of a session. Called from the session task; implementations
/// must not block.
pub trait SessionObserver: Send + Sync {
    fn on_status(&self, _status: SessionStatus) {}

    fn on_room_joined(&self, _membership: &RoomMembership) {}

    fn on_user_joined(&self, _joined: &UserJoined) {}

    fn on_user_left(&self, _user_id: &UserId) {}

    fn on_chat(&self, _message: &ChatMessage) {}

    /// A peer's remote stream changed and should be rendered.
    fn on_remote_stream(&self, _peer: &UserId, _stream: &RemoteStream) {}

    fn on_peer_state(&self, _peer: &UserId, _state: PeerState) {}

    /// Human-readable notice for connection trouble.
    fn on_notice(&self, _notice: &str) {}
}

pub struct NoopObserver;

impl SessionObserver for NoopObserver {}
