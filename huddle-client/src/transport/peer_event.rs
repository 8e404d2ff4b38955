use huddle_core::{IceCandidate, UserId};

/// Identifies one peer connection instance. A superseded connection for the
/// same user carries an older generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerKey {
    pub user_id: UserId,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}

/// Inbound remote media, identified by the stream it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStream {
    pub stream_id: String,
    pub track_id: String,
    pub kind: MediaKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Callbacks from a peer connection, funneled into the session loop.
#[derive(Debug, Clone)]
pub enum PeerEvent {
    CandidateGenerated(PeerKey, IceCandidate),
    TrackReceived(PeerKey, RemoteStream),
    StateChanged(PeerKey, PeerState),
}

impl PeerEvent {
    pub fn key(&self) -> &PeerKey {
        match self {
            Self::CandidateGenerated(key, _)
            | Self::TrackReceived(key, _)
            | Self::StateChanged(key, _) => key,
        }
    }
}
