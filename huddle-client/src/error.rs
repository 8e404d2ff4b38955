use huddle_core::IdentityError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("invalid signaling url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("connect timed out after {0:?}")]
    Timeout(Duration),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("no signaling endpoint configured")]
    NoEndpoint,
}

#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("webrtc error: {0}")]
    WebRtc(#[from] webrtc::Error),

    #[error("peer connection rejected the operation: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid identity: {0}")]
    Identity(#[from] IdentityError),

    #[error("session is not initialized")]
    NotInitialized,

    #[error("session has stopped")]
    Stopped,
}
