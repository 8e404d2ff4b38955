use crate::error::NegotiationError;
use crate::media::LocalMedia;
use crate::transport::{PeerEvent, PeerKey};
use async_trait::async_trait;
use huddle_core::{IceCandidate, SessionDescription};
use std::sync::Arc;
use tokio::sync::mpsc;

/// The operations negotiation needs from a peer connection.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription, NegotiationError>;

    async fn create_answer(&self) -> Result<SessionDescription, NegotiationError>;

    async fn set_local_description(&self, desc: SessionDescription)
    -> Result<(), NegotiationError>;

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), NegotiationError>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), NegotiationError>;

    async fn close(&self) -> Result<(), NegotiationError>;
}

/// Creates peer connections with the local media attached.
#[async_trait]
pub trait PeerConnector: Send + Sync {
    async fn connect(
        &self,
        key: PeerKey,
        media: &LocalMedia,
        events: mpsc::UnboundedSender<PeerEvent>,
    ) -> Result<Arc<dyn PeerConnection>, NegotiationError>;
}
