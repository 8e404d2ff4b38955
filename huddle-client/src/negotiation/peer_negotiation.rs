use crate::transport::{PeerConnection, PeerKey};
use huddle_core::{IceCandidate, SessionDescription};
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationPhase {
    Idle,
    HaveLocalOffer,
    HaveRemoteOffer,
    HaveRemoteAnswer,
    Stable,
    /// A description or candidate was rejected. Waits for a fresh
    /// negotiation-needed trigger or remote offer.
    Failed,
}

/// Offer/answer progress with one remote participant.
pub struct PeerNegotiation {
    pub(crate) key: PeerKey,
    pub(crate) connection: Arc<dyn PeerConnection>,
    pub(crate) phase: NegotiationPhase,
    pub(crate) local_description: Option<SessionDescription>,
    pub(crate) remote_description: Option<SessionDescription>,
    pub(crate) pending_candidates: VecDeque<IceCandidate>,
    pub(crate) applied_candidates: usize,
    pub(crate) renegotiate: bool,
    /// A colliding remote offer was ignored; its candidates are dropped until
    /// the answer to our own offer is applied.
    pub(crate) ignoring_offer: bool,
    pub(crate) rendered_stream: Option<String>,
}

impl PeerNegotiation {
    pub(crate) fn new(key: PeerKey, connection: Arc<dyn PeerConnection>) -> Self {
        Self {
            key,
            connection,
            phase: NegotiationPhase::Idle,
            local_description: None,
            remote_description: None,
            pending_candidates: VecDeque::new(),
            applied_candidates: 0,
            renegotiate: false,
            ignoring_offer: false,
            rendered_stream: None,
        }
    }

    pub fn key(&self) -> &PeerKey {
        &self.key
    }

    pub fn phase(&self) -> NegotiationPhase {
        self.phase
    }

    pub fn local_description(&self) -> Option<&SessionDescription> {
        self.local_description.as_ref()
    }

    pub fn remote_description(&self) -> Option<&SessionDescription> {
        self.remote_description.as_ref()
    }

    pub fn pending_candidates(&self) -> usize {
        self.pending_candidates.len()
    }

    pub fn applied_candidates(&self) -> usize {
        self.applied_candidates
    }

    pub fn is_renegotiation_pending(&self) -> bool {
        self.renegotiate
    }

    pub fn is_ignoring_offer(&self) -> bool {
        self.ignoring_offer
    }

    pub fn rendered_stream(&self) -> Option<&str> {
        self.rendered_stream.as_deref()
    }
}
