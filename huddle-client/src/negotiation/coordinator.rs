use crate::error::NegotiationError;
use crate::media::LocalMedia;
use crate::negotiation::{NegotiationPhase, PeerNegotiation, SignalingOutput};
use crate::session::SessionObserver;
use crate::transport::{PeerConnector, PeerEvent, PeerKey, RemoteStream};
use huddle_core::{IceCandidate, RoomId, SessionDescription, SessionIdentity, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Drives one offer/answer/ICE exchange per remote participant.
///
/// All methods run on the session loop, so negotiations for the same peer
/// never interleave. A stale negotiation is cancelled by replacing its state;
/// events from the replaced connection are recognised by their generation and
/// dropped.
pub struct NegotiationCoordinator {
    local: UserId,
    room: RoomId,
    connector: Arc<dyn PeerConnector>,
    media: LocalMedia,
    observer: Arc<dyn SessionObserver>,
    events_tx: mpsc::UnboundedSender<PeerEvent>,
    peers: HashMap<UserId, PeerNegotiation>,
    parked: HashMap<UserId, Vec<IceCandidate>>,
    next_generation: u64,
}

impl NegotiationCoordinator {
    pub fn new(
        identity: &SessionIdentity,
        connector: Arc<dyn PeerConnector>,
        media: LocalMedia,
        observer: Arc<dyn SessionObserver>,
    ) -> (Self, mpsc::UnboundedReceiver<PeerEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let coordinator = Self {
            local: identity.user_id().clone(),
            room: identity.room().clone(),
            connector,
            media,
            observer,
            events_tx,
            peers: HashMap::new(),
            parked: HashMap::new(),
            next_generation: 0,
        };
        (coordinator, events_rx)
    }

    pub fn peer(&self, user_id: &UserId) -> Option<&PeerNegotiation> {
        self.peers.get(user_id)
    }

    pub fn phase(&self, user_id: &UserId) -> Option<NegotiationPhase> {
        self.peers.get(user_id).map(|state| state.phase)
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn parked_candidates(&self, user_id: &UserId) -> usize {
        self.parked.get(user_id).map_or(0, Vec::len)
    }

    /// Starts a local offer, unless one is already in flight for this peer,
    /// in which case exactly one follow-up offer is sent once it settles.
    pub async fn on_negotiation_needed(&mut self, peer: &UserId, output: &dyn SignalingOutput) {
        match self.phase(peer) {
            Some(
                NegotiationPhase::HaveLocalOffer
                | NegotiationPhase::HaveRemoteOffer
                | NegotiationPhase::HaveRemoteAnswer,
            ) => {
                if let Some(state) = self.peers.get_mut(peer) {
                    state.renegotiate = true;
                }
                debug!("Negotiation with {} in flight, deferring", peer);
                return;
            }
            Some(NegotiationPhase::Idle | NegotiationPhase::Stable) => {}
            Some(NegotiationPhase::Failed) | None => {
                if let Err(e) = self.create_peer(peer).await {
                    error!("Failed to create peer connection for {}: {}", peer, e);
                    return;
                }
            }
        }

        self.send_offer(peer, output).await;
    }

    pub async fn on_remote_offer(
        &mut self,
        from: &UserId,
        offer: SessionDescription,
        output: &dyn SignalingOutput,
    ) {
        let recreate = match self.phase(from) {
            None | Some(NegotiationPhase::Failed | NegotiationPhase::HaveRemoteOffer) => true,
            Some(NegotiationPhase::HaveLocalOffer) => {
                if !self.is_polite_towards(from) {
                    info!("Offer collision with {}, keeping local offer", from);
                    if let Some(state) = self.peers.get_mut(from) {
                        state.ignoring_offer = true;
                        state.pending_candidates.clear();
                    }
                    return;
                }
                info!("Offer collision with {}, yielding", from);
                true
            }
            Some(
                NegotiationPhase::Idle
                | NegotiationPhase::Stable
                | NegotiationPhase::HaveRemoteAnswer,
            ) => false,
        };

        if recreate {
            if let Err(e) = self.create_peer(from).await {
                error!("Failed to create peer connection for {}: {}", from, e);
                return;
            }
        }

        let room = self.room.clone();
        let Some(state) = self.peers.get_mut(from) else {
            return;
        };
        state.phase = NegotiationPhase::HaveRemoteOffer;

        let connection = state.connection.clone();
        if let Err(e) = connection.set_remote_description(offer.clone()).await {
            warn!("Rejected offer from {}: {}", from, e);
            state.phase = NegotiationPhase::Failed;
            return;
        }
        state.remote_description = Some(offer);

        if !Self::drain_candidates(state).await {
            return;
        }

        let answer: Result<SessionDescription, NegotiationError> = async {
            let answer = connection.create_answer().await?;
            connection.set_local_description(answer.clone()).await?;
            Ok(answer)
        }
        .await;

        match answer {
            Ok(answer) => {
                state.local_description = Some(answer.clone());
                state.phase = NegotiationPhase::Stable;
                info!("Sending answer to {}", from);
                output.send_answer(room, from.clone(), answer).await;
            }
            Err(e) => {
                warn!("Failed to answer {}: {}", from, e);
                state.phase = NegotiationPhase::Failed;
                return;
            }
        }

        let resume = state.renegotiate;
        if resume {
            self.on_negotiation_needed(from, output).await;
        }
    }

    pub async fn on_remote_answer(
        &mut self,
        from: &UserId,
        answer: SessionDescription,
        output: &dyn SignalingOutput,
    ) {
        let Some(state) = self.peers.get_mut(from) else {
            warn!("Answer from {} without a negotiation", from);
            return;
        };
        if state.phase != NegotiationPhase::HaveLocalOffer {
            warn!("Unexpected answer from {} while {:?}", from, state.phase);
            return;
        }

        let connection = state.connection.clone();
        if let Err(e) = connection.set_remote_description(answer.clone()).await {
            warn!("Rejected answer from {}: {}", from, e);
            state.phase = NegotiationPhase::Failed;
            return;
        }
        state.remote_description = Some(answer);
        state.ignoring_offer = false;
        state.phase = NegotiationPhase::HaveRemoteAnswer;

        if !Self::drain_candidates(state).await {
            return;
        }
        state.phase = NegotiationPhase::Stable;
        info!("Negotiation with {} is stable", from);

        let resume = state.renegotiate;
        if resume {
            self.on_negotiation_needed(from, output).await;
        }
    }

    /// Applies a remote candidate, or queues it until a remote description
    /// exists. Queued candidates keep arrival order.
    pub async fn on_remote_ice_candidate(&mut self, from: &UserId, candidate: IceCandidate) {
        let Some(state) = self.peers.get_mut(from) else {
            debug!("Parking ICE candidate from {} until negotiation starts", from);
            self.parked.entry(from.clone()).or_default().push(candidate);
            return;
        };

        if state.phase == NegotiationPhase::Failed {
            debug!("Dropping ICE candidate from {}: negotiation failed", from);
            return;
        }
        if state.ignoring_offer {
            debug!("Dropping ICE candidate from {}: belongs to an ignored offer", from);
            return;
        }
        if state.remote_description.is_none() {
            state.pending_candidates.push_back(candidate);
            return;
        }

        match state.connection.add_ice_candidate(candidate).await {
            Ok(()) => state.applied_candidates += 1,
            Err(e) => {
                warn!("Failed to apply ICE candidate from {}: {}", from, e);
                state.phase = NegotiationPhase::Failed;
            }
        }
    }

    pub async fn on_local_ice_candidate(
        &mut self,
        peer: &UserId,
        candidate: IceCandidate,
        output: &dyn SignalingOutput,
    ) {
        debug!("Sending ICE candidate to {}", peer);
        output
            .send_ice(self.room.clone(), peer.clone(), candidate)
            .await;
    }

    pub async fn on_peer_event(&mut self, event: PeerEvent, output: &dyn SignalingOutput) {
        let key = event.key();
        if self.peers.get(&key.user_id).map(|state| state.key.generation) != Some(key.generation) {
            debug!("Dropping event from superseded connection {:?}", key);
            return;
        }

        match event {
            PeerEvent::CandidateGenerated(key, candidate) => {
                self.on_local_ice_candidate(&key.user_id, candidate, output)
                    .await;
            }
            PeerEvent::TrackReceived(key, stream) => self.on_remote_track(&key.user_id, stream),
            PeerEvent::StateChanged(key, state) => self.observer.on_peer_state(&key.user_id, state),
        }
    }

    /// Destroys the negotiation with a departed participant.
    pub async fn on_peer_left(&mut self, peer: &UserId) {
        self.parked.remove(peer);
        if self.discard(peer).await {
            info!("Closed peer connection with {}", peer);
        }
    }

    pub async fn close_all(&mut self) {
        self.parked.clear();
        for (peer, state) in self.peers.drain() {
            if let Err(e) = state.connection.close().await {
                warn!("Error closing peer connection with {}: {}", peer, e);
            }
        }
    }

    fn on_remote_track(&mut self, peer: &UserId, stream: RemoteStream) {
        let Some(state) = self.peers.get_mut(peer) else {
            return;
        };
        if state.rendered_stream.as_deref() == Some(stream.stream_id.as_str()) {
            debug!("Stream {} from {} already rendered", stream.stream_id, peer);
            return;
        }
        state.rendered_stream = Some(stream.stream_id.clone());
        self.observer.on_remote_stream(peer, &stream);
    }

    async fn send_offer(&mut self, peer: &UserId, output: &dyn SignalingOutput) {
        let room = self.room.clone();
        let Some(state) = self.peers.get_mut(peer) else {
            return;
        };

        let connection = state.connection.clone();
        let offer: Result<SessionDescription, NegotiationError> = async {
            let offer = connection.create_offer().await?;
            connection.set_local_description(offer.clone()).await?;
            Ok(offer)
        }
        .await;

        match offer {
            Ok(offer) => {
                state.local_description = Some(offer.clone());
                state.phase = NegotiationPhase::HaveLocalOffer;
                state.renegotiate = false;
                info!("Sending offer to {}", peer);
                output.send_offer(room, peer.clone(), offer).await;
            }
            Err(e) => {
                warn!("Failed to create offer for {}: {}", peer, e);
                state.phase = NegotiationPhase::Failed;
            }
        }
    }

    /// Replaces any existing negotiation with a fresh connection.
    async fn create_peer(&mut self, peer: &UserId) -> Result<(), NegotiationError> {
        self.discard(peer).await;

        self.next_generation += 1;
        let key = PeerKey {
            user_id: peer.clone(),
            generation: self.next_generation,
        };
        let connection = self
            .connector
            .connect(key.clone(), &self.media, self.events_tx.clone())
            .await?;

        let mut state = PeerNegotiation::new(key, connection);
        if let Some(parked) = self.parked.remove(peer) {
            debug!("Handing {} parked candidates to {}", parked.len(), peer);
            state.pending_candidates.extend(parked);
        }
        self.peers.insert(peer.clone(), state);
        Ok(())
    }

    async fn discard(&mut self, peer: &UserId) -> bool {
        let Some(state) = self.peers.remove(peer) else {
            return false;
        };
        if let Err(e) = state.connection.close().await {
            warn!("Error closing peer connection with {}: {}", peer, e);
        }
        true
    }

    async fn drain_candidates(state: &mut PeerNegotiation) -> bool {
        while let Some(candidate) = state.pending_candidates.pop_front() {
            if let Err(e) = state.connection.add_ice_candidate(candidate).await {
                warn!(
                    "Failed to apply queued ICE candidate from {}: {}",
                    state.key.user_id, e
                );
                state.phase = NegotiationPhase::Failed;
                return false;
            }
            state.applied_candidates += 1;
        }
        true
    }

    /// The lexicographically smaller user id yields on offer collision.
    fn is_polite_towards(&self, remote: &UserId) -> bool {
        self.local < *remote
    }
}
