use crate::channel::{ChannelEvent, ChannelHandle, ChannelState, SignalingChannel};
use crate::config::SessionConfig;
use crate::error::ChannelError;
use crate::locator::{TransportLocator, websocket_url};
use crate::media::LocalMedia;
use crate::negotiation::NegotiationCoordinator;
use crate::presence::RoomPresence;
use crate::session::session_controller::SessionSignals;
use crate::session::{SessionCommand, SessionObserver, SessionStatus};
use crate::transport::PeerConnector;
use huddle_core::{RoomId, SdpType, ServerEvent, SessionIdentity, UserId};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

enum Outcome {
    Shutdown,
    ChannelFailed(String),
}

/// Background loop of one initialized session.
pub(crate) struct SessionTask {
    identity: SessionIdentity,
    config: SessionConfig,
    observer: Arc<dyn SessionObserver>,
    connector: Arc<dyn PeerConnector>,
    media: LocalMedia,
    signals: Arc<SessionSignals>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
}

impl SessionTask {
    pub(crate) fn new(
        identity: SessionIdentity,
        config: SessionConfig,
        observer: Arc<dyn SessionObserver>,
        connector: Arc<dyn PeerConnector>,
        media: LocalMedia,
        signals: Arc<SessionSignals>,
        commands: mpsc::UnboundedReceiver<SessionCommand>,
    ) -> Self {
        Self {
            identity,
            config,
            observer,
            connector,
            media,
            signals,
            commands,
        }
    }

    pub(crate) async fn run(mut self) {
        info!("Session loop started for {}", self.identity.user_id());
        let mut restarts: u32 = 0;

        loop {
            let status = match restarts {
                0 => SessionStatus::Connecting,
                attempt => SessionStatus::Restarting { attempt },
            };
            self.set_status(status);

            let reason = match self.run_once().await {
                Outcome::Shutdown => break,
                Outcome::ChannelFailed(reason) => reason,
            };
            self.signals.channel.send_replace(None);

            if self
                .config
                .max_restarts
                .is_some_and(|max| restarts >= max)
            {
                error!(
                    "Giving up on room {} after {} restarts: {}",
                    self.identity.room(),
                    restarts,
                    reason
                );
                self.observer.on_notice(
                    "Unable to reach the interview room. Check your connection and rejoin.",
                );
                self.set_status(SessionStatus::Failed);
                return;
            }

            let backoff = self.config.restart_backoff;
            warn!("Signaling lost ({}), restarting in {:?}", reason, backoff);
            self.observer.on_notice(&format!(
                "Connection to the interview room lost. Retrying in {} seconds.",
                backoff.as_secs()
            ));
            restarts += 1;

            if self.interruptible(tokio::time::sleep(backoff)).await.is_none() {
                break;
            }
        }

        self.set_status(SessionStatus::Stopped);
        info!("Session loop finished for {}", self.identity.user_id());
    }

    /// Locates an endpoint and serves one channel until it fails for good.
    async fn run_once(&mut self) -> Outcome {
        let locator =
            TransportLocator::new(self.config.endpoints.clone(), self.config.probe_timeout);
        let Some(located) = self.interruptible(locator.locate()).await else {
            return Outcome::Shutdown;
        };
        let Some(base) = located else {
            return Outcome::ChannelFailed(ChannelError::NoEndpoint.to_string());
        };

        let url = match websocket_url(&base, &self.identity) {
            Ok(url) => url,
            Err(e) => return Outcome::ChannelFailed(e.to_string()),
        };

        let (channel, events) =
            SignalingChannel::connect(url, self.identity.clone(), self.config.channel.clone());
        self.signals.channel.send_replace(Some(channel.clone()));

        let outcome = self.drive(&channel, events).await;
        channel.close();
        outcome
    }

    async fn drive(
        &mut self,
        channel: &ChannelHandle,
        mut events: mpsc::UnboundedReceiver<ChannelEvent>,
    ) -> Outcome {
        let mut presence = RoomPresence::new(self.identity.clone(), self.config.initiator);
        let (mut negotiation, mut peer_events) = NegotiationCoordinator::new(
            &self.identity,
            self.connector.clone(),
            self.media.clone(),
            self.observer.clone(),
        );

        let outcome = loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(SessionCommand::Renegotiate(peer)) => {
                        if channel.state() == ChannelState::Open {
                            negotiation.on_negotiation_needed(&peer, channel).await;
                        } else {
                            debug!("Ignoring renegotiate with {} while disconnected", peer);
                        }
                    }
                    Some(SessionCommand::Rejoin) => {
                        // Peers treat our join as a new session and start over.
                        negotiation.close_all().await;
                        presence.join(channel).await;
                    }
                    Some(SessionCommand::Shutdown) | None => break Outcome::Shutdown,
                },

                evt = events.recv() => match evt {
                    Some(ChannelEvent::Failed { attempts }) => {
                        break Outcome::ChannelFailed(format!("gave up after {attempts} attempts"));
                    }
                    Some(event) => {
                        self.on_channel_event(event, channel, &mut presence, &mut negotiation)
                            .await;
                    }
                    None => break Outcome::ChannelFailed("signaling channel stopped".into()),
                },

                Some(evt) = peer_events.recv() => {
                    negotiation.on_peer_event(evt, channel).await;
                }
            }
        };

        negotiation.close_all().await;
        presence.on_closed();
        self.signals.membership.send_replace(None);
        outcome
    }

    async fn on_channel_event(
        &self,
        event: ChannelEvent,
        channel: &ChannelHandle,
        presence: &mut RoomPresence,
        negotiation: &mut NegotiationCoordinator,
    ) {
        match event {
            ChannelEvent::Opened { connection } => {
                debug!("Connection {} open, awaiting room_joined", connection);
                presence.on_open(connection);
            }
            ChannelEvent::Closed { connection, reason } => {
                info!("Connection {} closed: {:?}", connection, reason);
                presence.on_closed();
                self.signals.membership.send_replace(None);
                // The relay announces our departure, so every peer starts over.
                negotiation.close_all().await;
                self.set_status(SessionStatus::Reconnecting);
            }
            ChannelEvent::ConnectError { attempt, error } => {
                debug!("Connect attempt {} failed: {}", attempt, error);
                self.set_status(SessionStatus::Reconnecting);
            }
            ChannelEvent::Failed { .. } => {}
            ChannelEvent::Message(event) => {
                self.on_server_event(event, channel, presence, negotiation)
                    .await;
            }
        }
    }

    async fn on_server_event(
        &self,
        event: ServerEvent,
        channel: &ChannelHandle,
        presence: &mut RoomPresence,
        negotiation: &mut NegotiationCoordinator,
    ) {
        match event {
            ServerEvent::RoomJoined(ack) => {
                let Some(membership) = presence.on_room_joined(&ack).cloned() else {
                    return;
                };
                self.signals.membership.send_replace(Some(membership.clone()));
                self.observer.on_room_joined(&membership);
                self.set_status(SessionStatus::Connected);
            }

            ServerEvent::UserJoined(joined) => {
                if presence.is_self(&joined.user_id) {
                    return;
                }
                info!("{} ({}) joined", joined.user_name, joined.user_id);
                // A join from a known peer is a new session on its side.
                if negotiation.peer(&joined.user_id).is_some() {
                    debug!("{} rejoined, dropping its previous connection", joined.user_id);
                    negotiation.on_peer_left(&joined.user_id).await;
                }
                self.observer.on_user_joined(&joined);

                if presence.on_user_joined(&joined) {
                    negotiation
                        .on_negotiation_needed(&joined.user_id, channel)
                        .await;
                }
            }

            ServerEvent::UserLeft(left) => {
                let Some(user_id) = presence.on_user_left(&left) else {
                    return;
                };
                info!("{} left", user_id);
                negotiation.on_peer_left(&user_id).await;
                self.signals
                    .membership
                    .send_replace(presence.membership().cloned());
                self.observer.on_user_left(&user_id);
            }

            ServerEvent::ReceiveMessage(chat) => self.observer.on_chat(&chat),

            ServerEvent::Offer(envelope) => {
                let Some(from) = self.sender_of(&envelope.room, &envelope.from, &envelope.to)
                else {
                    return;
                };
                if envelope.description.sdp_type != SdpType::Offer {
                    warn!("Offer from {} carries a {:?}", from, envelope.description.sdp_type);
                    return;
                }
                negotiation
                    .on_remote_offer(&from, envelope.description, channel)
                    .await;
            }

            ServerEvent::Answer(envelope) => {
                let Some(from) = self.sender_of(&envelope.room, &envelope.from, &envelope.to)
                else {
                    return;
                };
                if envelope.description.sdp_type != SdpType::Answer {
                    warn!("Answer from {} carries a {:?}", from, envelope.description.sdp_type);
                    return;
                }
                negotiation
                    .on_remote_answer(&from, envelope.description, channel)
                    .await;
            }

            ServerEvent::IceCandidate(envelope) => {
                let Some(from) = self.sender_of(&envelope.room, &envelope.from, &envelope.to)
                else {
                    return;
                };
                negotiation
                    .on_remote_ice_candidate(&from, envelope.candidate)
                    .await;
            }
        }
    }

    /// The remote sender of a negotiation envelope meant for this session.
    fn sender_of(
        &self,
        room: &RoomId,
        from: &Option<UserId>,
        to: &Option<UserId>,
    ) -> Option<UserId> {
        if room != self.identity.room() {
            debug!("Ignoring envelope for room {}", room);
            return None;
        }
        if to.as_ref().is_some_and(|to| to != self.identity.user_id()) {
            return None;
        }
        match from {
            Some(from) if from == self.identity.user_id() => None,
            Some(from) => Some(from.clone()),
            None => {
                warn!("Ignoring envelope without a sender");
                None
            }
        }
    }

    /// Drives `fut` while only honouring shutdown requests.
    async fn interruptible<F: Future>(&mut self, fut: F) -> Option<F::Output> {
        tokio::pin!(fut);
        loop {
            tokio::select! {
                out = &mut fut => return Some(out),
                cmd = self.commands.recv() => match cmd {
                    Some(SessionCommand::Shutdown) | None => return None,
                    Some(other) => debug!("Ignoring {:?} while not connected", other),
                },
            }
        }
    }

    fn set_status(&self, status: SessionStatus) {
        self.signals.set_status(status, self.observer.as_ref());
    }
}
