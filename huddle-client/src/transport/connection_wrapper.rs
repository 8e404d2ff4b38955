use crate::error::NegotiationError;
use crate::media::LocalMedia;
use crate::transport::{
    MediaKind, PeerConfig, PeerConnection, PeerConnector, PeerEvent, PeerKey, PeerState,
    RemoteStream,
};
use async_trait::async_trait;
use huddle_core::{IceCandidate, SdpType, SessionDescription};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::track::track_local::TrackLocal;

/// A `webrtc` peer connection towards one room participant.
pub struct ConnectionWrapper {
    pub key: PeerKey,
    pub peer_connection: Arc<RTCPeerConnection>,
}

impl ConnectionWrapper {
    /// Builds the connection, attaches local tracks and wires callbacks into
    /// `event_tx`.
    pub async fn new(
        key: PeerKey,
        config: &PeerConfig,
        media: &LocalMedia,
        event_tx: mpsc::UnboundedSender<PeerEvent>,
    ) -> Result<Self, NegotiationError> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        for track in media.tracks() {
            let track: Arc<dyn TrackLocal + Send + Sync> = track;
            let sender = peer_connection.add_track(track).await?;

            // RTCP has to be drained for interceptors to work.
            tokio::spawn(async move {
                let mut buf = vec![0u8; 1500];
                while sender.read(&mut buf).await.is_ok() {}
            });
        }

        let state_tx = event_tx.clone();
        let state_key = key.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let key = state_key.clone();

                Box::pin(async move {
                    info!("Peer connection to {} is {:?}", key.user_id, s);
                    let state = match s {
                        RTCPeerConnectionState::Connecting => PeerState::Connecting,
                        RTCPeerConnectionState::Connected => PeerState::Connected,
                        RTCPeerConnectionState::Disconnected => PeerState::Disconnected,
                        RTCPeerConnectionState::Failed => PeerState::Failed,
                        RTCPeerConnectionState::Closed => PeerState::Closed,
                        _ => PeerState::New,
                    };
                    let _ = tx.send(PeerEvent::StateChanged(key, state));
                })
            },
        ));

        let ice_tx = event_tx.clone();
        let ice_key = key.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let key = ice_key.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let candidate = IceCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_m_line_index: init.sdp_mline_index,
                    username_fragment: init.username_fragment,
                };
                let _ = tx.send(PeerEvent::CandidateGenerated(key, candidate));
            })
        }));

        let track_tx = event_tx;
        let track_key = key.clone();
        peer_connection.on_track(Box::new(move |track, _receiver, _transceiver| {
            let tx = track_tx.clone();
            let key = track_key.clone();

            Box::pin(async move {
                let kind = match track.kind() {
                    RTPCodecType::Audio => MediaKind::Audio,
                    _ => MediaKind::Video,
                };
                let stream = RemoteStream {
                    stream_id: track.stream_id(),
                    track_id: track.id(),
                    kind,
                };
                debug!("Remote {:?} track from {}", kind, key.user_id);
                let _ = tx.send(PeerEvent::TrackReceived(key, stream));
            })
        }));

        Ok(Self {
            key,
            peer_connection,
        })
    }
}

fn to_rtc(desc: SessionDescription) -> Result<RTCSessionDescription, NegotiationError> {
    let rtc = match desc.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(desc.sdp)?,
        SdpType::Answer => RTCSessionDescription::answer(desc.sdp)?,
    };
    Ok(rtc)
}

#[async_trait]
impl PeerConnection for ConnectionWrapper {
    async fn create_offer(&self) -> Result<SessionDescription, NegotiationError> {
        let offer = self.peer_connection.create_offer(None).await?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription, NegotiationError> {
        let answer = self.peer_connection.create_answer(None).await?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_local_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), NegotiationError> {
        self.peer_connection
            .set_local_description(to_rtc(desc)?)
            .await?;
        Ok(())
    }

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), NegotiationError> {
        self.peer_connection
            .set_remote_description(to_rtc(desc)?)
            .await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), NegotiationError> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment,
        };
        self.peer_connection.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), NegotiationError> {
        self.peer_connection.close().await?;
        Ok(())
    }
}

/// Production connector backed by the `webrtc` crate.
#[derive(Clone, Default)]
pub struct WebRtcConnector {
    config: PeerConfig,
}

impl WebRtcConnector {
    pub fn new(config: PeerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PeerConnector for WebRtcConnector {
    async fn connect(
        &self,
        key: PeerKey,
        media: &LocalMedia,
        events: mpsc::UnboundedSender<PeerEvent>,
    ) -> Result<Arc<dyn PeerConnection>, NegotiationError> {
        let wrapper = ConnectionWrapper::new(key, &self.config, media, events).await?;
        Ok(Arc::new(wrapper))
    }
}
