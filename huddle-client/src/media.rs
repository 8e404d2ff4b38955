use crate::transport::MediaKind;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

struct LocalTrack {
    kind: MediaKind,
    track: Arc<TrackLocalStaticSample>,
    enabled: AtomicBool,
}

struct MediaInner {
    tracks: Vec<LocalTrack>,
    released: AtomicBool,
}

/// The session's capture tracks. Every peer connection attaches the same
/// tracks; they are released once, when the session ends.
#[derive(Clone)]
pub struct LocalMedia {
    inner: Arc<MediaInner>,
}

impl LocalMedia {
    /// Receive-only session.
    pub fn none() -> Self {
        Self::from_tracks(Vec::new())
    }

    /// One Opus audio and one VP8 video track in the same stream.
    pub fn audio_video(stream_id: &str) -> Self {
        let audio = TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                ..Default::default()
            },
            "audio".to_owned(),
            stream_id.to_owned(),
        );
        let video = TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                ..Default::default()
            },
            "video".to_owned(),
            stream_id.to_owned(),
        );

        Self::from_tracks(vec![
            (MediaKind::Audio, Arc::new(audio)),
            (MediaKind::Video, Arc::new(video)),
        ])
    }

    fn from_tracks(tracks: Vec<(MediaKind, Arc<TrackLocalStaticSample>)>) -> Self {
        let tracks = tracks
            .into_iter()
            .map(|(kind, track)| LocalTrack {
                kind,
                track,
                enabled: AtomicBool::new(true),
            })
            .collect();

        Self {
            inner: Arc::new(MediaInner {
                tracks,
                released: AtomicBool::new(false),
            }),
        }
    }

    /// Tracks to attach to a new peer connection. Empty once released.
    pub fn tracks(&self) -> Vec<Arc<TrackLocalStaticSample>> {
        if self.is_released() {
            return Vec::new();
        }
        self.inner.tracks.iter().map(|t| t.track.clone()).collect()
    }

    pub fn track_ids(&self) -> Vec<String> {
        self.tracks().iter().map(|t| t.id().to_owned()).collect()
    }

    pub fn is_enabled(&self, kind: MediaKind) -> Option<bool> {
        self.find(kind).map(|t| t.enabled.load(Ordering::SeqCst))
    }

    pub fn set_enabled(&self, kind: MediaKind, enabled: bool) {
        if let Some(track) = self.find(kind) {
            track.enabled.store(enabled, Ordering::SeqCst);
            info!("Local {:?} {}", kind, if enabled { "on" } else { "off" });
        }
    }

    /// Flips the track and returns the new state; `None` without such a track.
    pub fn toggle(&self, kind: MediaKind) -> Option<bool> {
        let track = self.find(kind)?;
        let enabled = !track.enabled.fetch_xor(true, Ordering::SeqCst);
        info!("Local {:?} {}", kind, if enabled { "on" } else { "off" });
        Some(enabled)
    }

    /// Feeds captured media to every attached peer. Muted or released tracks
    /// swallow the sample.
    pub async fn write_sample(&self, kind: MediaKind, sample: &Sample) -> Result<(), webrtc::Error> {
        if self.is_released() {
            return Ok(());
        }
        let Some(track) = self.find(kind) else {
            return Ok(());
        };
        if !track.enabled.load(Ordering::SeqCst) {
            return Ok(());
        }
        track.track.write_sample(sample).await
    }

    pub fn release(&self) {
        if !self.inner.released.swap(true, Ordering::SeqCst) {
            debug!("Local media released");
        }
    }

    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::SeqCst)
    }

    fn find(&self, kind: MediaKind) -> Option<&LocalTrack> {
        self.inner.tracks.iter().find(|t| t.kind == kind)
    }
}
