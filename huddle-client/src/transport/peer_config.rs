use huddle_core::IceServerConfig;
use huddle_core::utils::{DEFAULT_STUN_ADDR, DEFAULT_STUN_ADDR_2};

/// Peer connection settings for the webrtc backend.
#[derive(Debug, Clone)]
pub struct PeerConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig {
                urls: vec![DEFAULT_STUN_ADDR.to_owned(), DEFAULT_STUN_ADDR_2.to_owned()],
                username: None,
                credential: None,
            }],
        }
    }
}

impl PeerConfig {
    /// No ICE servers: host candidates only. Used on loopback.
    pub fn local_only() -> Self {
        Self {
            ice_servers: Vec::new(),
        }
    }
}
