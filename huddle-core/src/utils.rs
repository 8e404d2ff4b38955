/// Port the signaling relay listens on unless configured otherwise.
pub const DEFAULT_SIGNALING_PORT: u16 = 5002;

/// Path of the WebSocket endpoint on the relay.
pub const SIGNALING_PATH: &str = "/ws";

/// Lightweight liveness endpoint probed before connecting.
pub const LIVENESS_PATH: &str = "/socket-test";

pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_2: &str = "stun:stun1.l.google.com:19302";
