/// User-visible connection status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    Connecting,
    /// Membership confirmed by the relay.
    Connected,
    Reconnecting,
    /// Full re-initialize after the channel gave up.
    Restarting { attempt: u32 },
    /// Restart budget exhausted. Only a new `initialize` recovers.
    Failed,
    Stopped,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Stopped)
    }
}
