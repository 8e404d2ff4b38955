use crate::presence::InitiatorPolicy;
use huddle_core::utils::DEFAULT_SIGNALING_PORT;
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Reconnection policy and buffering for the signaling channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Consecutive failed connection attempts tolerated before the channel
    /// reports a terminal failure. Reset after every successful open.
    pub reconnect_attempts: u32,
    pub reconnect_delay: Duration,
    pub connect_timeout: Duration,
    /// Frames kept while the transport is not open. Oldest are dropped first.
    pub outbound_buffer: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            reconnect_attempts: 5,
            reconnect_delay: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(10),
            outbound_buffer: 64,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Ordered signaling endpoint candidates handed to the locator.
    pub endpoints: Vec<Url>,
    pub probe_timeout: Duration,
    pub channel: ChannelConfig,
    pub initiator: InitiatorPolicy,
    /// Delay before a full re-initialize after the channel gave up.
    pub restart_backoff: Duration,
    /// `None` retries forever.
    pub max_restarts: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoints: crate::locator::candidates_for_page(None, DEFAULT_SIGNALING_PORT),
            probe_timeout: Duration::from_secs(2),
            channel: ChannelConfig::default(),
            initiator: InitiatorPolicy::default(),
            restart_backoff: Duration::from_secs(3),
            max_restarts: Some(3),
        }
    }
}

impl SessionConfig {
    /// Endpoint candidates derived from the page the session runs on.
    pub fn for_page(page: &Url, port: u16) -> Self {
        Self {
            endpoints: crate::locator::candidates_for_page(Some(page), port),
            ..Self::default()
        }
    }

    /// Defaults overridden by `HUDDLE_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        let port = env_parse::<u16>("HUDDLE_SIGNALING_PORT").unwrap_or(DEFAULT_SIGNALING_PORT);

        match env_value("HUDDLE_SIGNALING_URL").map(|raw| Url::parse(&raw)) {
            Some(Ok(url)) => config.endpoints = vec![url],
            Some(Err(e)) => warn!("Ignoring HUDDLE_SIGNALING_URL: {}", e),
            None => config.endpoints = crate::locator::candidates_for_page(None, port),
        }

        if let Some(attempts) = env_parse::<u32>("HUDDLE_RECONNECT_ATTEMPTS") {
            config.channel.reconnect_attempts = attempts;
        }

        if let Some(raw) = env_value("HUDDLE_MAX_RESTARTS") {
            config.max_restarts = if raw.eq_ignore_ascii_case("unlimited") {
                None
            } else {
                match raw.parse() {
                    Ok(max) => Some(max),
                    Err(e) => {
                        warn!("Ignoring HUDDLE_MAX_RESTARTS={}: {}", raw, e);
                        config.max_restarts
                    }
                }
            };
        }

        config
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_value(key).and_then(|v| v.parse().ok())
}
