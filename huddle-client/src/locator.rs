use crate::error::ChannelError;
use huddle_core::SessionIdentity;
use huddle_core::utils::{LIVENESS_PATH, SIGNALING_PATH};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Ordered signaling endpoint candidates for a page: same scheme and host,
/// plain http on the same host, then localhost.
pub fn candidates_for_page(page: Option<&Url>, port: u16) -> Vec<Url> {
    let mut raw = Vec::with_capacity(3);

    if let Some(page) = page {
        let host = page.host_str().unwrap_or("localhost");
        let scheme = match page.scheme() {
            "https" | "wss" => "https",
            _ => "http",
        };
        raw.push(format!("{scheme}://{host}:{port}"));
        raw.push(format!("http://{host}:{port}"));
    }
    raw.push(format!("http://localhost:{port}"));

    let mut candidates: Vec<Url> = Vec::with_capacity(raw.len());
    for candidate in raw {
        match Url::parse(&candidate) {
            Ok(url) if !candidates.contains(&url) => candidates.push(url),
            Ok(_) => {}
            Err(e) => warn!("Skipping malformed endpoint candidate {}: {}", candidate, e),
        }
    }
    candidates
}

/// Signaling WebSocket address for `base`, with the identity attached as
/// connection metadata.
pub fn websocket_url(base: &Url, identity: &SessionIdentity) -> Result<Url, ChannelError> {
    let mut url = base.clone();

    let scheme = match base.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(ChannelError::InvalidUrl {
                url: base.to_string(),
                reason: format!("unsupported scheme {other}"),
            });
        }
    };
    url.set_scheme(scheme).map_err(|_| ChannelError::InvalidUrl {
        url: base.to_string(),
        reason: "cannot switch to websocket scheme".into(),
    })?;

    url.set_path(SIGNALING_PATH);
    url.query_pairs_mut()
        .clear()
        .extend_pairs(identity.connection_metadata());

    Ok(url)
}

/// Picks the first signaling endpoint that answers a liveness probe.
#[derive(Debug, Clone)]
pub struct TransportLocator {
    candidates: Vec<Url>,
    probe_timeout: Duration,
    http: reqwest::Client,
}

impl TransportLocator {
    pub fn new(candidates: Vec<Url>, probe_timeout: Duration) -> Self {
        Self {
            candidates,
            probe_timeout,
            http: reqwest::Client::new(),
        }
    }

    /// Locator over the candidates derived from `page`.
    pub fn for_page(page: &Url, port: u16, probe_timeout: Duration) -> Self {
        Self::new(candidates_for_page(Some(page), port), probe_timeout)
    }

    pub fn candidates(&self) -> &[Url] {
        &self.candidates
    }

    /// Never fails: when nothing answers the first candidate is assumed, the
    /// channel's reconnection policy does the rest. `None` only for an empty
    /// candidate list.
    pub async fn locate(&self) -> Option<Url> {
        for candidate in &self.candidates {
            if self.is_reachable(candidate).await {
                info!("Signaling endpoint {} is reachable", candidate);
                return Some(candidate.clone());
            }
        }

        let fallback = self.candidates.first().cloned();
        if let Some(url) = &fallback {
            warn!("No signaling endpoint answered, assuming {}", url);
        }
        fallback
    }

    async fn is_reachable(&self, base: &Url) -> bool {
        let Ok(probe) = base.join(LIVENESS_PATH) else {
            return false;
        };

        match self
            .http
            .get(probe.clone())
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(e) => {
                debug!("Probe {} failed: {}", probe, e);
                false
            }
        }
    }
}
