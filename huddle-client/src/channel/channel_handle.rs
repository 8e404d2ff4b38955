use crate::channel::ChannelState;
use dashmap::DashMap;
use huddle_core::{ClientEvent, Frame, SessionIdentity};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error};

pub type EventHandler = Arc<dyn Fn(&Value) + Send + Sync>;

pub(crate) type HandlerMap = Arc<DashMap<String, Vec<EventHandler>>>;

#[derive(Debug)]
pub(crate) enum ChannelCommand {
    Send { json: String, negotiation: bool },
    Close,
}

/// Cloneable access to a running signaling channel.
#[derive(Clone)]
pub struct ChannelHandle {
    identity: Arc<SessionIdentity>,
    commands: mpsc::UnboundedSender<ChannelCommand>,
    state: watch::Receiver<ChannelState>,
    handlers: HandlerMap,
}

impl ChannelHandle {
    pub(crate) fn new(
        identity: Arc<SessionIdentity>,
        commands: mpsc::UnboundedSender<ChannelCommand>,
        state: watch::Receiver<ChannelState>,
        handlers: HandlerMap,
    ) -> Self {
        Self {
            identity,
            commands,
            state,
            handlers,
        }
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    pub fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    /// Resolves once the channel reaches `target`. Returns false if the
    /// channel driver is gone first.
    pub async fn wait_for_state(&self, target: ChannelState) -> bool {
        let mut state = self.state.clone();
        state.wait_for(|current| *current == target).await.is_ok()
    }

    /// Registers a handler for a named inbound event. Handlers receive the
    /// raw `data` payload, for known and unknown events alike.
    pub fn on<F>(&self, event: impl Into<String>, handler: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.handlers
            .entry(event.into())
            .or_default()
            .push(Arc::new(handler));
    }

    pub fn send(&self, event: ClientEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => self.push(json, ClientEvent::is_negotiation_event(event.name())),
            Err(e) => error!("Failed to serialize {} event: {}", event.name(), e),
        }
    }

    /// Sends an arbitrary named event.
    pub fn emit(&self, event: impl Into<String>, payload: Value) {
        let frame = Frame::new(event, payload);
        match serde_json::to_string(&frame) {
            Ok(json) => self.push(json, ClientEvent::is_negotiation_event(&frame.event)),
            Err(e) => error!("Failed to serialize {} event: {}", frame.event, e),
        }
    }

    pub fn close(&self) {
        let _ = self.commands.send(ChannelCommand::Close);
    }

    fn push(&self, json: String, negotiation: bool) {
        let command = ChannelCommand::Send { json, negotiation };
        if self.commands.send(command).is_err() {
            debug!("Signaling channel is gone, dropping outbound frame");
        }
    }
}
