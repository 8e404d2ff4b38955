use crate::channel::channel_handle::{ChannelCommand, EventHandler, HandlerMap};
use crate::channel::{ChannelEvent, ChannelHandle, ChannelState, CloseReason};
use crate::config::ChannelConfig;
use crate::error::ChannelError;
use dashmap::DashMap;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use huddle_core::{ClientEvent, ConnectionId, Frame, JoinRoom, ServerEvent, SessionIdentity};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;
type WsReader = SplitStream<WsStream>;

/// Always-reconnecting event channel to the signaling relay.
pub struct SignalingChannel;

impl SignalingChannel {
    /// Spawns the channel driver and returns immediately. Lifecycle
    /// notifications and typed inbound events arrive on the returned receiver.
    pub fn connect(
        url: Url,
        identity: SessionIdentity,
        config: ChannelConfig,
    ) -> (ChannelHandle, mpsc::UnboundedReceiver<ChannelEvent>) {
        let identity = Arc::new(identity);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ChannelState::Idle);
        let handlers: HandlerMap = Arc::new(DashMap::new());

        let handle = ChannelHandle::new(identity.clone(), command_tx, state_rx, handlers.clone());

        let driver = ChannelDriver {
            url,
            identity,
            config,
            commands: command_rx,
            events: event_tx,
            state: state_tx,
            handlers,
            backlog: VecDeque::new(),
        };
        tokio::spawn(driver.run());

        (handle, event_rx)
    }
}

enum Interrupted {
    Closed,
}

struct ChannelDriver {
    url: Url,
    identity: Arc<SessionIdentity>,
    config: ChannelConfig,
    commands: mpsc::UnboundedReceiver<ChannelCommand>,
    events: mpsc::UnboundedSender<ChannelEvent>,
    state: watch::Sender<ChannelState>,
    handlers: HandlerMap,
    backlog: VecDeque<String>,
}

impl ChannelDriver {
    async fn run(mut self) {
        info!("Signaling channel started for {}", self.url);
        let mut failures: u32 = 0;

        loop {
            self.set_state(ChannelState::Connecting);

            let timeout = self.config.connect_timeout;
            let url = self.url.to_string();
            let attempt = self
                .buffer_until(tokio::time::timeout(timeout, connect_async(url)))
                .await;

            let result = match attempt {
                Err(Interrupted::Closed) => break,
                Ok(Ok(Ok((ws, _response)))) => Ok(ws),
                Ok(Ok(Err(e))) => Err(ChannelError::WebSocket(e)),
                Ok(Err(_elapsed)) => Err(ChannelError::Timeout(timeout)),
            };

            match result {
                Ok(ws) => {
                    failures = 0;
                    match self.serve(ws).await {
                        Some(()) => {}
                        None => break,
                    }
                }
                Err(e) => {
                    failures += 1;
                    warn!(
                        "Signaling connect attempt {}/{} failed: {}",
                        failures, self.config.reconnect_attempts, e
                    );
                    self.notify(ChannelEvent::ConnectError {
                        attempt: failures,
                        error: e.to_string(),
                    });

                    if failures >= self.config.reconnect_attempts {
                        error!("Signaling reconnection budget exhausted after {} attempts", failures);
                        self.backlog.clear();
                        self.set_state(ChannelState::Failed);
                        self.notify(ChannelEvent::Failed { attempts: failures });
                        return;
                    }
                }
            }

            let delay = self.config.reconnect_delay;
            if self.buffer_until(tokio::time::sleep(delay)).await.is_err() {
                break;
            }
        }

        self.set_state(ChannelState::Closed);
        info!("Signaling channel closed locally");
    }

    /// Runs one open connection. `None` means the owner closed the channel.
    async fn serve(&mut self, ws: WsStream) -> Option<()> {
        let connection = ConnectionId::new();
        let (mut writer, mut reader) = ws.split();

        if let Err(e) = self.open(&mut writer).await {
            warn!("Connection {} failed during open: {}", connection, e);
            self.set_state(ChannelState::Closed);
            self.notify(ChannelEvent::Closed {
                connection,
                reason: CloseReason::Error(e.to_string()),
            });
            return Some(());
        }

        info!("Signaling connection {} open", connection);
        self.set_state(ChannelState::Open);
        self.notify(ChannelEvent::Opened { connection });

        match self.pump(&mut writer, &mut reader).await {
            Ok(reason) => {
                warn!("Signaling connection {} dropped: {:?}", connection, reason);
                self.set_state(ChannelState::Closed);
                self.notify(ChannelEvent::Closed { connection, reason });
                Some(())
            }
            Err(Interrupted::Closed) => {
                let _ = writer.close().await;
                None
            }
        }
    }

    /// Writes `join_room` first, then whatever queued up while disconnected.
    async fn open(&mut self, writer: &mut WsWriter) -> Result<(), ChannelError> {
        let join = ClientEvent::JoinRoom(JoinRoom::from(self.identity.as_ref()));
        let json = serde_json::to_string(&join)?;
        writer.send(Message::Text(json.into())).await?;
        debug!("Sent join_room for {}", self.identity.user_id());

        while let Some(json) = self.backlog.pop_front() {
            if let Err(e) = writer.send(Message::Text(json.clone().into())).await {
                self.backlog.push_front(json);
                return Err(e.into());
            }
        }
        Ok(())
    }

    async fn pump(
        &mut self,
        writer: &mut WsWriter,
        reader: &mut WsReader,
    ) -> Result<CloseReason, Interrupted> {
        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(ChannelCommand::Send { json, .. }) => {
                        if let Err(e) = writer.send(Message::Text(json.into())).await {
                            return Ok(CloseReason::Error(e.to_string()));
                        }
                    }
                    Some(ChannelCommand::Close) | None => return Err(Interrupted::Closed),
                },

                msg = reader.next() => match msg {
                    Some(Ok(Message::Text(text))) => self.dispatch(text.as_str()),
                    Some(Ok(Message::Close(_))) | None => return Ok(CloseReason::Remote),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Ok(CloseReason::Error(e.to_string())),
                },
            }
        }
    }

    fn dispatch(&self, text: &str) {
        let frame: Frame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Malformed signaling frame: {}. Text: {}", e, text);
                return;
            }
        };

        let handlers: Vec<EventHandler> = self
            .handlers
            .get(&frame.event)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        for handler in handlers {
            handler(&frame.data);
        }

        if !ServerEvent::is_known(&frame.event) {
            debug!("No typed handling for event '{}'", frame.event);
            return;
        }

        match serde_json::from_str::<ServerEvent>(text) {
            Ok(event) => self.notify(ChannelEvent::Message(event)),
            Err(e) => warn!("Invalid '{}' payload: {}", frame.event, e),
        }
    }

    /// Drives `fut` to completion while queueing outbound frames.
    async fn buffer_until<F: Future>(&mut self, fut: F) -> Result<F::Output, Interrupted> {
        tokio::pin!(fut);
        loop {
            tokio::select! {
                out = &mut fut => return Ok(out),
                cmd = self.commands.recv() => match cmd {
                    Some(ChannelCommand::Send { json, negotiation }) => {
                        self.enqueue(json, negotiation)
                    }
                    Some(ChannelCommand::Close) | None => return Err(Interrupted::Closed),
                },
            }
        }
    }

    /// Queues a frame until the next open. Negotiation envelopes are dropped:
    /// peers restart negotiation after every rejoin.
    fn enqueue(&mut self, json: String, negotiation: bool) {
        if negotiation {
            debug!("Dropping negotiation frame while disconnected");
            return;
        }
        if self.backlog.len() >= self.config.outbound_buffer {
            warn!("Outbound buffer full, dropping oldest frame");
            self.backlog.pop_front();
        }
        self.backlog.push_back(json);
    }

    fn set_state(&self, state: ChannelState) {
        self.state.send_replace(state);
    }

    fn notify(&self, event: ChannelEvent) {
        let _ = self.events.send(event);
    }
}
