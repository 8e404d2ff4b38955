use crate::channel::ChannelHandle;
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::media::LocalMedia;
use crate::presence::RoomMembership;
use crate::session::session_task::SessionTask;
use crate::session::{SessionCommand, SessionObserver, SessionStatus};
use crate::transport::PeerConnector;
use huddle_core::{ClientEvent, OutgoingChat, SessionIdentity, UserId};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// State the session task publishes and the controller reads.
pub(crate) struct SessionSignals {
    pub(crate) channel: watch::Sender<Option<ChannelHandle>>,
    pub(crate) membership: watch::Sender<Option<RoomMembership>>,
    pub(crate) status: watch::Sender<SessionStatus>,
}

impl SessionSignals {
    fn new() -> Self {
        Self {
            channel: watch::channel(None).0,
            membership: watch::channel(None).0,
            status: watch::channel(SessionStatus::Idle).0,
        }
    }

    /// Publishes `status` and tells the observer, if it changed.
    pub(crate) fn set_status(&self, status: SessionStatus, observer: &dyn SessionObserver) {
        let changed = self.status.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
        if changed {
            debug!("Session status: {:?}", status);
            observer.on_status(status);
        }
    }
}

struct RunningSession {
    identity: SessionIdentity,
    commands: mpsc::UnboundedSender<SessionCommand>,
    task: JoinHandle<()>,
}

/// One participant's interview-room session.
///
/// Owns the signaling channel, presence and negotiation through a background
/// task. Collaborators are injected at construction.
pub struct SessionController {
    config: SessionConfig,
    observer: Arc<dyn SessionObserver>,
    connector: Arc<dyn PeerConnector>,
    media: LocalMedia,
    signals: Arc<SessionSignals>,
    running: Option<RunningSession>,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        observer: Arc<dyn SessionObserver>,
        connector: Arc<dyn PeerConnector>,
        media: LocalMedia,
    ) -> Self {
        Self {
            config,
            observer,
            connector,
            media,
            signals: Arc::new(SessionSignals::new()),
            running: None,
        }
    }

    /// Starts a session for `identity`, replacing any running one.
    pub async fn initialize(&mut self, identity: SessionIdentity) -> Result<(), SessionError> {
        if self.media.is_released() {
            return Err(SessionError::Stopped);
        }

        self.teardown().await;

        info!(
            "Initializing session for {} in room {}",
            identity.user_id(),
            identity.room()
        );
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let task = SessionTask::new(
            identity.clone(),
            self.config.clone(),
            self.observer.clone(),
            self.connector.clone(),
            self.media.clone(),
            self.signals.clone(),
            command_rx,
        );
        let task = tokio::spawn(task.run());

        self.running = Some(RunningSession {
            identity,
            commands: command_tx,
            task,
        });
        Ok(())
    }

    /// Broadcasts a chat line to the room. Blank text is ignored.
    pub fn send_chat_message(&self, text: &str) -> Result<(), SessionError> {
        let text = text.trim();
        if text.is_empty() {
            debug!("Ignoring empty chat message");
            return Ok(());
        }

        let running = self.running.as_ref().ok_or(SessionError::NotInitialized)?;
        let channel = self.channel().ok_or(SessionError::NotInitialized)?;

        channel.send(ClientEvent::SendMessage(OutgoingChat {
            room: running.identity.room().clone(),
            message: text.to_owned(),
            user_id: running.identity.user_id().clone(),
            user_name: running.identity.user_name().to_owned(),
        }));
        Ok(())
    }

    /// Explicit negotiation-needed trigger for `peer`.
    pub fn renegotiate(&self, peer: UserId) -> Result<(), SessionError> {
        self.command(SessionCommand::Renegotiate(peer))
    }

    /// Re-sends `join_room` on the current connection.
    pub fn rejoin(&self) -> Result<(), SessionError> {
        self.command(SessionCommand::Rejoin)
    }

    /// Current channel, or `None` while the session is not ready.
    pub fn channel(&self) -> Option<ChannelHandle> {
        self.signals.channel.borrow().clone()
    }

    /// Resolves once a channel is published. Pending until `initialize` is
    /// called.
    pub async fn wait_for_channel(&self) -> Option<ChannelHandle> {
        let mut channel = self.signals.channel.subscribe();
        let ready = channel.wait_for(Option::is_some).await.ok()?;
        (*ready).clone()
    }

    pub fn membership(&self) -> Option<RoomMembership> {
        self.signals.membership.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        *self.signals.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.signals.status.subscribe()
    }

    pub fn identity(&self) -> Option<&SessionIdentity> {
        self.running.as_ref().map(|running| &running.identity)
    }

    pub fn media(&self) -> &LocalMedia {
        &self.media
    }

    /// Ends the session for good: peers and channel closed, media released.
    pub async fn shutdown(&mut self) {
        self.teardown().await;
        self.media.release();
        self.signals
            .set_status(SessionStatus::Stopped, self.observer.as_ref());
        info!("Session shut down");
    }

    fn command(&self, command: SessionCommand) -> Result<(), SessionError> {
        let running = self.running.as_ref().ok_or(SessionError::NotInitialized)?;
        running
            .commands
            .send(command)
            .map_err(|_| SessionError::Stopped)
    }

    async fn teardown(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        info!("Tearing down session for {}", running.identity.user_id());
        let _ = running.commands.send(SessionCommand::Shutdown);
        if let Err(e) = running.task.await {
            warn!("Session task ended abnormally: {}", e);
        }

        self.signals.channel.send_replace(None);
        self.signals.membership.send_replace(None);
    }
}
