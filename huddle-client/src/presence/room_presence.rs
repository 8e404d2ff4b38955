use crate::negotiation::SignalingOutput;
use huddle_core::{
    ConnectionId, JoinRoom, RoomId, RoomJoined, SessionIdentity, UserId, UserJoined, UserLeft,
};
use tracing::{debug, info, warn};

/// Which side of a participant pair sends the first offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitiatorPolicy {
    /// Members already in the room offer to whoever joins.
    #[default]
    ExistingMember,
    /// Only the interviewer offers.
    Interviewer,
    Never,
}

/// Server-asserted membership, valid for one connection only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomMembership {
    pub room: RoomId,
    pub user_id: UserId,
    pub connection: ConnectionId,
    pub members: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceState {
    Absent,
    Joining,
    Joined(RoomMembership),
}

/// Tracks this session's room membership. Only its own event handlers
/// update the state.
pub struct RoomPresence {
    identity: SessionIdentity,
    policy: InitiatorPolicy,
    connection: Option<ConnectionId>,
    state: PresenceState,
}

impl RoomPresence {
    pub fn new(identity: SessionIdentity, policy: InitiatorPolicy) -> Self {
        Self {
            identity,
            policy,
            connection: None,
            state: PresenceState::Absent,
        }
    }

    pub fn state(&self) -> &PresenceState {
        &self.state
    }

    pub fn membership(&self) -> Option<&RoomMembership> {
        match &self.state {
            PresenceState::Joined(membership) => Some(membership),
            _ => None,
        }
    }

    /// Explicit (re)join on the current connection.
    pub async fn join(&mut self, output: &dyn SignalingOutput) {
        info!(
            "Joining room {} as {}",
            self.identity.room(),
            self.identity.user_id()
        );
        output.join_room(JoinRoom::from(&self.identity)).await;
        self.state = PresenceState::Joining;
    }

    /// A connection opened; the channel has already sent `join_room` on it.
    pub fn on_open(&mut self, connection: ConnectionId) {
        self.connection = Some(connection);
        self.state = PresenceState::Joining;
    }

    pub fn on_room_joined(&mut self, ack: &RoomJoined) -> Option<&RoomMembership> {
        if &ack.room != self.identity.room() {
            warn!(
                "Ignoring room_joined for {} while in {}",
                ack.room,
                self.identity.room()
            );
            return None;
        }
        let Some(connection) = self.connection else {
            warn!("Ignoring room_joined without an open connection");
            return None;
        };

        info!("Joined room {} ({} members)", ack.room, ack.members);
        self.state = PresenceState::Joined(RoomMembership {
            room: ack.room.clone(),
            user_id: self.identity.user_id().clone(),
            connection,
            members: ack.members,
        });
        self.membership()
    }

    /// Membership does not survive a transport drop.
    pub fn on_closed(&mut self) {
        if self.membership().is_some() {
            debug!("Membership of {} lapsed", self.identity.room());
        }
        self.connection = None;
        self.state = PresenceState::Absent;
    }

    pub fn is_self(&self, user_id: &UserId) -> bool {
        user_id == self.identity.user_id()
    }

    /// Whether this session must start negotiating with the newcomer.
    pub fn on_user_joined(&self, joined: &UserJoined) -> bool {
        if self.is_self(&joined.user_id) {
            return false;
        }
        match self.policy {
            InitiatorPolicy::ExistingMember => true,
            InitiatorPolicy::Interviewer => self.identity.is_interviewer(),
            InitiatorPolicy::Never => false,
        }
    }

    /// The participant whose negotiation must be torn down, if any.
    pub fn on_user_left(&mut self, left: &UserLeft) -> Option<UserId> {
        if self.is_self(&left.user_id) {
            return None;
        }
        if let PresenceState::Joined(membership) = &mut self.state {
            membership.members = membership.members.saturating_sub(1);
        }
        Some(left.user_id.clone())
    }
}
