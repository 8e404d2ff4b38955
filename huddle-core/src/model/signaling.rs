use crate::model::{IceCandidate, RoomId, SessionDescription, SessionIdentity, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Untyped view of a channel message: `{"event": ..., "data": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRoom {
    pub room: RoomId,
    pub user_id: UserId,
    pub user_name: String,
    pub is_interviewer: bool,
}

impl From<&SessionIdentity> for JoinRoom {
    fn from(identity: &SessionIdentity) -> Self {
        Self {
            room: identity.room().clone(),
            user_id: identity.user_id().clone(),
            user_name: identity.user_name().to_owned(),
            is_interviewer: identity.is_interviewer(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingChat {
    pub room: RoomId,
    pub message: String,
    pub user_id: UserId,
    pub user_name: String,
}

/// Offer or answer envelope. `from` is stamped by the relay, `to` narrows
/// delivery to one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEnvelope {
    pub room: RoomId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<UserId>,
    pub description: SessionDescription,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceEnvelope {
    pub room: RoomId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<UserId>,
    pub candidate: IceCandidate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomJoined {
    pub room: RoomId,
    pub user_id: UserId,
    #[serde(default)]
    pub members: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserJoined {
    pub user_id: UserId,
    pub user_name: String,
    #[serde(default)]
    pub is_interviewer: bool,
    #[serde(default)]
    pub members: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLeft {
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub user_id: UserId,
    pub user_name: String,
    pub message: String,
}

/// Events a participant sends to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinRoom(JoinRoom),
    SendMessage(OutgoingChat),
    Offer(SessionEnvelope),
    Answer(SessionEnvelope),
    IceCandidate(IceEnvelope),
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinRoom(_) => "join_room",
            Self::SendMessage(_) => "send_message",
            Self::Offer(_) => "offer",
            Self::Answer(_) => "answer",
            Self::IceCandidate(_) => "ice_candidate",
        }
    }

    /// Offer, answer and ICE envelopes are bound to the connection they were
    /// produced on and are never replayed on a later one.
    pub fn is_negotiation_event(event: &str) -> bool {
        matches!(event, "offer" | "answer" | "ice_candidate")
    }
}

/// Events the relay delivers to a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    RoomJoined(RoomJoined),
    UserJoined(UserJoined),
    UserLeft(UserLeft),
    ReceiveMessage(ChatMessage),
    Offer(SessionEnvelope),
    Answer(SessionEnvelope),
    IceCandidate(IceEnvelope),
}

impl ServerEvent {
    pub const NAMES: [&'static str; 7] = [
        "room_joined",
        "user_joined",
        "user_left",
        "receive_message",
        "offer",
        "answer",
        "ice_candidate",
    ];

    pub fn is_known(event: &str) -> bool {
        Self::NAMES.contains(&event)
    }
}
