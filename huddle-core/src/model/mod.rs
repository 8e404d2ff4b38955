mod connection;
mod description;
mod identity;
mod room;
mod signaling;
mod user;

pub use connection::ConnectionId;
pub use description::{IceCandidate, IceServerConfig, SdpType, SessionDescription};
pub use identity::{IdentityError, SessionIdentity};
pub use room::RoomId;
pub use signaling::{
    ChatMessage, ClientEvent, Frame, IceEnvelope, JoinRoom, OutgoingChat, RoomJoined,
    ServerEvent, SessionEnvelope, UserJoined, UserLeft,
};
pub use user::UserId;
