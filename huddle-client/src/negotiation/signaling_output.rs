use crate::channel::ChannelHandle;
use async_trait::async_trait;
use huddle_core::{
    ClientEvent, IceCandidate, IceEnvelope, JoinRoom, RoomId, SessionDescription, SessionEnvelope,
    UserId,
};

/// Outbound half of the signaling protocol, as seen by presence and
/// negotiation.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    async fn join_room(&self, join: JoinRoom);

    async fn send_offer(&self, room: RoomId, to: UserId, offer: SessionDescription);

    async fn send_answer(&self, room: RoomId, to: UserId, answer: SessionDescription);

    async fn send_ice(&self, room: RoomId, to: UserId, candidate: IceCandidate);
}

#[async_trait]
impl SignalingOutput for ChannelHandle {
    async fn join_room(&self, join: JoinRoom) {
        self.send(ClientEvent::JoinRoom(join));
    }

    async fn send_offer(&self, room: RoomId, to: UserId, offer: SessionDescription) {
        self.send(ClientEvent::Offer(SessionEnvelope {
            room,
            from: Some(self.identity().user_id().clone()),
            to: Some(to),
            description: offer,
        }));
    }

    async fn send_answer(&self, room: RoomId, to: UserId, answer: SessionDescription) {
        self.send(ClientEvent::Answer(SessionEnvelope {
            room,
            from: Some(self.identity().user_id().clone()),
            to: Some(to),
            description: answer,
        }));
    }

    async fn send_ice(&self, room: RoomId, to: UserId, candidate: IceCandidate) {
        self.send(ClientEvent::IceCandidate(IceEnvelope {
            room,
            from: Some(self.identity().user_id().clone()),
            to: Some(to),
            candidate,
        }));
    }
}
