use crate::room::{Member, RoomRegistry, Seat};
use axum::extract::ws::Message;
use huddle_core::{
    ChatMessage, ClientEvent, ConnectionId, IceEnvelope, JoinRoom, OutgoingChat, RoomId,
    RoomJoined, ServerEvent, SessionEnvelope, UserId, UserJoined, UserLeft,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Routes participant events between sockets of the same room.
#[derive(Clone, Default)]
pub struct RelayService {
    rooms: RoomRegistry,
}

impl RelayService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    /// Handles one event from `connection`. `seat` is that socket's current
    /// room membership and is updated on join.
    pub fn handle(
        &self,
        connection: ConnectionId,
        tx: &mpsc::UnboundedSender<Message>,
        seat: &mut Option<Seat>,
        event: ClientEvent,
    ) {
        match event {
            ClientEvent::JoinRoom(join) => self.join(connection, tx, seat, join),
            ClientEvent::SendMessage(chat) => self.chat(seat.as_ref(), chat),
            ClientEvent::Offer(envelope) => {
                self.forward_description(seat.as_ref(), envelope, ServerEvent::Offer)
            }
            ClientEvent::Answer(envelope) => {
                self.forward_description(seat.as_ref(), envelope, ServerEvent::Answer)
            }
            ClientEvent::IceCandidate(envelope) => self.forward_ice(seat.as_ref(), envelope),
        }
    }

    /// Drops the socket's membership and tells the rest of the room.
    pub fn disconnect(&self, connection: ConnectionId, seat: Option<Seat>) {
        let Some(seat) = seat else {
            return;
        };
        if !self.rooms.leave(&seat.room, &seat.user_id, connection) {
            debug!("{} already superseded in {}", seat.user_id, seat.room);
            return;
        }

        info!("{} left {}", seat.user_id, seat.room);
        let left = ServerEvent::UserLeft(UserLeft {
            user_id: seat.user_id.clone(),
        });
        self.broadcast(&seat.room, Some(&seat.user_id), &left);
    }

    fn join(
        &self,
        connection: ConnectionId,
        tx: &mpsc::UnboundedSender<Message>,
        seat: &mut Option<Seat>,
        join: JoinRoom,
    ) {
        let next = Seat {
            room: join.room.clone(),
            user_id: join.user_id.clone(),
        };
        if let Some(previous) = seat.take() {
            if previous != next {
                self.disconnect(connection, Some(previous));
            }
        }

        let members = self.rooms.join(
            &join.room,
            Member {
                user_id: join.user_id.clone(),
                user_name: join.user_name.clone(),
                is_interviewer: join.is_interviewer,
                connection,
                tx: tx.clone(),
            },
        );
        info!(
            "{} ({}) joined {}, {} present",
            join.user_name, join.user_id, join.room, members
        );

        send(
            tx,
            &ServerEvent::RoomJoined(RoomJoined {
                room: join.room.clone(),
                user_id: join.user_id.clone(),
                members,
            }),
        );
        let joined = ServerEvent::UserJoined(UserJoined {
            user_id: join.user_id.clone(),
            user_name: join.user_name,
            is_interviewer: join.is_interviewer,
            members,
        });
        self.broadcast(&join.room, Some(&join.user_id), &joined);

        *seat = Some(next);
    }

    fn chat(&self, seat: Option<&Seat>, chat: OutgoingChat) {
        let Some(seat) = seat.filter(|s| s.room == chat.room) else {
            warn!("Chat for {} from a socket outside it", chat.room);
            return;
        };

        let message = ServerEvent::ReceiveMessage(ChatMessage {
            user_id: seat.user_id.clone(),
            user_name: chat.user_name,
            message: chat.message,
        });
        self.broadcast(&seat.room, None, &message);
    }

    fn forward_description(
        &self,
        seat: Option<&Seat>,
        mut envelope: SessionEnvelope,
        wrap: fn(SessionEnvelope) -> ServerEvent,
    ) {
        let Some(seat) = seat else {
            warn!("Negotiation envelope from a socket outside any room");
            return;
        };
        envelope.room = seat.room.clone();
        envelope.from = Some(seat.user_id.clone());
        let to = envelope.to.clone();

        self.route(seat, to.as_ref(), &wrap(envelope));
    }

    fn forward_ice(&self, seat: Option<&Seat>, mut envelope: IceEnvelope) {
        let Some(seat) = seat else {
            warn!("ICE candidate from a socket outside any room");
            return;
        };
        envelope.room = seat.room.clone();
        envelope.from = Some(seat.user_id.clone());
        let to = envelope.to.clone();

        self.route(seat, to.as_ref(), &ServerEvent::IceCandidate(envelope));
    }

    fn route(&self, seat: &Seat, to: Option<&UserId>, event: &ServerEvent) {
        match to {
            Some(to) => match self.rooms.member(&seat.room, to) {
                Some(member) => send(&member.tx, event),
                None => debug!("{} is not in {}, dropping envelope", to, seat.room),
            },
            None => self.broadcast(&seat.room, Some(&seat.user_id), event),
        }
    }

    fn broadcast(&self, room: &RoomId, except: Option<&UserId>, event: &ServerEvent) {
        for member in self.rooms.others(room, except) {
            send(&member.tx, event);
        }
    }
}

fn send(tx: &mpsc::UnboundedSender<Message>, event: &ServerEvent) {
    match serde_json::to_string(event) {
        Ok(json) => {
            if tx.send(Message::Text(json.into())).is_err() {
                debug!("Socket gone, dropping outbound event");
            }
        }
        Err(e) => error!("Failed to serialize server event: {}", e),
    }
}
