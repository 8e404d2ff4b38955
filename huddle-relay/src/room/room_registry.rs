use crate::room::Member;
use dashmap::DashMap;
use huddle_core::{ConnectionId, RoomId, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Room membership, keyed by room then user id.
#[derive(Clone, Default)]
pub struct RoomRegistry {
    rooms: Arc<DashMap<RoomId, HashMap<UserId, Member>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `member`, replacing an earlier socket of the same user. Returns
    /// the room size after the join.
    pub fn join(&self, room: &RoomId, member: Member) -> usize {
        let mut members = self.rooms.entry(room.clone()).or_insert_with(|| {
            info!("Creating room {}", room);
            HashMap::new()
        });

        if let Some(previous) = members.insert(member.user_id.clone(), member) {
            debug!(
                "{} rejoined {} (replacing connection {})",
                previous.user_id, room, previous.connection
            );
        }
        members.len()
    }

    /// Removes the user if `connection` is still the one registered for it.
    pub fn leave(&self, room: &RoomId, user_id: &UserId, connection: ConnectionId) -> bool {
        let removed = match self.rooms.get_mut(room) {
            Some(mut members) => {
                let current = members.get(user_id).map(|m| m.connection);
                if current == Some(connection) {
                    members.remove(user_id);
                    true
                } else {
                    false
                }
            }
            None => false,
        };

        if self.rooms.remove_if(room, |_, members| members.is_empty()).is_some() {
            info!("Room {} is empty, removed", room);
        }
        removed
    }

    pub fn member(&self, room: &RoomId, user_id: &UserId) -> Option<Member> {
        self.rooms.get(room)?.get(user_id).cloned()
    }

    /// Everyone in `room` except `except`.
    pub fn others(&self, room: &RoomId, except: Option<&UserId>) -> Vec<Member> {
        let Some(members) = self.rooms.get(room) else {
            return Vec::new();
        };
        members
            .values()
            .filter(|m| Some(&m.user_id) != except)
            .cloned()
            .collect()
    }

    pub fn size(&self, room: &RoomId) -> usize {
        self.rooms.get(room).map_or(0, |members| members.len())
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
