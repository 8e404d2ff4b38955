use crate::model::{RoomId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("room id must not be empty")]
    MissingRoom,
    #[error("user name must not be empty")]
    MissingUserName,
}

/// Who this client session is. Fixed for the lifetime of a session and
/// re-sent verbatim on every (re)join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    room: RoomId,
    user_id: UserId,
    user_name: String,
    is_interviewer: bool,
}

impl SessionIdentity {
    pub fn new(
        room: impl Into<RoomId>,
        user_id: impl Into<UserId>,
        user_name: impl Into<String>,
        is_interviewer: bool,
    ) -> Result<Self, IdentityError> {
        let room = room.into();
        let user_name = user_name.into();

        if room.as_str().trim().is_empty() {
            return Err(IdentityError::MissingRoom);
        }
        if user_name.trim().is_empty() {
            return Err(IdentityError::MissingUserName);
        }

        Ok(Self {
            room,
            user_id: user_id.into(),
            user_name,
            is_interviewer,
        })
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn is_interviewer(&self) -> bool {
        self.is_interviewer
    }

    /// Query parameters attached to the signaling connection.
    pub fn connection_metadata(&self) -> [(&'static str, String); 4] {
        [
            ("room", self.room.to_string()),
            ("user_id", self.user_id.to_string()),
            ("user_name", self.user_name.clone()),
            ("is_interviewer", self.is_interviewer.to_string()),
        ]
    }
}
