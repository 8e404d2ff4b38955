pub use huddle_core::model::{RoomId, SessionIdentity, UserId};

pub mod model {
    pub use huddle_core::model::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use huddle_client::*;
}

#[cfg(feature = "relay")]
pub mod relay {
    pub use huddle_relay::*;
}
