mod room_presence;

pub use room_presence::*;
