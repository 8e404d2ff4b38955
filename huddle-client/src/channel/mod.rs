mod channel_event;
mod channel_handle;
mod signaling_channel;

pub use channel_event::*;
pub use channel_handle::*;
pub use signaling_channel::*;
