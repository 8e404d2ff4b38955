mod coordinator;
mod peer_negotiation;
mod signaling_output;

pub use coordinator::*;
pub use peer_negotiation::*;
pub use signaling_output::*;
