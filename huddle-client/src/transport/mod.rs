mod connection_wrapper;
mod peer_config;
mod peer_connection;
mod peer_event;

pub use connection_wrapper::*;
pub use peer_config::*;
pub use peer_connection::*;
pub use peer_event::*;
