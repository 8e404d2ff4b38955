mod channel;
mod config;
mod error;
mod locator;
mod media;
mod negotiation;
mod presence;
mod session;
mod transport;

pub use channel::*;
pub use config::*;
pub use error::*;
pub use locator::*;
pub use media::*;
pub use negotiation::*;
pub use presence::*;
pub use session::*;
pub use transport::*;
