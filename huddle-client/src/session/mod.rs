mod session_command;
mod session_controller;
mod session_observer;
mod session_status;
mod session_task;

pub(crate) use session_command::SessionCommand;
pub use session_controller::*;
pub use session_observer::*;
pub use session_status::*;
