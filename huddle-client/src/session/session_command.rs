use huddle_core::UserId;

/// Requests from the controller to its running session task.
#[derive(Debug)]
pub(crate) enum SessionCommand {
    Renegotiate(UserId),
    Rejoin,
    Shutdown,
}
