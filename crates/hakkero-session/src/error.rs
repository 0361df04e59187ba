//! Error types for the session layer.

use std::time::Duration;

/// Errors raised while admitting a player.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The display name is empty or longer than
    /// [`MAX_USERNAME_LEN`](crate::MAX_USERNAME_LEN) characters.
    #[error("invalid username: {0}")]
    InvalidUsername(String),
}

/// The terminal failure of a [`ConnectionActor`](crate::ConnectionActor).
///
/// An actor records at most one of these, the first one that happens. It is
/// `Clone` because every observer of the actor's
/// [`ErrorLatch`](crate::ErrorLatch) receives its own copy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    /// The peer went away cleanly, or the actor was closed locally.
    #[error("connection closed")]
    Closed,

    /// Writing a message failed.
    #[error("write failed: {0}")]
    Write(String),

    /// Reading from the peer failed.
    #[error("read failed: {0}")]
    Read(String),

    /// Nothing arrived from the peer within the idle limit.
    #[error("no message received for {0:?}")]
    Idle(Duration),
}
