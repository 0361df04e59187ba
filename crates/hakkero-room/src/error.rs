//! Error types for the room layer.

use hakkero_protocol::RoomId;

/// Errors that can occur during room operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// A new room could not be set up.
    #[error("cannot create room: {0}")]
    CreationFailed(String),
}
