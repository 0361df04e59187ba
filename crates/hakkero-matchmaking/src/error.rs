//! Error types for matchmaking.

use hakkero_room::RoomError;

/// Why a fully accepted batch did not get a room.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchmakingError {
    /// No opening sentence could be produced.
    #[error("no opening sentence available: {0}")]
    OpeningUnavailable(String),

    /// The room manager refused to create the room.
    #[error(transparent)]
    Room(#[from] RoomError),
}
