//! Unified error type for the Hakkero server.

use hakkero_matchmaking::MatchmakingError;
use hakkero_protocol::ProtocolError;
use hakkero_room::RoomError;
use hakkero_session::{ConnectionError, SessionError};
use hakkero_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum HakkeroError {
    /// Binding, accepting or upgrading a connection failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Encoding or decoding a wire message failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A player could not be admitted.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A live connection failed.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// A room could not be created or found.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A match could not be set up.
    #[error(transparent)]
    Matchmaking(#[from] MatchmakingError),
}
