//! Room configuration and lifecycle phases.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Settings shared by every room a registry creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomConfig {
    /// Grace period between creation and the first turn, so every member
    /// has time to connect.
    pub warmup: Duration,

    /// Maximum number of rooms the registry will ever create (0 = unlimited).
    pub max_rooms: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            warmup: Duration::from_secs(10),
            max_rooms: 0,
        }
    }
}

impl RoomConfig {
    /// Sets the warmup period.
    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    /// Caps the number of rooms (0 = unlimited).
    pub fn with_max_rooms(mut self, max_rooms: usize) -> Self {
        self.max_rooms = max_rooms;
        self
    }
}

// ---------------------------------------------------------------------------
// RoomPhase
// ---------------------------------------------------------------------------

/// Where a room is in its life.
///
/// Transitions are strictly ordered, no skipping:
///
/// ```text
/// Warmup → Driving → Ended
/// ```
///
/// - **Warmup**: the room exists and members may connect; no turn yet.
/// - **Driving**: turns are being played.
/// - **Ended**: at most one member is still in the game. Late connections
///   only get the final result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomPhase {
    Warmup,
    Driving,
    Ended,
}

impl RoomPhase {
    /// The phase that follows this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Warmup => Some(Self::Driving),
            Self::Driving => Some(Self::Ended),
            Self::Ended => None,
        }
    }

    /// Returns `true` if the room no longer plays turns.
    pub fn is_ended(self) -> bool {
        matches!(self, Self::Ended)
    }
}

impl std::fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warmup => write!(f, "warmup"),
            Self::Driving => write!(f, "driving"),
            Self::Ended => write!(f, "ended"),
        }
    }
}
