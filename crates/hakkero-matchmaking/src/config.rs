//! Queue configuration.

use std::time::Duration;

/// Settings for a [`Queue`](crate::Queue).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// How many players make a match.
    pub player_limit: usize,

    /// Time each player gets per turn in the rooms this queue creates.
    pub turn_timeout: Duration,

    /// How long a matched player has to accept.
    pub ready_timeout: Duration,

    /// Pause before a batch whose room could not be set up goes back into
    /// the queue.
    pub cancel_pause: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            player_limit: 4,
            turn_timeout: Duration::from_secs(60),
            ready_timeout: Duration::from_secs(10),
            cancel_pause: Duration::from_secs(1),
        }
    }
}

impl QueueConfig {
    /// Smallest batch that makes a game.
    pub const MIN_PLAYERS: usize = 2;

    /// Sets the number of players per match.
    pub fn with_player_limit(mut self, player_limit: usize) -> Self {
        self.player_limit = player_limit;
        self
    }

    /// Sets the per-turn time limit.
    pub fn with_turn_timeout(mut self, turn_timeout: Duration) -> Self {
        self.turn_timeout = turn_timeout;
        self
    }

    /// Sets the ready-check timeout.
    pub fn with_ready_timeout(mut self, ready_timeout: Duration) -> Self {
        self.ready_timeout = ready_timeout;
        self
    }

    /// Sets the pause after a cancelled match.
    pub fn with_cancel_pause(mut self, cancel_pause: Duration) -> Self {
        self.cancel_pause = cancel_pause;
        self
    }

    /// Returns the config with a player limit of at least
    /// [`MIN_PLAYERS`](Self::MIN_PLAYERS).
    pub fn validated(mut self) -> Self {
        if self.player_limit < Self::MIN_PLAYERS {
            tracing::warn!(
                requested = self.player_limit,
                using = Self::MIN_PLAYERS,
                "player limit too small"
            );
            self.player_limit = Self::MIN_PLAYERS;
        }
        self
    }
}
