//! Room registry: creates rooms and finds them again by id.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use hakkero_protocol::RoomId;
use hakkero_session::User;

use crate::{RoomConfig, RoomError, RoomHandle};

/// Creates and looks up rooms.
///
/// The matchmaking queue only needs this trait, so tests can swap in a
/// manager that fails or records what it was asked to create.
pub trait RoomManager: Send + Sync + 'static {
    /// Creates a room for `members` and starts it. Returns its id.
    ///
    /// # Errors
    /// Returns [`RoomError::CreationFailed`] if no room can be set up.
    fn create(
        &self,
        members: Vec<User>,
        timeout: Duration,
        opening: String,
    ) -> Result<RoomId, RoomError>;

    /// Looks up a room.
    ///
    /// # Errors
    /// Returns [`RoomError::NotFound`] for an id that was never handed out.
    fn get(&self, id: RoomId) -> Result<RoomHandle, RoomError>;
}

/// The in-process [`RoomManager`].
///
/// Rooms are appended and never removed, so a room's id is simply its
/// position in the list and stays valid for the life of the process.
pub struct RoomRegistry {
    config: RoomConfig,
    rooms: Mutex<Vec<RoomHandle>>,
}

impl RoomRegistry {
    /// Creates an empty registry whose rooms use `config`.
    pub fn new(config: RoomConfig) -> Self {
        Self {
            config,
            rooms: Mutex::new(Vec::new()),
        }
    }

    /// Number of rooms created so far.
    pub fn len(&self) -> usize {
        self.rooms().len()
    }

    /// Returns `true` if no room has been created yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The settings every room is created with.
    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    fn rooms(&self) -> MutexGuard<'_, Vec<RoomHandle>> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}

impl RoomManager for RoomRegistry {
    fn create(
        &self,
        members: Vec<User>,
        timeout: Duration,
        opening: String,
    ) -> Result<RoomId, RoomError> {
        let mut rooms = self.rooms();
        if self.config.max_rooms > 0 && rooms.len() >= self.config.max_rooms {
            tracing::warn!(max_rooms = self.config.max_rooms, "room limit reached");
            return Err(RoomError::CreationFailed(format!(
                "room limit of {} reached",
                self.config.max_rooms
            )));
        }
        let room_id = RoomId(rooms.len() as u64);
        rooms.push(RoomHandle::spawn(
            room_id,
            members,
            timeout,
            opening,
            &self.config,
        ));
        Ok(room_id)
    }

    fn get(&self, id: RoomId) -> Result<RoomHandle, RoomError> {
        usize::try_from(id.0)
            .ok()
            .and_then(|index| self.rooms().get(index).cloned())
            .ok_or(RoomError::NotFound(id))
    }
}
