//! Player identity.
//!
//! Hakkero has no accounts. A [`User`] is created when someone joins the
//! queue and lives only as long as the matches they play: a display name
//! they chose, plus a random identifier the server hands back so the client
//! can later claim its seat in a room.

use rand::Rng;

use crate::SessionError;

/// Longest display name accepted, in characters.
pub const MAX_USERNAME_LEN: usize = 20;

/// A player, from joining the queue until their last room ends.
///
/// The identifier acts as a bearer token for the seat. Only the username
/// ever leaves the server in room snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct User {
    id: String,
    username: String,
}

impl User {
    /// Creates a user with a fresh random identifier.
    ///
    /// # Errors
    /// Returns [`SessionError::InvalidUsername`] if the name fails
    /// [`validate_username`].
    pub fn new(username: impl Into<String>) -> Result<Self, SessionError> {
        let username = username.into();
        validate_username(&username)?;
        Ok(Self {
            id: generate_token(),
            username,
        })
    }

    /// Rebuilds a user from a known identifier. No validation is done.
    pub fn with_id(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
        }
    }

    /// The opaque session identifier (32 lowercase hex characters).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The display name.
    pub fn username(&self) -> &str {
        &self.username
    }
}

/// Checks that a display name has between 1 and [`MAX_USERNAME_LEN`]
/// characters.
pub fn validate_username(username: &str) -> Result<(), SessionError> {
    let len = username.chars().count();
    if len == 0 {
        return Err(SessionError::InvalidUsername("username is empty".into()));
    }
    if len > MAX_USERNAME_LEN {
        return Err(SessionError::InvalidUsername(format!(
            "username is longer than {MAX_USERNAME_LEN} characters"
        )));
    }
    Ok(())
}

/// Generates a random 32-character hex identifier.
fn generate_token() -> String {
    let mut rng = rand::rng();
    // 16 random bytes, two hex digits each.
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
