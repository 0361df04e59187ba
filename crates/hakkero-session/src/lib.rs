//! Players and live connections for Hakkero.
//!
//! This crate provides the pieces every live part of the game is built
//! from:
//!
//! 1. **Identity**: [`User`]: a display name plus a server-issued
//!    identifier.
//! 2. **Connection actors**: [`ConnectionActor`]: a peer wrapped in a reader
//!    and a writer task, with FIFO [`deliver`](ConnectionActor::deliver) and
//!    a single terminal error held in an [`ErrorLatch`].
//! 3. **Broadcast**: [`broadcast`]: deliver to a whole group and wait until
//!    every attempt is done.
//!
//! # How it fits in the stack
//!
//! ```text
//! Matchmaking / Room (above)  ← hold actors, broadcast to them
//!     ↕
//! Session Layer (this crate)  ← users, actors, error latch, broadcast
//!     ↕
//! Transport + Protocol (below)  ← raw connections, wire messages
//! ```

mod actor;
mod broadcast;
mod error;
mod latch;
mod user;

pub use actor::{ActorConfig, ConnectionActor, Inbound};
pub use broadcast::broadcast;
pub use error::{ConnectionError, SessionError};
pub use latch::ErrorLatch;
pub use user::{MAX_USERNAME_LEN, User, validate_username};
