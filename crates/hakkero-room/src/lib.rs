//! Rooms for Hakkero.
//!
//! A room is one match: a fixed group of members taking turns appending
//! sentences to a shared story until only one of them is left.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns the
//! authoritative state; connections attach to it through a [`RoomHandle`].
//!
//! # Key types
//!
//! - [`RoomState`]: members, statuses, sentences and the turn rules
//! - [`RoomHandle`]: attach connections, read [`RoomSnapshot`]s
//! - [`RoomManager`] / [`RoomRegistry`]: create rooms, find them by id
//! - [`RoomPhase`]: lifecycle state machine
//! - [`RoomConfig`]: warmup and room limit

mod config;
mod error;
mod manager;
mod room;
mod state;

pub use config::{RoomConfig, RoomPhase};
pub use error::RoomError;
pub use manager::{RoomManager, RoomRegistry};
pub use room::{Attachment, RoomHandle, RoomSeat};
pub use state::{RoomSnapshot, RoomState};
