//! Matchmaking for Hakkero.
//!
//! Players join a [`Queue`] as [`QueueSeat`]s. Once enough of them are
//! waiting, the batch is asked to confirm (the ready-check); if everyone
//! accepts, a room is created through a
//! [`RoomManager`](hakkero_room::RoomManager) with an opening sentence from
//! an [`OpenSentencer`]. Players who accepted a check that failed go back
//! into the queue.
//!
//! # Key types
//!
//! - [`Queue`]: the waiting list, batching and ready-check
//! - [`QueueSeat`]: a queued connection and its user
//! - [`QueueConfig`]: batch size and timeouts
//! - [`OpenSentencer`] / [`StaticOpenings`]: where stories start

mod config;
mod error;
mod opening;
mod queue;
mod seat;

pub use config::QueueConfig;
pub use error::MatchmakingError;
pub use opening::{OpenSentencer, StaticOpenings};
pub use queue::Queue;
pub use seat::QueueSeat;
