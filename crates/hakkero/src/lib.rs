//! # Hakkero
//!
//! Live-session server for a turn-based collaborative storytelling game.
//!
//! Players join a matchmaking queue over WebSocket, confirm a ready-check,
//! and are placed in a room where they take turns adding one sentence each
//! to a shared story. A player who skips, times out or disconnects is out;
//! the last one left wins.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hakkero::prelude::*;
//!
//! # async fn run() -> Result<(), HakkeroError> {
//! let server = HakkeroServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .queue_config(QueueConfig::default().with_player_limit(3))
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod route;
mod server;

pub use config::{DEFAULT_BIND_ADDR, ServerConfig};
pub use error::HakkeroError;
pub use route::Route;
pub use server::{HakkeroServer, HakkeroServerBuilder};

/// Common imports for running and embedding the server.
pub mod prelude {
    pub use crate::{HakkeroError, HakkeroServer, HakkeroServerBuilder, Route, ServerConfig};
    pub use hakkero_matchmaking::{OpenSentencer, QueueConfig, StaticOpenings};
    pub use hakkero_protocol::{RoomId, SeatStatus, ServerMessage};
    pub use hakkero_room::{RoomConfig, RoomManager, RoomPhase, RoomRegistry, RoomSnapshot};
    pub use hakkero_session::ActorConfig;
}
