//! Wire protocol for Hakkero.
//!
//! This crate defines the "language" that the browser client and the server
//! speak:
//!
//! - **Types** ([`ServerMessage`], [`TurnRequest`], [`ReadyResponse`],
//!   [`SeatStatus`], [`Sentence`], ...): the structures that travel on the
//!   wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and session
//! (connection actors). It knows nothing about queues or rooms; it only
//! knows how messages look.
//!
//! ```text
//! Transport (bytes) → Protocol (ServerMessage / requests) → Session (actors)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    Announcement, ReadyResponse, RoomId, SeatStatus, Sentence, SentenceNotice, ServerMessage,
    TurnRequest,
};
