//! The authoritative data of one room, and the rules that change it.
//!
//! Nothing here is async or shared: a [`RoomState`] is owned by its room's
//! control task, which is the only writer. Every mutation returns what needs
//! to be told to the players, and the caller decides when to broadcast it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use hakkero_protocol::{RoomId, SeatStatus, Sentence, SentenceNotice, ServerMessage};
use hakkero_session::User;
use serde::{Serialize, Serializer};

use crate::RoomPhase;

/// Members, statuses and story of one room.
///
/// Invariants:
/// - `status.len() == members.len()`
/// - `sentences[0]` is the system opening sentence
/// - only the seat whose turn it is changes status, and only away from
///   `Turn`; `Out` and `Disconnected` are final
#[derive(Debug, Clone)]
pub struct RoomState {
    id: RoomId,
    members: Vec<User>,
    status: Vec<SeatStatus>,
    sentences: Vec<Sentence>,
    start: DateTime<Utc>,
    current: Option<DateTime<Utc>>,
    timeout: Duration,
}

impl RoomState {
    /// Creates the state of a fresh room. Members keep the given order.
    pub fn new(id: RoomId, members: Vec<User>, timeout: Duration, opening: impl Into<String>) -> Self {
        let status = vec![SeatStatus::Active; members.len()];
        Self {
            id,
            members,
            status,
            sentences: vec![Sentence::system(opening)],
            start: Utc::now(),
            current: None,
            timeout,
        }
    }

    /// The room's identifier.
    pub fn id(&self) -> RoomId {
        self.id
    }

    /// Members in seat order.
    pub fn members(&self) -> &[User] {
        &self.members
    }

    /// Status of each seat, index-aligned with [`members`](Self::members).
    pub fn status(&self) -> &[SeatStatus] {
        &self.status
    }

    /// The story so far, opening sentence first.
    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    /// Time allowed for each turn.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of seats still in the game (`Active` or `Turn`).
    pub fn active_count(&self) -> usize {
        self.status.iter().filter(|s| s.is_playing()).count()
    }

    /// The game is over once at most one seat is still in it.
    ///
    /// Since statuses only ever leave the playing set, this never goes back
    /// to `false` once it is `true`.
    pub fn is_ended(&self) -> bool {
        self.active_count() <= 1
    }

    /// The last seat standing, if the game is over and anyone is left.
    pub fn winner(&self) -> Option<usize> {
        if !self.is_ended() {
            return None;
        }
        self.status.iter().position(|s| s.is_playing())
    }

    /// The seat that plays after `last`: the first `Active` seat scanning
    /// forward from `last + 1` and wrapping around. `None` once the game is
    /// over.
    pub fn next_turn(&self, last: usize) -> Option<usize> {
        if self.is_ended() {
            return None;
        }
        let n = self.status.len();
        (1..=n)
            .map(|step| (last + step) % n)
            .find(|&seat| self.status[seat] == SeatStatus::Active)
    }

    /// Hands the turn to `seat`, started at `at`.
    pub fn begin_turn(&mut self, seat: usize, at: DateTime<Utc>) {
        debug_assert_eq!(self.status[seat], SeatStatus::Active);
        self.status[seat] = SeatStatus::Turn;
        self.current = Some(at);
    }

    /// The seat wrote `content`. It stays in the game.
    pub fn record_sentence(&mut self, seat: usize, content: impl Into<String>) -> SentenceNotice {
        self.end_turn(seat, SeatStatus::Active);
        self.push(Sentence::written(seat, content))
    }

    /// The seat skipped and leaves the game.
    pub fn record_skip(&mut self, seat: usize) -> SentenceNotice {
        self.end_turn(seat, SeatStatus::Out);
        let text = format!("Player {} has skipped.", self.members[seat].username());
        self.push(Sentence::system(text))
    }

    /// The seat ran out of time or lost its connection and leaves the game.
    pub fn record_timeout(&mut self, seat: usize) -> SentenceNotice {
        self.end_turn(seat, SeatStatus::Disconnected);
        let text = format!("Player {} has timed out.", self.members[seat].username());
        self.push(Sentence::system(text))
    }

    /// The `turn` message: every seat's status and when the turn started.
    pub fn turn_message(&self) -> ServerMessage {
        ServerMessage::Turn {
            status: self.status.clone(),
            time: self.current.unwrap_or(self.start),
        }
    }

    /// A read-only copy for observers.
    pub fn snapshot(&self, phase: RoomPhase) -> RoomSnapshot {
        RoomSnapshot {
            id: self.id,
            members: self
                .members
                .iter()
                .map(|user| user.username().to_owned())
                .collect(),
            status: self.status.clone(),
            sentences: self.sentences.clone(),
            start: self.start,
            current: self.current,
            timeout: self.timeout,
            phase,
            winner: self.winner(),
        }
    }

    fn end_turn(&mut self, seat: usize, to: SeatStatus) {
        debug_assert_eq!(self.status[seat], SeatStatus::Turn);
        self.status[seat] = to;
    }

    fn push(&mut self, sentence: Sentence) -> SentenceNotice {
        self.sentences.push(sentence.clone());
        SentenceNotice {
            sentence,
            pos: self.sentences.len() - 1,
        }
    }
}

/// What anyone may know about a room.
///
/// Members are listed by username only; their identifiers never leave the
/// room. Serializes to the JSON shape served to room observers, with the
/// timeout in nanoseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSnapshot {
    /// The room's identifier.
    pub id: RoomId,
    /// Usernames in seat order.
    pub members: Vec<String>,
    /// Status of each seat.
    pub status: Vec<SeatStatus>,
    /// The story so far.
    pub sentences: Vec<Sentence>,
    /// When the room was created.
    pub start: DateTime<Utc>,
    /// When the current (or last) turn started; absent before the first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<DateTime<Utc>>,
    /// Time allowed per turn.
    #[serde(serialize_with = "as_nanos")]
    pub timeout: Duration,
    /// Lifecycle phase.
    pub phase: RoomPhase,
    /// The last seat standing, once the room has ended.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<usize>,
}

fn as_nanos<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX))
}
