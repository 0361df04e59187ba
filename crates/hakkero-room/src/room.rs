//! Room control task and seat attachment.
//!
//! Each room runs in its own task that owns the [`RoomState`] outright and
//! plays the turns one after another. The outside world only touches two
//! things:
//!
//! - the **seats**: which connection currently plays for which member, plus
//!   spectators. Guarded by a short-lived lock that never covers an `.await`
//!   and never touches the turn state.
//! - the **snapshot**: a copy of the state the control task publishes after
//!   every change, read without any lock on the state itself.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use hakkero_protocol::{RoomId, ServerMessage, TurnRequest};
use hakkero_session::{ConnectionActor, ConnectionError, Inbound, User, broadcast};
use rand::seq::SliceRandom;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::{RoomConfig, RoomPhase, RoomSnapshot, RoomState};

/// A connection attached to a room, in the role it plays there.
#[derive(Debug)]
pub struct RoomSeat {
    index: Option<usize>,
    actor: ConnectionActor<TurnRequest>,
}

impl RoomSeat {
    /// The member seat this connection plays for, `None` for a spectator.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// The underlying connection.
    pub fn actor(&self) -> &ConnectionActor<TurnRequest> {
        &self.actor
    }
}

/// What [`RoomHandle::attach`] did with a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    /// Plays for the member in this seat; any previous connection for the
    /// seat was closed.
    Member(usize),
    /// Watches the game.
    Spectator,
    /// The room had already ended. The connection got the result and was
    /// closed.
    Ended,
}

#[derive(Default)]
struct Seats {
    players: Vec<Option<Arc<RoomSeat>>>,
    spectators: Vec<Arc<RoomSeat>>,
    closed: bool,
}

struct Shared {
    id: RoomId,
    members: Vec<User>,
    seats: Mutex<Seats>,
    snapshot: watch::Receiver<RoomSnapshot>,
}

impl Shared {
    fn seats(&self) -> MutexGuard<'_, Seats> {
        self.seats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn player(&self, seat: usize) -> Option<Arc<RoomSeat>> {
        self.seats().players.get(seat).cloned().flatten()
    }

    /// Everyone currently attached. Spectators that went away are dropped.
    fn audience(&self) -> Vec<Arc<RoomSeat>> {
        let mut seats = self.seats();
        seats.spectators.retain(|seat| !seat.actor.is_failed());
        seats
            .players
            .iter()
            .flatten()
            .chain(seats.spectators.iter())
            .cloned()
            .collect()
    }

    async fn announce(&self, message: &ServerMessage) {
        let audience = self.audience();
        announce_to(self.id, &audience, message).await;
    }
}

async fn announce_to(room_id: RoomId, audience: &[Arc<RoomSeat>], message: &ServerMessage) {
    let failed = broadcast(audience.iter().map(|seat| &seat.actor), message).await;
    if failed > 0 {
        tracing::debug!(%room_id, kind = message.kind(), failed, "broadcast partially failed");
    }
}

/// Handle to a running room. Cheap to clone.
#[derive(Clone)]
pub struct RoomHandle {
    shared: Arc<Shared>,
}

impl RoomHandle {
    /// Creates a room and starts its control task.
    ///
    /// `members` are shuffled once to decide the seat order. Must be called
    /// from within a Tokio runtime.
    pub fn spawn(
        id: RoomId,
        mut members: Vec<User>,
        timeout: Duration,
        opening: impl Into<String>,
        config: &RoomConfig,
    ) -> Self {
        members.shuffle(&mut rand::rng());
        let state = RoomState::new(id, members.clone(), timeout, opening);
        let (publisher, snapshot) = watch::channel(state.snapshot(RoomPhase::Warmup));
        let shared = Arc::new(Shared {
            id,
            seats: Mutex::new(Seats {
                players: vec![None; members.len()],
                ..Seats::default()
            }),
            members,
            snapshot,
        });

        let driver = Driver {
            shared: Arc::clone(&shared),
            state,
            phase: RoomPhase::Warmup,
            publisher,
        };
        tokio::spawn(driver.run(config.warmup));

        Self { shared }
    }

    /// The room's identifier.
    pub fn id(&self) -> RoomId {
        self.shared.id
    }

    /// Seat index of the member with the given identifier.
    pub fn seat_of(&self, player: &str) -> Option<usize> {
        self.shared
            .members
            .iter()
            .position(|user| user.id() == player)
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> RoomSnapshot {
        self.shared.snapshot.borrow().clone()
    }

    /// A receiver that is notified every time the room changes.
    pub fn subscribe(&self) -> watch::Receiver<RoomSnapshot> {
        self.shared.snapshot.clone()
    }

    /// Waits until the room has ended and returns its final snapshot.
    pub async fn ended(&self) -> RoomSnapshot {
        let mut rx = self.subscribe();
        // An error means the control task is gone; what it published last
        // is final either way.
        let _ = rx.wait_for(|snapshot| snapshot.phase.is_ended()).await;
        let last = rx.borrow().clone();
        last
    }

    /// Attaches a connection to the room.
    ///
    /// `player` is the identifier the client presented. If it belongs to a
    /// member, the connection takes over that member's seat: the previous
    /// connection for the seat is closed and the new one is told its index.
    /// Anything else makes the connection a spectator. Once the room has
    /// ended the connection only receives the final result.
    pub async fn attach(&self, player: Option<&str>, actor: ConnectionActor<TurnRequest>) -> Attachment {
        let index = player.and_then(|player| self.seat_of(player));
        let seat = Arc::new(RoomSeat { index, actor });
        let room_id = self.shared.id;

        let placed = {
            let mut seats = self.shared.seats();
            if seats.closed {
                None
            } else {
                match index {
                    Some(i) => Some(seats.players[i].replace(Arc::clone(&seat))),
                    None => {
                        seats.spectators.push(Arc::clone(&seat));
                        Some(None)
                    }
                }
            }
        };

        let Some(replaced) = placed else {
            let winner = self.snapshot().winner;
            let _ = seat.actor.deliver(ServerMessage::End { winner }).await;
            seat.actor.close();
            tracing::debug!(%room_id, "late connection got the final result");
            return Attachment::Ended;
        };

        if let Some(old) = replaced {
            old.actor.close();
        }
        match index {
            Some(i) => {
                tracing::info!(%room_id, seat = i, conn_id = %seat.actor.id(), "member connected");
                let _ = seat.actor.deliver(ServerMessage::Index { index: i }).await;
                Attachment::Member(i)
            }
            None => {
                tracing::debug!(%room_id, conn_id = %seat.actor.id(), "spectator connected");
                Attachment::Spectator
            }
        }
    }
}

impl std::fmt::Debug for RoomHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomHandle")
            .field("id", &self.shared.id)
            .field("members", &self.shared.members.len())
            .finish()
    }
}

/// How one turn ended.
enum Move {
    Wrote(String),
    Skipped,
    TimedOut,
    Dropped(ConnectionError),
}

/// The control task: the only writer of the room state.
struct Driver {
    shared: Arc<Shared>,
    state: RoomState,
    phase: RoomPhase,
    publisher: watch::Sender<RoomSnapshot>,
}

impl Driver {
    async fn run(mut self, warmup: Duration) {
        let room_id = self.state.id();
        tracing::info!(%room_id, members = self.state.members().len(), "room created");

        tokio::time::sleep(warmup).await;
        self.advance();

        let mut turn = if self.state.is_ended() { None } else { Some(0) };
        while let Some(seat) = turn {
            self.play_turn(seat).await;
            turn = self.state.next_turn(seat);
        }

        self.finish().await;
    }

    /// Moves to the next phase and publishes it.
    fn advance(&mut self) {
        if let Some(next) = self.phase.next() {
            self.phase = next;
            self.publish();
        }
    }

    fn publish(&self) {
        self.publisher.send_replace(self.state.snapshot(self.phase));
    }

    async fn play_turn(&mut self, seat: usize) {
        let room_id = self.state.id();
        let started = Instant::now();
        self.state.begin_turn(seat, Utc::now());
        self.publish();
        self.shared.announce(&self.state.turn_message()).await;
        tracing::debug!(%room_id, seat, "turn started");

        let outcome = match self.shared.player(seat) {
            Some(player) => await_move(&player, started, self.state.timeout()).await,
            None => Move::Dropped(ConnectionError::Closed),
        };

        let notice = match outcome {
            Move::Wrote(content) => self.state.record_sentence(seat, content),
            Move::Skipped => {
                tracing::info!(%room_id, seat, "player skipped");
                self.state.record_skip(seat)
            }
            Move::TimedOut => {
                tracing::info!(%room_id, seat, "turn timed out");
                self.state.record_timeout(seat)
            }
            Move::Dropped(error) => {
                tracing::info!(%room_id, seat, %error, "player dropped");
                self.state.record_timeout(seat)
            }
        };
        self.publish();
        self.shared.announce(&ServerMessage::Sentence(notice)).await;
    }

    async fn finish(mut self) {
        let room_id = self.state.id();
        let audience: Vec<Arc<RoomSeat>> = {
            let mut seats = self.shared.seats();
            seats.closed = true;
            let players = std::mem::take(&mut seats.players);
            let spectators = std::mem::take(&mut seats.spectators);
            players.into_iter().flatten().chain(spectators).collect()
        };

        self.advance();

        let winner = self.state.winner();
        announce_to(room_id, &audience, &self.state.turn_message()).await;
        announce_to(room_id, &audience, &ServerMessage::End { winner }).await;
        for seat in &audience {
            seat.actor.close();
        }
        tracing::info!(%room_id, ?winner, sentences = self.state.sentences().len(), "room ended");
    }
}

/// Waits for the seated player's move.
///
/// Requests received before the turn started are stale and ignored, as are
/// requests that neither skip nor carry text.
async fn await_move(player: &RoomSeat, started: Instant, timeout: Duration) -> Move {
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            biased;
            request = player.actor.next_request() => match request {
                Some(Inbound { payload, received }) => {
                    if received < started {
                        continue;
                    }
                    if payload.skip {
                        return Move::Skipped;
                    }
                    if !payload.content.is_empty() {
                        return Move::Wrote(payload.content);
                    }
                }
                None => {
                    return Move::Dropped(player.actor.error().unwrap_or(ConnectionError::Closed));
                }
            },
            error = player.actor.failed() => return Move::Dropped(error),
            () = &mut deadline => return Move::TimedOut,
        }
    }
}
