//! The matchmaking queue and its ready-check.
//!
//! ```text
//! enqueue ─► waiting list ──(limit reached)──► ready-check ─┬─► room created
//!    ▲                                                      │
//!    └──────────── acceptors of a failed check ◄────────────┘
//! ```
//!
//! The waiting list is guarded by a lock that is never held across an
//! `.await`: a full batch is detached under the lock and checked outside it,
//! so several ready-checks can run at the same time while new players keep
//! joining. Queue-size notices are numbered under that lock and sent in
//! order; a notice overtaken by a newer one is not sent at all.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;

use hakkero_protocol::{Announcement, RoomId, ServerMessage};
use hakkero_room::RoomManager;
use hakkero_session::{ConnectionError, Inbound, broadcast};
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::{MatchmakingError, OpenSentencer, QueueConfig, QueueSeat};

const REJECTED: &str = "You have rejected a game. Please refresh the page to join again.";
const TIMED_OUT: &str = "You have timed out a game. Please refresh the page to join again.";
const CHECK_FAILED: &str = "Match cannot start because someone failed the ready check.";
const NO_OPENING: &str = "Cannot find an opening sentence. Match cancelled!";
const NO_ROOM: &str = "Cannot set up a game room. Match cancelled!";

/// A player's answer to the ready-check.
#[derive(Debug)]
enum Decision {
    Accepted,
    Declined,
    TimedOut,
    Dropped(ConnectionError),
}

/// Groups waiting players into matches.
pub struct Queue<R, O> {
    config: QueueConfig,
    rooms: Arc<R>,
    opener: O,
    waiting: Mutex<Waiting>,
    /// Sequence number of the last queue-size notice sent.
    announced: tokio::sync::Mutex<u64>,
}

#[derive(Default)]
struct Waiting {
    seats: Vec<Arc<QueueSeat>>,
    revision: u64,
}

/// Result of putting one seat on the waiting list.
struct Admission {
    revision: u64,
    audience: Vec<Arc<QueueSeat>>,
    batch: Option<Vec<Arc<QueueSeat>>>,
}

impl<R, O> Queue<R, O>
where
    R: RoomManager,
    O: OpenSentencer,
{
    /// Creates an empty queue that creates its rooms through `rooms`.
    pub fn new(config: QueueConfig, rooms: Arc<R>, opener: O) -> Self {
        Self {
            config: config.validated(),
            rooms,
            opener,
            waiting: Mutex::new(Waiting::default()),
            announced: tokio::sync::Mutex::new(0),
        }
    }

    /// The queue's settings.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Number of players currently waiting.
    pub fn waiting(&self) -> usize {
        self.lock().seats.len()
    }

    /// Adds a player to the queue.
    ///
    /// Everyone waiting is told the new queue size. If the player completes
    /// a batch, the ready-check runs on the caller's task. Players a check
    /// does not match go back to the tail of the queue as soon as that check
    /// is over, even while checks for batches they completed in turn are
    /// still running; this returns once every such check has finished.
    pub async fn enqueue(&self, seat: QueueSeat) {
        let mut checks = FuturesUnordered::new();
        let mut batches = self.readmit(vec![Arc::new(seat)]).await;
        loop {
            checks.extend(batches.drain(..).map(|batch| self.ready_check(batch)));
            let Some(recycled) = checks.next().await else {
                break;
            };
            batches = self.readmit(recycled).await;
        }
    }

    /// Puts every seat back on the waiting list, in order, and returns the
    /// batches that filled up along the way.
    async fn readmit(&self, seats: Vec<Arc<QueueSeat>>) -> Vec<Vec<Arc<QueueSeat>>> {
        let mut batches = Vec::new();
        for seat in seats {
            let admission = self.admit(seat);
            self.announce_size(admission.revision, &admission.audience).await;
            batches.extend(admission.batch);
        }
        batches
    }

    /// Sends the queue size, unless a newer notice has gone out already.
    async fn announce_size(&self, revision: u64, audience: &[Arc<QueueSeat>]) {
        let mut announced = self.announced.lock().await;
        if revision <= *announced {
            return;
        }
        *announced = revision;
        broadcast(
            audience.iter().map(|seat| seat.actor()),
            &ServerMessage::Size {
                size: audience.len(),
            },
        )
        .await;
    }

    /// Appends `seat` and, if that fills a batch, detaches it.
    ///
    /// The admission carries everyone who was waiting after the append.
    fn admit(&self, seat: Arc<QueueSeat>) -> Admission {
        let mut waiting = self.lock();
        let before = waiting.seats.len();
        waiting.seats.retain(|seat| !seat.actor().is_failed());
        if waiting.seats.len() < before {
            tracing::debug!(pruned = before - waiting.seats.len(), "dropped dead queue connections");
        }

        tracing::debug!(username = seat.user().username(), "player queued");
        waiting.seats.push(seat);
        waiting.revision += 1;
        let audience = waiting.seats.clone();
        let batch = (waiting.seats.len() >= self.config.player_limit)
            .then(|| waiting.seats.drain(..self.config.player_limit).collect());
        Admission {
            revision: waiting.revision,
            audience,
            batch,
        }
    }

    /// Runs the ready-check for one batch. Returns the players who accepted
    /// but did not get a room.
    async fn ready_check(&self, batch: Vec<Arc<QueueSeat>>) -> Vec<Arc<QueueSeat>> {
        let size = batch.len();
        tracing::info!(players = size, "match found, running ready-check");

        let found_at = Instant::now();
        broadcast(batch.iter().map(|seat| seat.actor()), &ServerMessage::Found {}).await;

        let mut checks = JoinSet::new();
        for (slot, seat) in batch.into_iter().enumerate() {
            let timeout = self.config.ready_timeout;
            checks.spawn(async move {
                let decision = await_decision(&seat, found_at, timeout).await;
                let accepted = matches!(decision, Decision::Accepted);
                if !accepted {
                    settle(&seat, decision).await;
                }
                (slot, accepted.then_some(seat))
            });
        }

        let mut accepted = Vec::with_capacity(size);
        while let Some(joined) = checks.join_next().await {
            match joined {
                Ok((slot, Some(seat))) => accepted.push((slot, seat)),
                Ok((_, None)) => {}
                Err(e) => tracing::warn!(error = %e, "ready-check task failed"),
            }
        }
        accepted.sort_by_key(|(slot, _)| *slot);
        let accepted: Vec<Arc<QueueSeat>> = accepted.into_iter().map(|(_, seat)| seat).collect();

        if accepted.len() < size {
            tracing::info!(accepted = accepted.len(), players = size, "ready-check failed");
            announce(&accepted, Announcement::failure(CHECK_FAILED)).await;
            return accepted;
        }

        match self.open_room(&accepted) {
            Ok(room_id) => {
                tracing::info!(%room_id, players = size, "match started");
                let text = format!("You have been assigned to room {}. Match starting soon!", room_id.0);
                announce(&accepted, Announcement::success(room_id, text)).await;
                for seat in &accepted {
                    seat.actor().close();
                }
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, "match cancelled");
                let text = match e {
                    MatchmakingError::OpeningUnavailable(_) => NO_OPENING,
                    MatchmakingError::Room(_) => NO_ROOM,
                };
                announce(&accepted, Announcement::failure(text)).await;
                tokio::time::sleep(self.config.cancel_pause).await;
                accepted
            }
        }
    }

    fn open_room(&self, accepted: &[Arc<QueueSeat>]) -> Result<RoomId, MatchmakingError> {
        let opening = self.opener.next()?;
        let members = accepted.iter().map(|seat| seat.user().clone()).collect();
        Ok(self
            .rooms
            .create(members, self.config.turn_timeout, opening)?)
    }

    fn lock(&self) -> MutexGuard<'_, Waiting> {
        self.waiting.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn announce(audience: &[Arc<QueueSeat>], announcement: Announcement) {
    broadcast(
        audience.iter().map(|seat| seat.actor()),
        &ServerMessage::Announcement(announcement),
    )
    .await;
}

/// Waits for the player's answer to `found`.
///
/// Answers received before `found_at` belong to an earlier check and are
/// ignored.
async fn await_decision(seat: &QueueSeat, found_at: Instant, timeout: Duration) -> Decision {
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            biased;
            response = seat.actor().next_request() => match response {
                Some(Inbound { payload, received }) if received >= found_at => {
                    return if payload.accepted {
                        Decision::Accepted
                    } else {
                        Decision::Declined
                    };
                }
                Some(_) => continue,
                None => {
                    let error = seat.actor().error().unwrap_or(ConnectionError::Closed);
                    return Decision::Dropped(error);
                }
            },
            error = seat.actor().failed() => return Decision::Dropped(error),
            () = &mut deadline => return Decision::TimedOut,
        }
    }
}

/// Tells a player who did not accept why they are out, then closes them.
async fn settle(seat: &QueueSeat, decision: Decision) {
    let username = seat.user().username();
    let notice = match decision {
        Decision::Declined => Some(REJECTED),
        Decision::TimedOut => Some(TIMED_OUT),
        Decision::Dropped(ref error) => {
            tracing::debug!(username, %error, "player dropped during ready-check");
            None
        }
        Decision::Accepted => return,
    };
    if let Some(text) = notice {
        tracing::debug!(username, ?decision, "player left the ready-check");
        let _ = seat
            .actor()
            .deliver(ServerMessage::Announcement(Announcement::failure(text)))
            .await;
    }
    seat.actor().close();
}
