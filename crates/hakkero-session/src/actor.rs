//! The connection actor: one peer, two tasks, one terminal error.
//!
//! A network peer can stall, vanish or send garbage at any moment. The rest
//! of the system should not have to care, so every connection is wrapped in
//! a [`ConnectionActor`] that owns two background tasks:
//!
//! ```text
//!               deliver()                      next_request()
//!                   │                                ▲
//!                   ▼                                │
//!  outbound queue ──► writer task ──► Connection ──► reader task ──► inbound queue
//!                        │                │              │
//!                        └─────────► ErrorLatch ◄────────┘
//! ```
//!
//! - The **writer** takes messages in FIFO order, encodes and sends them, and
//!   tells each caller of [`deliver`](ConnectionActor::deliver) how its
//!   attempt went.
//! - The **reader** decodes inbound frames into `In`, stamps them with their
//!   arrival time and queues them for [`next_request`](ConnectionActor::next_request).
//!   The queue is bounded; a peer that talks while nobody listens loses the
//!   surplus frames.
//! - The first failure on either side fires the [`ErrorLatch`]. From then on
//!   nothing touches the transport again: the reader closes it and stops,
//!   the writer answers every pending and future delivery with the error.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use hakkero_protocol::{Codec, ServerMessage};
use hakkero_transport::{Connection, ConnectionId};
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::time::Instant;

use crate::{ConnectionError, ErrorLatch};

/// Tunables for a [`ConnectionActor`].
#[derive(Debug, Clone)]
pub struct ActorConfig {
    /// How long the reader waits for the next frame before giving up on the
    /// peer with [`ConnectionError::Idle`].
    ///
    /// Default: 5 minutes.
    pub read_timeout: Duration,

    /// How many decoded requests may wait for
    /// [`next_request`](ConnectionActor::next_request). Frames arriving while
    /// the queue is full are dropped.
    ///
    /// Default: 32.
    pub inbound_capacity: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(5 * 60),
            inbound_capacity: 32,
        }
    }
}

impl ActorConfig {
    /// Sets the idle read timeout.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Sets how many unread requests are kept. Clamped to at least 1.
    pub fn with_inbound_capacity(mut self, inbound_capacity: usize) -> Self {
        self.inbound_capacity = inbound_capacity.max(1);
        self
    }
}

/// A decoded request together with the moment it arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound<T> {
    /// The decoded request.
    pub payload: T,
    /// When the reader received it.
    pub received: Instant,
}

struct Outgoing {
    message: ServerMessage,
    done: oneshot::Sender<Result<(), ConnectionError>>,
}

/// Handle to one peer. See the [module docs](self).
///
/// `In` is the request type this peer is expected to send. Dropping the
/// handle closes the connection.
pub struct ConnectionActor<In> {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<Outgoing>,
    inbound: Mutex<mpsc::Receiver<Inbound<In>>>,
    latch: ErrorLatch,
}

impl<In> ConnectionActor<In>
where
    In: DeserializeOwned + Send + 'static,
{
    /// Wraps `conn` and starts its reader and writer tasks.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<C, K>(conn: C, codec: K, config: &ActorConfig) -> Self
    where
        C: Connection,
        K: Codec,
    {
        let id = conn.id();
        let conn = Arc::new(conn);
        let codec = Arc::new(codec);
        let latch = ErrorLatch::new();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound) = mpsc::channel(config.inbound_capacity.max(1));

        tokio::spawn(write_loop(
            Arc::clone(&conn),
            Arc::clone(&codec),
            outbound_rx,
            latch.clone(),
        ));
        tokio::spawn(
            Reader {
                conn,
                codec,
                inbound: inbound_tx,
                latch: latch.clone(),
                read_timeout: config.read_timeout,
                _request: PhantomData,
            }
            .run(),
        );

        tracing::debug!(conn_id = %id, "connection actor started");
        Self {
            id,
            outbound,
            inbound: Mutex::new(inbound),
            latch,
        }
    }
}

impl<In> ConnectionActor<In> {
    /// The underlying transport's identifier.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Sends one message and waits until the attempt is over.
    ///
    /// Messages go out in the order `deliver` was called. Returns as soon as
    /// the frame has been written, or with the actor's terminal error if the
    /// write failed or the actor had already failed, in which case the
    /// transport is not touched.
    pub async fn deliver(&self, message: ServerMessage) -> Result<(), ConnectionError> {
        if let Some(error) = self.latch.get() {
            return Err(error);
        }
        let (done, outcome) = oneshot::channel();
        if self.outbound.send(Outgoing { message, done }).is_err() {
            return Err(self.terminal_error());
        }
        match outcome.await {
            Ok(result) => result,
            Err(_) => Err(self.terminal_error()),
        }
    }

    /// Waits for the next request from the peer.
    ///
    /// Returns `None` once the reader has stopped and every request received
    /// before that has been handed out. Cancel-safe: dropping the future
    /// loses no request.
    pub async fn next_request(&self) -> Option<Inbound<In>> {
        self.inbound.lock().await.recv().await
    }

    /// Waits until the actor fails and returns why.
    pub async fn failed(&self) -> ConnectionError {
        self.latch.wait().await
    }

    /// The terminal error, if the actor has failed.
    pub fn error(&self) -> Option<ConnectionError> {
        self.latch.get()
    }

    /// Returns `true` once the actor has failed or been closed.
    pub fn is_failed(&self) -> bool {
        self.latch.is_set()
    }

    /// Stops both tasks and releases the transport. Idempotent.
    ///
    /// Closing counts as the terminal error [`ConnectionError::Closed`]
    /// unless another error came first.
    pub fn close(&self) {
        if self.latch.fire(ConnectionError::Closed) {
            tracing::debug!(conn_id = %self.id, "connection actor closed");
        }
    }

    fn terminal_error(&self) -> ConnectionError {
        self.latch.get().unwrap_or(ConnectionError::Closed)
    }
}

impl<In> Drop for ConnectionActor<In> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<In> std::fmt::Debug for ConnectionActor<In> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionActor")
            .field("id", &self.id)
            .field("error", &self.latch.get())
            .finish()
    }
}

async fn write_loop<C, K>(
    conn: Arc<C>,
    codec: Arc<K>,
    mut outbound: mpsc::UnboundedReceiver<Outgoing>,
    latch: ErrorLatch,
) where
    C: Connection,
    K: Codec,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = latch.wait() => None,
            next = outbound.recv() => next,
        };
        let Some(Outgoing { message, done }) = next else {
            break;
        };
        if let Some(error) = latch.get() {
            let _ = done.send(Err(error));
            continue;
        }

        let kind = message.kind();
        let result = match codec.encode(&message) {
            Ok(frame) => conn
                .send(&frame)
                .await
                .map_err(|e| ConnectionError::Write(e.to_string())),
            Err(e) => {
                tracing::warn!(conn_id = %conn.id(), kind, error = %e, "failed to encode message");
                Err(ConnectionError::Write(e.to_string()))
            }
        };
        match &result {
            Ok(()) => tracing::debug!(conn_id = %conn.id(), kind, "message delivered"),
            Err(error) => {
                if latch.fire(error.clone()) {
                    tracing::debug!(conn_id = %conn.id(), %error, "write failed");
                }
            }
        }
        // The caller may have given up waiting; that is fine.
        let _ = done.send(result);
    }
}

struct Reader<C, K, In> {
    conn: Arc<C>,
    codec: Arc<K>,
    inbound: mpsc::Sender<Inbound<In>>,
    latch: ErrorLatch,
    read_timeout: Duration,
    _request: PhantomData<fn() -> In>,
}

impl<C, K, In> Reader<C, K, In>
where
    C: Connection,
    K: Codec,
    In: DeserializeOwned + Send + 'static,
{
    async fn run(self) {
        let conn_id = self.conn.id();
        loop {
            let frame = tokio::select! {
                biased;
                _ = self.latch.wait() => break,
                frame = tokio::time::timeout(self.read_timeout, self.conn.recv()) => frame,
            };
            match frame {
                Ok(Ok(Some(bytes))) => match self.codec.decode::<In>(&bytes) {
                    Ok(payload) => {
                        let request = Inbound {
                            payload,
                            received: Instant::now(),
                        };
                        match self.inbound.try_send(request) {
                            Ok(()) => {}
                            Err(mpsc::error::TrySendError::Full(_)) => {
                                tracing::debug!(%conn_id, "inbound queue full, dropping request");
                            }
                            // Nobody left to read: the handle is gone and the
                            // latch is about to fire.
                            Err(mpsc::error::TrySendError::Closed(_)) => {}
                        }
                    }
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "dropping undecodable frame");
                    }
                },
                Ok(Ok(None)) => {
                    self.latch.fire(ConnectionError::Closed);
                    break;
                }
                Ok(Err(e)) => {
                    self.latch.fire(ConnectionError::Read(e.to_string()));
                    break;
                }
                Err(_) => {
                    self.latch.fire(ConnectionError::Idle(self.read_timeout));
                    break;
                }
            }
        }

        if let Some(error) = self.latch.get() {
            tracing::debug!(%conn_id, %error, "connection actor stopping");
        }
        drop(self.inbound);
        if let Err(e) = self.conn.close().await {
            tracing::debug!(%conn_id, error = %e, "error while closing connection");
        }
    }
}
