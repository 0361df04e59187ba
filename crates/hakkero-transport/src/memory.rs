//! In-process [`Connection`] pair.
//!
//! [`MemoryConnection::pair`] returns the server half (implements
//! [`Connection`]) and a [`MemoryPeer`] that plays the remote client.
//! Dropping the peer behaves like the client vanishing: pending and future
//! `recv` calls on the server half return `Ok(None)` and `send` fails.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::{Mutex as AsyncMutex, mpsc};

use crate::{Connection, ConnectionId, TransportError};

/// Memory connections count down from the top of the id space so they never
/// collide with WebSocket ids in mixed logs.
static NEXT_MEMORY_ID: AtomicU64 = AtomicU64::new(u64::MAX);

/// Server half of an in-memory connection.
pub struct MemoryConnection {
    id: ConnectionId,
    to_peer: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    from_peer: AsyncMutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    closed: AtomicBool,
}

/// Client half of an in-memory connection.
pub struct MemoryPeer {
    to_server: mpsc::UnboundedSender<Vec<u8>>,
    from_server: AsyncMutex<mpsc::UnboundedReceiver<Vec<u8>>>,
}

impl MemoryConnection {
    /// Creates a connected server/client pair.
    pub fn pair() -> (MemoryConnection, MemoryPeer) {
        let (to_peer, from_server) = mpsc::unbounded_channel();
        let (to_server, from_peer) = mpsc::unbounded_channel();
        let id = ConnectionId::new(NEXT_MEMORY_ID.fetch_sub(1, Ordering::Relaxed));
        let conn = MemoryConnection {
            id,
            to_peer: Mutex::new(Some(to_peer)),
            from_peer: AsyncMutex::new(from_peer),
            closed: AtomicBool::new(false),
        };
        let peer = MemoryPeer {
            to_server,
            from_server: AsyncMutex::new(from_server),
        };
        (conn, peer)
    }

    /// Returns `true` once [`Connection::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Connection for MemoryConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let guard = self
            .to_peer
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let Some(to_peer) = guard.as_ref() else {
            return Err(TransportError::ConnectionClosed("closed locally".into()));
        };
        to_peer
            .send(data.to_vec())
            .map_err(|_| TransportError::ConnectionClosed("peer went away".into()))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        if self.is_closed() {
            return Ok(None);
        }
        Ok(self.from_peer.lock().await.recv().await)
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.closed.store(true, Ordering::Release);
        // Dropping the sender ends the peer's stream.
        self.to_peer
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

impl MemoryPeer {
    /// Sends a frame to the server half. Returns `false` if it is gone.
    pub fn send(&self, data: impl AsRef<[u8]>) -> bool {
        self.to_server.send(data.as_ref().to_vec()).is_ok()
    }

    /// Receives the next frame from the server half.
    ///
    /// Returns `None` once the server closed the connection and every
    /// frame sent before that has been read.
    pub async fn recv(&self) -> Option<Vec<u8>> {
        self.from_server.lock().await.recv().await
    }
}
