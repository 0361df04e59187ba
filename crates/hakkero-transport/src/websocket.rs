//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! Accepting is split in two steps so a slow handshake never stalls the
//! accept loop: [`WebSocketListener::accept`] only takes the TCP stream, and
//! [`PendingUpgrade::upgrade`] (usually run on a spawned task) performs the
//! HTTP upgrade, letting the caller inspect the request target and refuse it
//! with a proper status code before any WebSocket frame is exchanged.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;

use crate::{Connection, ConnectionId, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = WebSocketStream<TcpStream>;

/// How long a peer has to send its upgrade request by default.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Listens for TCP connections that are expected to upgrade to WebSocket.
pub struct WebSocketListener {
    listener: TcpListener,
    handshake_timeout: Duration,
}

impl WebSocketListener {
    /// Binds a new listener to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket listener bound");
        Ok(Self {
            listener,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        })
    }

    /// Limits how long [`PendingUpgrade::upgrade`] waits for the handshake.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Returns the local address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Waits for the next TCP connection. The upgrade is left to the caller.
    pub async fn accept(&self) -> Result<PendingUpgrade, TransportError> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        Ok(PendingUpgrade {
            stream,
            addr,
            handshake_timeout: self.handshake_timeout,
        })
    }
}

/// Why an upgrade request is being refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// HTTP status code of the refusal.
    pub status: u16,
    /// Response body.
    pub reason: String,
}

impl Rejection {
    /// A `400 Bad Request` refusal.
    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self {
            status: 400,
            reason: reason.into(),
        }
    }

    /// A `404 Not Found` refusal.
    pub fn not_found(reason: impl Into<String>) -> Self {
        Self {
            status: 404,
            reason: reason.into(),
        }
    }
}

/// A TCP connection that has not yet completed the WebSocket handshake.
pub struct PendingUpgrade {
    stream: TcpStream,
    addr: SocketAddr,
    handshake_timeout: Duration,
}

impl PendingUpgrade {
    /// The remote address of the peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Performs the WebSocket handshake.
    ///
    /// `inspect` receives the request target (path and query, e.g.
    /// `/rooms/3?player=abc`) and either accepts it, yielding a value that is
    /// returned alongside the connection, or refuses it. A refusal is answered
    /// with the given HTTP status and surfaces as
    /// [`TransportError::Rejected`]. A peer that does not finish the
    /// handshake within the listener's handshake timeout is dropped with an
    /// [`std::io::ErrorKind::TimedOut`] error.
    pub async fn upgrade<T, F>(self, inspect: F) -> Result<(WebSocketConnection, T), TransportError>
    where
        T: Send,
        F: FnOnce(&str) -> Result<T, Rejection> + Send + Unpin,
    {
        let addr = self.addr;
        let mut outcome: Option<Result<T, Rejection>> = None;

        let callback = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
            let target = request
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("/");
            match inspect(target) {
                Ok(value) => {
                    outcome = Some(Ok(value));
                    Ok(response)
                }
                Err(rejection) => {
                    let mut refusal = ErrorResponse::new(Some(rejection.reason.clone()));
                    *refusal.status_mut() =
                        StatusCode::from_u16(rejection.status).unwrap_or(StatusCode::BAD_REQUEST);
                    outcome = Some(Err(rejection));
                    Err(refusal)
                }
            }
        };

        let handshake = match tokio::time::timeout(
            self.handshake_timeout,
            tokio_tungstenite::accept_hdr_async(self.stream, callback),
        )
        .await
        {
            Ok(handshake) => handshake,
            Err(_) => {
                tracing::debug!(%addr, "upgrade request not received in time");
                return Err(TransportError::AcceptFailed(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "handshake timed out",
                )));
            }
        };

        match (handshake, outcome) {
            (_, Some(Err(rejection))) => {
                tracing::debug!(%addr, status = rejection.status, reason = %rejection.reason, "upgrade rejected");
                Err(TransportError::Rejected {
                    status: rejection.status,
                    reason: rejection.reason,
                })
            }
            (Ok(ws), Some(Ok(value))) => {
                let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
                tracing::debug!(%id, %addr, "accepted WebSocket connection");
                let (sink, stream) = ws.split();
                let conn = WebSocketConnection {
                    id,
                    sink: Mutex::new(sink),
                    stream: Mutex::new(stream),
                };
                Ok((conn, value))
            }
            (Err(e), _) => Err(TransportError::AcceptFailed(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                e,
            ))),
            (Ok(_), None) => Err(TransportError::AcceptFailed(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "handshake completed without a request target",
            ))),
        }
    }
}

/// A single upgraded WebSocket connection.
///
/// The stream is split so that a task blocked in [`Connection::recv`] never
/// holds up a concurrent [`Connection::send`].
pub struct WebSocketConnection {
    id: ConnectionId,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        // JSON clients expect text frames; anything else goes out as binary.
        let msg = match std::str::from_utf8(data) {
            Ok(text) => Message::text(text),
            Err(_) => Message::Binary(data.to_vec().into()),
        };
        self.sink.lock().await.send(msg).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(std::io::ErrorKind::BrokenPipe, e))
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return Ok(Some(data.into())),
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_bytes().to_vec())),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // skip ping/pong/frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        e,
                    )));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink.lock().await.close().await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(std::io::ErrorKind::BrokenPipe, e))
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
