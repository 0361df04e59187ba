//! `HakkeroServer` builder and server loop.
//!
//! This is the entry point for running a Hakkero server. It ties together
//! all the layers: transport → protocol → session → matchmaking → room.

use std::sync::Arc;

use hakkero_matchmaking::{OpenSentencer, Queue, QueueConfig, StaticOpenings};
use hakkero_room::{RoomConfig, RoomRegistry};
use hakkero_session::ActorConfig;
use hakkero_transport::{TransportError, WebSocketListener};

use crate::handler::handle_connection;
use crate::{HakkeroError, ServerConfig};

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<O> {
    pub(crate) actor: ActorConfig,
    pub(crate) rooms: Arc<RoomRegistry>,
    pub(crate) queue: Queue<RoomRegistry, O>,
}

/// Builder for configuring and starting a Hakkero server.
///
/// # Example
///
/// ```rust,no_run
/// use hakkero::prelude::*;
///
/// # async fn run() -> Result<(), HakkeroError> {
/// let server = HakkeroServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct HakkeroServerBuilder {
    config: ServerConfig,
}

impl HakkeroServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the connection settings.
    pub fn actor_config(mut self, actor: ActorConfig) -> Self {
        self.config.actor = actor;
        self
    }

    /// Sets the room settings.
    pub fn room_config(mut self, room: RoomConfig) -> Self {
        self.config.room = room;
        self
    }

    /// Sets the matchmaking settings.
    pub fn queue_config(mut self, queue: QueueConfig) -> Self {
        self.config.queue = queue;
        self
    }

    /// Binds the listener, opening stories with the built-in sentences.
    pub async fn build(self) -> Result<HakkeroServer<StaticOpenings>, HakkeroError> {
        self.build_with(StaticOpenings::default()).await
    }

    /// Binds the listener, opening stories with sentences from `opener`.
    pub async fn build_with<O: OpenSentencer>(
        self,
        opener: O,
    ) -> Result<HakkeroServer<O>, HakkeroError> {
        let listener = WebSocketListener::bind(&self.config.bind_addr)
            .await?
            .with_handshake_timeout(self.config.handshake_timeout);

        let rooms = Arc::new(RoomRegistry::new(self.config.room.clone()));
        let queue = Queue::new(self.config.queue.clone(), Arc::clone(&rooms), opener);
        let state = Arc::new(ServerState {
            actor: self.config.actor.clone(),
            rooms,
            queue,
        });

        Ok(HakkeroServer {
            listener,
            config: self.config,
            state,
        })
    }
}

/// A bound Hakkero server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct HakkeroServer<O = StaticOpenings> {
    listener: WebSocketListener,
    config: ServerConfig,
    state: Arc<ServerState<O>>,
}

impl HakkeroServer {
    /// Creates a new builder.
    pub fn builder() -> HakkeroServerBuilder {
        HakkeroServerBuilder::new()
    }
}

impl<O: OpenSentencer> HakkeroServer<O> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// The configuration the server was built with.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Every room this server has created, for reading snapshots.
    pub fn rooms(&self) -> Arc<RoomRegistry> {
        Arc::clone(&self.state.rooms)
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a handler task for each one.
    /// Runs until the process is terminated.
    pub async fn run(self) -> Result<(), HakkeroError> {
        tracing::info!(addr = %self.config.bind_addr, "Hakkero server running");

        loop {
            match self.listener.accept().await {
                Ok(pending) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        match handle_connection(pending, state).await {
                            Ok(()) => {}
                            Err(HakkeroError::Transport(TransportError::Rejected {
                                status,
                                reason,
                            })) => {
                                tracing::debug!(status, %reason, "upgrade refused");
                            }
                            Err(e) => {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
