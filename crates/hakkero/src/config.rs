//! Server configuration.

use std::time::Duration;

use hakkero_matchmaking::QueueConfig;
use hakkero_room::RoomConfig;
use hakkero_session::ActorConfig;
use hakkero_transport::DEFAULT_HANDSHAKE_TIMEOUT;

/// Default listen address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Everything a [`HakkeroServer`](crate::HakkeroServer) needs to know.
///
/// Groups the per-layer settings so one value can be built from flags or a
/// file and handed to the builder.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,
    /// How long a new peer has to complete the WebSocket upgrade.
    pub handshake_timeout: Duration,
    /// Idle limit for every connection.
    pub actor: ActorConfig,
    /// Warmup and room limit.
    pub room: RoomConfig,
    /// Batch size and matchmaking timeouts.
    pub queue: QueueConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_owned(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            actor: ActorConfig::default(),
            room: RoomConfig::default(),
            queue: QueueConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Sets the listen address.
    pub fn with_bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    /// Sets the upgrade deadline for new peers.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Sets the connection settings.
    pub fn with_actor(mut self, actor: ActorConfig) -> Self {
        self.actor = actor;
        self
    }

    /// Sets the room settings.
    pub fn with_room(mut self, room: RoomConfig) -> Self {
        self.room = room;
        self
    }

    /// Sets the matchmaking settings.
    pub fn with_queue(mut self, queue: QueueConfig) -> Self {
        self.queue = queue;
        self
    }
}
