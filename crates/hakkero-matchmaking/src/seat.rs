use hakkero_protocol::ReadyResponse;
use hakkero_session::{ConnectionActor, User};

/// A player waiting for a match: their connection and who they are.
#[derive(Debug)]
pub struct QueueSeat {
    actor: ConnectionActor<ReadyResponse>,
    user: User,
}

impl QueueSeat {
    /// Pairs a queue connection with its user.
    pub fn new(actor: ConnectionActor<ReadyResponse>, user: User) -> Self {
        Self { actor, user }
    }

    /// The underlying connection.
    pub fn actor(&self) -> &ConnectionActor<ReadyResponse> {
        &self.actor
    }

    /// The player.
    pub fn user(&self) -> &User {
        &self.user
    }
}
