//! Per-connection handler: upgrade, route, and hand-off.
//!
//! Each accepted TCP stream gets its own Tokio task running this handler.
//! The flow is:
//!   1. Upgrade to WebSocket, refusing bad targets with 400 / 404
//!   2. Wrap the connection in a [`ConnectionActor`]
//!   3. Queue: send the player's identifier, then enqueue them
//!      Room: attach to the room as a member or spectator
//!
//! The handler does not outlive the hand-off; the queue or room owns the
//! actor from then on.

use std::sync::Arc;

use hakkero_matchmaking::{OpenSentencer, QueueSeat};
use hakkero_protocol::{JsonCodec, ReadyResponse, ServerMessage, TurnRequest};
use hakkero_room::{RoomHandle, RoomManager, RoomRegistry};
use hakkero_session::{ConnectionActor, User};
use hakkero_transport::{Connection, PendingUpgrade, Rejection};

use crate::route::Route;
use crate::server::ServerState;
use crate::HakkeroError;

/// What an accepted upgrade turned out to be for.
enum Target {
    Queue(User),
    Room {
        room: RoomHandle,
        player: Option<String>,
    },
}

/// Resolves a request target during the upgrade.
fn resolve(target: &str, rooms: &RoomRegistry) -> Result<Target, Rejection> {
    match Route::parse(target)? {
        Route::Queue { username } => {
            let user = User::new(username).map_err(|e| Rejection::bad_request(e.to_string()))?;
            Ok(Target::Queue(user))
        }
        Route::Room { id, player } => {
            let room = rooms
                .get(id)
                .map_err(|e| Rejection::not_found(e.to_string()))?;
            Ok(Target::Room { room, player })
        }
    }
}

/// Handles a single connection from accept to hand-off.
pub(crate) async fn handle_connection<O>(
    pending: PendingUpgrade,
    state: Arc<ServerState<O>>,
) -> Result<(), HakkeroError>
where
    O: OpenSentencer,
{
    let addr = pending.peer_addr();
    let rooms = Arc::clone(&state.rooms);
    let (conn, target) = pending
        .upgrade(move |target: &str| resolve(target, &rooms))
        .await?;
    let conn_id = conn.id();

    match target {
        Target::Queue(user) => {
            tracing::info!(%conn_id, %addr, username = user.username(), "player joined the queue");
            let actor = ConnectionActor::<ReadyResponse>::spawn(conn, JsonCodec, &state.actor);
            actor
                .deliver(ServerMessage::Id {
                    id: user.id().to_owned(),
                })
                .await?;
            state.queue.enqueue(QueueSeat::new(actor, user)).await;
        }
        Target::Room { room, player } => {
            let actor = ConnectionActor::<TurnRequest>::spawn(conn, JsonCodec, &state.actor);
            let attachment = room.attach(player.as_deref(), actor).await;
            tracing::debug!(%conn_id, %addr, room_id = %room.id(), ?attachment, "connection attached to room");
        }
    }

    Ok(())
}
