//! Upgrade targets.
//!
//! Clients pick what they connect to through the request target of the
//! WebSocket upgrade:
//!
//! | target | meaning |
//! |--------|---------|
//! | `/queue?username=<name>` | join the matchmaking queue |
//! | `/rooms/<id>?player=<identifier>` | play for a member, or watch |
//!
//! Anything that does not parse is refused with `400 Bad Request` before the
//! upgrade completes.
//!
//! Only WebSocket upgrades are routed. Room snapshots have no HTTP endpoint
//! here: a host that wants clients to poll them (for instance with
//! `POST /rooms/<id>`) serves [`RoomSnapshot`](hakkero_room::RoomSnapshot)
//! JSON itself, reading it from
//! [`HakkeroServer::rooms`](crate::HakkeroServer::rooms).

use hakkero_protocol::RoomId;
use hakkero_session::validate_username;
use hakkero_transport::Rejection;

/// A parsed upgrade target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Join the queue under this display name. Already validated.
    Queue {
        /// The chosen display name.
        username: String,
    },
    /// Connect to a room.
    Room {
        /// Which room.
        id: RoomId,
        /// The identifier handed out by the queue, if the client has one.
        player: Option<String>,
    },
}

impl Route {
    /// Parses a request target such as `/rooms/3?player=abc`.
    ///
    /// # Errors
    /// A `400` [`Rejection`] if the path is unknown, the room id is not a
    /// number, or the username is missing or invalid.
    pub fn parse(target: &str) -> Result<Self, Rejection> {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));

        if path == "/queue" {
            let username = query_param(query, "username")
                .ok_or_else(|| Rejection::bad_request("missing username"))?;
            validate_username(&username).map_err(|e| Rejection::bad_request(e.to_string()))?;
            return Ok(Route::Queue { username });
        }

        if let Some(id) = path.strip_prefix("/rooms/") {
            let id = id
                .parse::<u64>()
                .map_err(|_| Rejection::bad_request(format!("invalid room id: {id}")))?;
            let player = query_param(query, "player").filter(|player| !player.is_empty());
            return Ok(Route::Room {
                id: RoomId(id),
                player,
            });
        }

        Err(Rejection::bad_request(format!("unknown path: {path}")))
    }
}

/// First value of `key` in a form-urlencoded query string, decoded.
fn query_param(query: &str, key: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_queue() {
        assert_eq!(
            Route::parse("/queue?username=ada").unwrap(),
            Route::Queue {
                username: "ada".into()
            }
        );
    }

    #[test]
    fn test_parse_queue_decodes_username() {
        assert_eq!(
            Route::parse("/queue?username=Ada+L%C3%B6w").unwrap(),
            Route::Queue {
                username: "Ada Löw".into()
            }
        );
    }

    #[test]
    fn test_parse_queue_without_username_is_bad_request() {
        let rejection = Route::parse("/queue").unwrap_err();
        assert_eq!(rejection.status, 400);
        assert_eq!(Route::parse("/queue?name=ada").unwrap_err().status, 400);
    }

    #[test]
    fn test_parse_queue_invalid_username_is_bad_request() {
        assert_eq!(Route::parse("/queue?username=").unwrap_err().status, 400);
        let long = "x".repeat(21);
        assert_eq!(
            Route::parse(&format!("/queue?username={long}"))
                .unwrap_err()
                .status,
            400
        );
    }

    #[test]
    fn test_parse_room_with_player() {
        assert_eq!(
            Route::parse("/rooms/7?player=abc123").unwrap(),
            Route::Room {
                id: RoomId(7),
                player: Some("abc123".into())
            }
        );
    }

    #[test]
    fn test_parse_room_without_player_is_spectator() {
        let expected = Route::Room {
            id: RoomId(0),
            player: None,
        };
        assert_eq!(Route::parse("/rooms/0").unwrap(), expected);
        assert_eq!(Route::parse("/rooms/0?player=").unwrap(), expected);
    }

    #[test]
    fn test_parse_room_bad_id_is_bad_request() {
        assert_eq!(Route::parse("/rooms/abc").unwrap_err().status, 400);
        assert_eq!(Route::parse("/rooms/").unwrap_err().status, 400);
        assert_eq!(Route::parse("/rooms/-1").unwrap_err().status, 400);
    }

    #[test]
    fn test_parse_room_subpath_is_bad_request() {
        assert_eq!(Route::parse("/rooms/3/snapshot").unwrap_err().status, 400);
    }

    #[test]
    fn test_parse_unknown_path_is_bad_request() {
        assert_eq!(Route::parse("/").unwrap_err().status, 400);
        assert_eq!(Route::parse("/lobby?username=ada").unwrap_err().status, 400);
    }
}
