//! Wire types for Hakkero.
//!
//! Every server → client frame is one [`ServerMessage`], serialized as an
//! adjacently tagged envelope:
//!
//! ```text
//! { "type": "turn", "message": { "status": ["turn", "active"], "time": "..." } }
//! ```
//!
//! Clients answer with bare objects: a [`ReadyResponse`] while queued and a
//! [`TurnRequest`] inside a room.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifier of a room: its position in the room registry.
///
/// `#[serde(transparent)]` keeps it a bare integer on the wire, which is
/// what clients put in `/rooms/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Room state shared with clients
// ---------------------------------------------------------------------------

/// Where a seat stands in the turn rotation.
///
/// `Out` and `Disconnected` are terminal. The only transitions are
/// `Active -> Turn`, `Turn -> Active` (wrote a sentence),
/// `Turn -> Out` (skipped) and `Turn -> Disconnected` (timed out or dropped).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatStatus {
    /// Still in the game, waiting for their turn.
    #[default]
    Active,
    /// Currently writing.
    Turn,
    /// Gave up their place by skipping.
    #[serde(rename = "skipped")]
    Out,
    /// Missed a turn through a timeout or a dropped connection.
    Disconnected,
}

impl SeatStatus {
    /// Returns `true` while the seat still counts towards the game.
    pub fn is_playing(self) -> bool {
        matches!(self, SeatStatus::Active | SeatStatus::Turn)
    }
}

/// One entry of a room's story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    /// The text itself.
    pub content: String,
    /// Seat index of the author; absent for system entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<usize>,
    /// `true` for announcements written by the room itself.
    #[serde(default)]
    pub system: bool,
}

impl Sentence {
    /// A sentence written by the player in seat `owner`.
    pub fn written(owner: usize, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            owner: Some(owner),
            system: false,
        }
    }

    /// A room announcement, such as the opening line or a skip notice.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            owner: None,
            system: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Outcome of a ready-check as told to one queued player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    /// `true` only when a room was created for this batch.
    pub success: bool,
    /// The new room, present on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<RoomId>,
    /// Human-readable explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub announcement: Option<String>,
}

impl Announcement {
    /// The batch got a room.
    pub fn success(room: RoomId, text: impl Into<String>) -> Self {
        Self {
            success: true,
            room: Some(room),
            announcement: Some(text.into()),
        }
    }

    /// The batch did not get a room, or this player dropped out of it.
    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            success: false,
            room: None,
            announcement: Some(text.into()),
        }
    }
}

/// A sentence together with its index in the room's log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceNotice {
    /// The appended sentence; its fields sit next to `pos` on the wire.
    #[serde(flatten)]
    pub sentence: Sentence,
    /// Position in the log (`len - 1` right after the append).
    pub pos: usize,
}

/// Every message the server sends.
///
/// `#[serde(tag = "type", content = "message")]` produces the envelope the
/// browser client switches on: the variant name goes in `type`, the fields
/// in `message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Queue: the number of players currently waiting.
    Size {
        /// Waiting-list length after the latest join.
        size: usize,
    },

    /// Queue: a full batch was formed, answer with a [`ReadyResponse`].
    Found {},

    /// Queue: the ready-check is over for this player.
    Announcement(Announcement),

    /// Queue: the player's own session identifier, sent right after joining.
    ///
    /// This is the `player` value the client presents when it connects to
    /// its room later on.
    #[serde(rename = "ID")]
    Id {
        /// The opaque identifier.
        #[serde(rename = "ID")]
        id: String,
    },

    /// Room: the seat this connection plays for.
    Index {
        /// Index into the room's member list.
        index: usize,
    },

    /// Room: a new turn started (or the final status, right before `end`).
    Turn {
        /// Status of every seat, index-aligned with the members.
        status: Vec<SeatStatus>,
        /// When the current turn started.
        time: DateTime<Utc>,
    },

    /// Room: a sentence was appended to the log.
    Sentence(SentenceNotice),

    /// Room: the game is over.
    End {
        /// Seat index of the last player standing, absent if nobody is.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        winner: Option<usize>,
    },
}

impl ServerMessage {
    /// The `type` tag this message is sent under. Handy for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Size { .. } => "size",
            ServerMessage::Found {} => "found",
            ServerMessage::Announcement(_) => "announcement",
            ServerMessage::Id { .. } => "ID",
            ServerMessage::Index { .. } => "index",
            ServerMessage::Turn { .. } => "turn",
            ServerMessage::Sentence(_) => "sentence",
            ServerMessage::End { .. } => "end",
        }
    }
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// A queued player's answer to `found`.
///
/// A missing `accepted` field counts as a decline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReadyResponse {
    /// Whether the player wants to play.
    #[serde(default)]
    pub accepted: bool,
}

/// A seated player's move.
///
/// Either `skip` is set, or `content` carries the sentence. A request with
/// neither is ignored by the room.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TurnRequest {
    /// Give up the seat for the rest of the game.
    #[serde(default)]
    pub skip: bool,
    /// The sentence to append.
    #[serde(default)]
    pub content: String,
}

impl TurnRequest {
    /// A request that writes `content`.
    pub fn write(content: impl Into<String>) -> Self {
        Self {
            skip: false,
            content: content.into(),
        }
    }

    /// A request that skips.
    pub fn skip() -> Self {
        Self {
            skip: true,
            content: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn to_value(message: &ServerMessage) -> serde_json::Value {
        serde_json::to_value(message).unwrap()
    }

    #[test]
    fn test_room_id_display() {
        assert_eq!(RoomId(5).to_string(), "R-5");
    }

    #[test]
    fn test_room_id_is_a_bare_number() {
        assert_eq!(serde_json::to_string(&RoomId(12)).unwrap(), "12");
    }

    #[test]
    fn test_seat_status_strings() {
        let all = vec![
            SeatStatus::Active,
            SeatStatus::Turn,
            SeatStatus::Out,
            SeatStatus::Disconnected,
        ];
        assert_eq!(
            serde_json::to_value(&all).unwrap(),
            json!(["active", "turn", "skipped", "disconnected"])
        );
    }

    #[test]
    fn test_seat_status_is_playing() {
        assert!(SeatStatus::Active.is_playing());
        assert!(SeatStatus::Turn.is_playing());
        assert!(!SeatStatus::Out.is_playing());
        assert!(!SeatStatus::Disconnected.is_playing());
    }

    #[test]
    fn test_found_has_empty_payload() {
        assert_eq!(
            to_value(&ServerMessage::Found {}),
            json!({"type": "found", "message": {}})
        );
    }

    #[test]
    fn test_id_message_uses_upper_case_keys() {
        let message = ServerMessage::Id {
            id: "abc".to_owned(),
        };
        assert_eq!(to_value(&message), json!({"type": "ID", "message": {"ID": "abc"}}));
    }

    #[test]
    fn test_successful_announcement_carries_room() {
        let message = ServerMessage::Announcement(Announcement::success(RoomId(0), "go"));
        assert_eq!(
            to_value(&message),
            json!({"type": "announcement", "message": {"success": true, "room": 0, "announcement": "go"}})
        );
    }

    #[test]
    fn test_failed_announcement_omits_room() {
        let message = ServerMessage::Announcement(Announcement::failure("nope"));
        let value = to_value(&message);
        assert_eq!(value["message"]["success"], json!(false));
        assert!(value["message"].get("room").is_none());
    }

    #[test]
    fn test_sentence_notice_is_flat() {
        let message = ServerMessage::Sentence(SentenceNotice {
            sentence: Sentence::written(2, "It rained."),
            pos: 4,
        });
        assert_eq!(
            to_value(&message),
            json!({"type": "sentence", "message": {"content": "It rained.", "owner": 2, "system": false, "pos": 4}})
        );
    }

    #[test]
    fn test_system_sentence_omits_owner() {
        let value = serde_json::to_value(Sentence::system("The clock struck one.")).unwrap();
        assert_eq!(value, json!({"content": "The clock struck one.", "system": true}));
    }

    #[test]
    fn test_end_without_winner_has_empty_payload() {
        assert_eq!(
            to_value(&ServerMessage::End { winner: None }),
            json!({"type": "end", "message": {}})
        );
        assert_eq!(
            to_value(&ServerMessage::End { winner: Some(1) }),
            json!({"type": "end", "message": {"winner": 1}})
        );
    }

    #[test]
    fn test_turn_carries_status_and_time() {
        let time = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let message = ServerMessage::Turn {
            status: vec![SeatStatus::Turn, SeatStatus::Out],
            time,
        };
        let value = to_value(&message);
        assert_eq!(value["type"], "turn");
        assert_eq!(value["message"]["status"], json!(["turn", "skipped"]));
        assert_eq!(value["message"]["time"], "2024-05-01T12:00:00Z");
    }

    #[test]
    fn test_kind_matches_serialized_tag() {
        let messages = [
            ServerMessage::Size { size: 1 },
            ServerMessage::Found {},
            ServerMessage::Id { id: "x".into() },
            ServerMessage::Index { index: 0 },
            ServerMessage::End { winner: None },
        ];
        for message in messages {
            assert_eq!(to_value(&message)["type"], message.kind());
        }
    }

    #[test]
    fn test_turn_request_defaults_missing_fields() {
        let request: TurnRequest = serde_json::from_str(r#"{"content":"Hi."}"#).unwrap();
        assert_eq!(request, TurnRequest::write("Hi."));

        let request: TurnRequest = serde_json::from_str(r#"{"skip":true}"#).unwrap();
        assert_eq!(request, TurnRequest::skip());
    }

    #[test]
    fn test_ready_response_missing_field_is_decline() {
        let response: ReadyResponse = serde_json::from_str("{}").unwrap();
        assert!(!response.accepted);
    }
}
