//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The session layer never touches a concrete format: each connection actor
//! holds something that implements [`Codec`] and uses it to turn
//! [`ServerMessage`](crate::ServerMessage)s into frames and inbound frames
//! into requests. Browser clients speak JSON, so [`JsonCodec`] is the one
//! implementation shipped today.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because a codec is shared by the reader and
/// writer tasks of every actor it serves.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use hakkero_protocol::{Codec, JsonCodec, ServerMessage, TurnRequest};
///
/// let codec = JsonCodec;
///
/// let bytes = codec.encode(&ServerMessage::Size { size: 3 }).unwrap();
/// assert_eq!(bytes, br#"{"type":"size","message":{"size":3}}"#);
///
/// let request: TurnRequest = codec.decode(br#"{"skip":true}"#).unwrap();
/// assert!(request.skip);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ReadyResponse, TurnRequest};

    #[test]
    fn test_json_decode_rejects_garbage() {
        let result: Result<TurnRequest, _> = JsonCodec.decode(b"not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_json_decode_rejects_wrong_shape() {
        // Valid JSON, but not an object.
        let result: Result<ReadyResponse, _> = JsonCodec.decode(br#""yes""#);
        assert!(result.is_err());
    }
}
