//! Codec trait and the JSON implementation.
//!
//! The room store keeps snapshots as opaque bytes and the outer surface
//! ships events as bytes. Neither cares how those bytes are produced; they
//! only need something that implements [`Codec`].

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to bytes and decodes them back.
///
/// `Send + Sync + 'static` so a codec can live inside a shared store or a
/// long-running room task.
pub trait Codec: Send + Sync + 'static {
    /// # Errors
    /// [`ProtocolError::Encode`] if the value can't be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// # Errors
    /// [`ProtocolError::Decode`] if the bytes are malformed or don't match
    /// `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// Behind the `json` feature (on by default).
///
/// ```rust
/// use yacht_protocol::{Codec, EventEnvelope, JsonCodec, RoomCode, RoomEvent};
///
/// let codec = JsonCodec;
/// let envelope = EventEnvelope {
///     room: RoomCode::from_indices([0, 1, 2, 3, 4, 5]),
///     version: 3,
///     events: vec![RoomEvent::TurnChange { player_index: 1, round: 2 }],
/// };
///
/// let bytes = codec.encode(&envelope).unwrap();
/// let decoded: EventEnvelope = codec.decode(&bytes).unwrap();
/// assert_eq!(envelope, decoded);
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
