//! Error types for the protocol layer.

/// Errors from encoding, decoding, or parsing identifiers.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Malformed bytes, missing fields, or a type mismatch.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// Wrong length or a character outside the room-code alphabet.
    #[error("invalid room code: {0:?}")]
    InvalidRoomCode(String),
}
