//! Session types: what the server remembers about one human player.
//!
//! A session is nothing more than the pairing of a secret token (held by
//! the client) with a [`PlayerId`] (known to the room layer), plus the name
//! the other players see.

use yacht_protocol::PlayerId;

/// One player's session.
///
/// Created when a human joins a room and removed when they leave it, or
/// when their room is evicted after the game. Bots never get one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// The id the room layer seats and scores.
    pub player_id: PlayerId,

    /// Name shown to the other players in the room.
    pub display_name: String,

    /// Opaque credential the client presents on every call.
    /// 32 hex characters (128 random bits).
    pub token: String,
}
