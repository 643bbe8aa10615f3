//! Error types for the session layer.

use yacht_protocol::PlayerId;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The token was never issued, or its session has ended.
    #[error("unknown session token")]
    InvalidToken,

    /// The player already holds a session.
    #[error("player {0} already has a session")]
    AlreadyRegistered(PlayerId),
}
