//! Error types for the room layer.

use yacht_protocol::{PlayerId, ProtocolError, RoomCode};
use yacht_rules::RuleError;

use crate::RoomStatus;

/// Errors from a [`SnapshotStore`](crate::SnapshotStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Someone else committed since `expected` was read. The caller should
    /// reload and try again.
    #[error("room {code} moved on: expected version {expected:?}, found {actual:?}")]
    VersionConflict {
        code: RoomCode,
        expected: Option<u64>,
        actual: Option<u64>,
    },

    #[error("snapshot codec failed: {0}")]
    Codec(#[from] ProtocolError),

    /// Backend-specific failure (connection lost, timeout, ...).
    #[error("store backend failed: {0}")]
    Backend(String),
}

/// Errors from room operations. None of these leave a write behind.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room {0} not found")]
    NotFound(RoomCode),

    #[error("room {0} is full")]
    RoomFull(RoomCode),

    /// Joining (or adding a bot) after the lobby closed.
    #[error("room {0} is not accepting players ({1})")]
    NotJoinable(RoomCode, RoomStatus),

    #[error("player {0} already in room {1}")]
    AlreadyInRoom(PlayerId, RoomCode),

    #[error("player {0} not in room {1}")]
    NotInRoom(PlayerId, RoomCode),

    #[error("player {0} is not in any room")]
    NoRoom(PlayerId),

    /// The operation needs a different room status.
    #[error("room {code} is {actual}, expected {expected}")]
    WrongStatus {
        code: RoomCode,
        expected: RoomStatus,
        actual: RoomStatus,
    },

    #[error("need at least {needed} players to start, have {have}")]
    NotEnoughPlayers { needed: usize, have: usize },

    /// The game rules refused the move.
    #[error(transparent)]
    Rule(#[from] RuleError),

    /// Commit retries ran out while other instances kept winning.
    #[error("room {0} is busy, try again")]
    Conflict(RoomCode),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The room's actor is gone or its channel is closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),
}
