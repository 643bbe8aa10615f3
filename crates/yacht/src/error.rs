//! Unified error type and the rejection taxonomy clients see.

use serde::{Deserialize, Serialize};
use yacht_protocol::ProtocolError;
use yacht_room::{RoomError, StoreError};
use yacht_rules::RuleError;
use yacht_session::SessionError;

/// Top-level error wrapping every crate-specific error, so `?` works on
/// all of them inside the service.
#[derive(Debug, thiserror::Error)]
pub enum YachtError {
    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Room(#[from] RoomError),
}

/// Why a request was turned down, in terms a client can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    /// Malformed input: bad room code, unknown category, die out of range.
    Invalid,
    /// The caller is not the current player.
    TurnOwnership,
    /// The move is not legal right now.
    Precondition,
    /// Unknown room, session, or membership.
    NotFound,
    /// Room full or no longer taking players.
    Capacity,
    /// Try again later: the room is busy, gone, or its store failed.
    Unavailable,
}

impl RejectionKind {
    /// HTTP-style status code for the outer surface.
    pub fn code(self) -> u16 {
        match self {
            Self::Invalid => 400,
            Self::TurnOwnership => 403,
            Self::NotFound => 404,
            Self::Precondition => 409,
            Self::Capacity => 423,
            Self::Unavailable => 503,
        }
    }
}

/// A classified error, ready to send to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub kind: RejectionKind,
    pub code: u16,
    pub message: String,
}

impl YachtError {
    pub fn kind(&self) -> RejectionKind {
        match self {
            Self::Rule(e) => rule_kind(e),
            Self::Protocol(ProtocolError::InvalidRoomCode(_)) => RejectionKind::Invalid,
            Self::Protocol(_) => RejectionKind::Unavailable,
            Self::Session(SessionError::AlreadyRegistered(_)) => RejectionKind::Precondition,
            Self::Session(_) => RejectionKind::NotFound,
            Self::Store(_) => RejectionKind::Unavailable,
            Self::Room(e) => room_kind(e),
        }
    }

    pub fn rejection(&self) -> Rejection {
        let kind = self.kind();
        Rejection {
            kind,
            code: kind.code(),
            message: self.to_string(),
        }
    }
}

fn rule_kind(e: &RuleError) -> RejectionKind {
    match e {
        RuleError::NotYourTurn { .. } => RejectionKind::TurnOwnership,
        RuleError::DieOutOfRange(_) | RuleError::InvalidFace(_) | RuleError::UnknownCategory(_) => {
            RejectionKind::Invalid
        }
        RuleError::RollLimitReached
        | RuleError::NotRolled
        | RuleError::CategoryFilled(_)
        | RuleError::GameFinished
        | RuleError::NoPlayers => RejectionKind::Precondition,
    }
}

fn room_kind(e: &RoomError) -> RejectionKind {
    match e {
        RoomError::Rule(rule) => rule_kind(rule),
        RoomError::NotFound(_) | RoomError::NotInRoom(..) | RoomError::NoRoom(_) => {
            RejectionKind::NotFound
        }
        RoomError::RoomFull(_) | RoomError::NotJoinable(..) => RejectionKind::Capacity,
        RoomError::AlreadyInRoom(..)
        | RoomError::WrongStatus { .. }
        | RoomError::NotEnoughPlayers { .. } => RejectionKind::Precondition,
        RoomError::Conflict(_) | RoomError::Store(_) | RoomError::Unavailable(_) => {
            RejectionKind::Unavailable
        }
    }
}
