//! Broadcast events: the deltas a room sends to its observers.
//!
//! One [`EventEnvelope`] batch goes out per committed mutation. Each event
//! carries enough for a passive observer to apply the same transition the
//! room applied (player index, category, score, next player, round,
//! finished flag). Delivery is best-effort: an observer that notices a
//! gap in `version` must re-read the full room snapshot instead of trying
//! to replay.

use serde::{Deserialize, Serialize};
use yacht_rules::{Category, Dice, HeldMask, Totals};

use crate::RoomCode;

/// One player's place in the final ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedPlayer {
    pub player_index: usize,
    /// 1 for the winner.
    pub rank: usize,
    pub grand_total: u16,
}

/// A state change inside a room.
///
/// `#[serde(tag = "type", rename_all = "snake_case")]` gives flat JSON
/// objects like `{"type":"dice_roll","player_index":0,...}` that a
/// browser client can switch on directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomEvent {
    PlayerJoined {
        player_index: usize,
        name: String,
        is_bot: bool,
    },

    /// In the lobby the player is removed; mid-game they keep their seat
    /// and are only marked disconnected (`removed: false`).
    PlayerLeft {
        player_index: usize,
        removed: bool,
    },

    GameStart {
        /// Player indices in seat order.
        turn_order: Vec<usize>,
        first_player_index: usize,
    },

    DiceRoll {
        player_index: usize,
        dice: Dice,
        held: HeldMask,
        roll_count: u8,
    },

    HoldChanged {
        player_index: usize,
        held: HeldMask,
    },

    ScoreUpdate {
        player_index: usize,
        category: Category,
        score: u16,
        totals: Totals,
        next_player_index: usize,
        round: u8,
        finished: bool,
    },

    /// The turn timer fired and the player was charged a zero.
    TurnTimeout {
        player_index: usize,
        category: Category,
        next_player_index: usize,
        round: u8,
        finished: bool,
    },

    TurnChange {
        player_index: usize,
        round: u8,
    },

    /// An automated player is about to take its turn.
    BotTurn {
        player_index: usize,
        round: u8,
    },

    GameEnd {
        ranking: Vec<RankedPlayer>,
        winner_index: usize,
    },
}

impl RoomEvent {
    /// The wire tag, handy for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PlayerJoined { .. } => "player_joined",
            Self::PlayerLeft { .. } => "player_left",
            Self::GameStart { .. } => "game_start",
            Self::DiceRoll { .. } => "dice_roll",
            Self::HoldChanged { .. } => "hold_changed",
            Self::ScoreUpdate { .. } => "score_update",
            Self::TurnTimeout { .. } => "turn_timeout",
            Self::TurnChange { .. } => "turn_change",
            Self::BotTurn { .. } => "bot_turn",
            Self::GameEnd { .. } => "game_end",
        }
    }
}

/// Events from one commit, stamped with the room version they produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub room: RoomCode,
    /// Snapshot version after the commit. Consecutive commits differ by 1.
    pub version: u64,
    pub events: Vec<RoomEvent>,
}
