//! The room snapshot: everything a room is, in one serializable value.
//!
//! The store holds exactly one of these per room plus a version number.
//! Room actors never keep their own copy between commands; they load,
//! change a copy, and compare-and-swap it back.

use serde::{Deserialize, Serialize};
use yacht_protocol::{PlayerId, RoomCode};
use yacht_rules::Game;

use crate::RoomStatus;

/// A seat holder, human or bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    /// Stable per-room number shown to clients and used in every event.
    /// Handed out in join order and never reused, so it survives lobby
    /// departures that shift seats.
    pub index: usize,
    pub name: String,
    pub is_bot: bool,
    pub is_connected: bool,
}

/// Identifies one bot turn: the round and seat it was scheduled for.
///
/// A key that no longer matches the game's current turn is stale (a skip
/// or another instance already moved the game on) and gets dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BotTurnKey {
    pub round: u8,
    pub seat: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub code: RoomCode,
    pub status: RoomStatus,
    /// In seat order. Once the game starts, position here is the seat the
    /// rules engine knows.
    pub players: Vec<Player>,
    /// Next value for [`Player::index`].
    pub next_index: usize,
    /// `None` while in the lobby.
    pub game: Option<Game>,
}

/// A snapshot together with the store version it was read at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioned {
    pub version: u64,
    pub snapshot: RoomSnapshot,
}

impl RoomSnapshot {
    /// An empty lobby.
    pub fn new(code: RoomCode) -> Self {
        Self {
            code,
            status: RoomStatus::Lobby,
            players: Vec::new(),
            next_index: 0,
            game: None,
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn seat_of(&self, id: PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    /// Player index of whoever sits at `seat`.
    pub fn index_at(&self, seat: usize) -> Option<usize> {
        self.players.get(seat).map(|p| p.index)
    }

    /// Player indices in seat order.
    pub fn turn_order(&self) -> Vec<usize> {
        self.players.iter().map(|p| p.index).collect()
    }

    /// Whoever is due to act, while a game is running.
    pub fn current_player(&self) -> Option<&Player> {
        if !self.status.is_playing() {
            return None;
        }
        let game = self.game.as_ref()?;
        self.players.get(game.turn().seat)
    }

    /// The bot turn to schedule, if the current player is a bot.
    pub fn pending_bot_turn(&self) -> Option<BotTurnKey> {
        let player = self.current_player()?;
        if !player.is_bot {
            return None;
        }
        let turn = self.game.as_ref()?.turn();
        Some(BotTurnKey {
            round: turn.round,
            seat: turn.seat,
        })
    }
}
