//! Room configuration and lifecycle.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Settings shared by every room a [`RoomManager`](crate::RoomManager)
/// creates.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Players needed before the game can start.
    pub min_players: usize,

    pub max_players: usize,

    /// How many times a command reloads and retries after another instance
    /// committed first. Running out rejects with
    /// [`RoomError::Conflict`](crate::RoomError::Conflict).
    pub max_commit_retries: u32,

    /// Pause before an automated player acts, so observers can follow.
    /// Zero plays bot turns as soon as they come up.
    pub bot_delay: Duration,

    /// Fixed dice seed for reproducible rooms. `None` seeds from the OS.
    pub rng_seed: Option<u64>,

    /// Capacity of each room actor's command channel.
    pub channel_size: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_players: 4,
            max_commit_retries: 3,
            bot_delay: Duration::ZERO,
            rng_seed: None,
            channel_size: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// RoomStatus
// ---------------------------------------------------------------------------

/// Where a room is in its life. Transitions only move forward:
///
/// ```text
/// Lobby → Playing → Finished
/// ```
///
/// - **Lobby**: accepting joins and bots; leaving removes the player.
/// - **Playing**: seats are fixed; leaving only marks a player disconnected.
/// - **Finished**: read-only; the ranking is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Lobby,
    Playing,
    Finished,
}

impl RoomStatus {
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Lobby)
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }

    pub fn next(self) -> Option<Self> {
        match self {
            Self::Lobby => Some(Self::Playing),
            Self::Playing => Some(Self::Finished),
            Self::Finished => None,
        }
    }

    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl std::fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lobby => write!(f, "Lobby"),
            Self::Playing => write!(f, "Playing"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}
