//! Turn authority for Yacht rooms.
//!
//! Each room runs as its own Tokio task (actor model). The actor holds no
//! game state between commands: the versioned [`RoomSnapshot`] in a
//! [`SnapshotStore`] is the only truth, and every change is a
//! compare-and-swap against the version it was computed from. That is what
//! keeps two processes serving the same room from both accepting a move.
//!
//! # Key types
//!
//! - [`RoomManager`] — creates rooms, opens actors, tracks player → room
//! - [`RoomHandle`] — send commands to a running room actor
//! - [`SnapshotStore`] / [`MemoryStore`] — versioned snapshot storage
//! - [`RoomSnapshot`] — players, status, and the game, as stored
//! - [`RoomOutbound`] — what observers receive (snapshot, then events)
//! - [`RoomConfig`] / [`RoomStatus`] — settings and lifecycle

mod config;
mod error;
mod manager;
mod room;
mod snapshot;
mod store;
mod transition;

pub use config::{RoomConfig, RoomStatus};
pub use error::{RoomError, StoreError};
pub use manager::RoomManager;
pub use room::{ObserverSender, RoomHandle, RoomInfo, RoomOutbound};
pub use snapshot::{BotTurnKey, Player, RoomSnapshot, Versioned};
pub use store::{FEED_CAPACITY, MemoryStore, SnapshotStore};
pub use transition::{GameStarted, RollReply, ScoreReply};
