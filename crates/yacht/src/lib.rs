//! # Yacht
//!
//! Multiplayer Yacht (five dice, thirteen categories, 2–4 players) as a
//! transport-agnostic service.
//!
//! The server is the only authority on turns: every move is checked
//! against the stored room snapshot and committed with a version check, so
//! even several processes sharing one store never accept two moves for the
//! same turn. Observers get best-effort event broadcasts and resync from
//! snapshots. Bots play their turns on the room's own queue.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use yacht::prelude::*;
//!
//! # async fn demo() -> Result<(), YachtError> {
//! yacht::logging::init();
//! let service = GameService::in_memory(ServiceConfig::default());
//!
//! let code = service.create_room().await?;
//! let ann = service.join_room(code.as_str(), "ann").await?;
//! service.add_bot(code.as_str(), "robo").await?;
//! service.start_game(code.as_str()).await?;
//!
//! let rolled = service.roll(code.as_str(), &ann.token, None).await?;
//! println!("rolled {:?}", rolled.hand.dice);
//! service.select_category(code.as_str(), &ann.token, Category::Chance).await?;
//! # Ok(())
//! # }
//! ```

mod error;
pub mod logging;
mod service;

pub use error::{Rejection, RejectionKind, YachtError};
pub use service::{GameService, JoinTicket, ServiceConfig};

pub use yacht_protocol as protocol;
pub use yacht_room as room;
pub use yacht_rules as rules;
pub use yacht_session as session;

pub mod prelude {
    pub use crate::{GameService, JoinTicket, Rejection, RejectionKind, ServiceConfig, YachtError};
    pub use yacht_protocol::{EventEnvelope, PlayerId, RankedPlayer, RoomCode, RoomEvent};
    pub use yacht_room::{
        GameStarted, MemoryStore, RollReply, RoomConfig, RoomInfo, RoomOutbound, RoomSnapshot, RoomStatus,
        ScoreReply, SnapshotStore, Versioned,
    };
    pub use yacht_rules::{Category, Dice, HeldMask, Scorecard, bot};
}
