//! Shared vocabulary for Yacht rooms.
//!
//! - **Identity** ([`PlayerId`], [`RoomCode`]) — who and where.
//! - **Events** ([`RoomEvent`], [`EventEnvelope`]) — what observers are
//!   told after each committed change.
//! - **Codec** ([`Codec`], [`JsonCodec`]) — how snapshots and events turn
//!   into bytes.
//!
//! ```text
//! Rules (pure game) → Protocol (ids, events, bytes) → Room (authority)
//! ```

mod codec;
mod error;
mod events;
mod ids;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use events::{EventEnvelope, RankedPlayer, RoomEvent};
pub use ids::{PlayerId, RoomCode};
