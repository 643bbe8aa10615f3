//! Player sessions for Yacht.
//!
//! A session ties an opaque token (what the client holds) to a
//! [`PlayerId`](yacht_protocol::PlayerId) (what the room layer knows).
//! Issuing and checking the token is all this layer does; who the player
//! really is, and how they got here, is the embedding server's business.
//!
//! ```text
//! Room Layer (above)     ← asks "which player is this token?"
//!     ↕
//! Session Layer (this)   ← token → player
//!     ↕
//! Protocol Layer (below) ← PlayerId
//! ```

mod error;
mod manager;
mod session;

pub use error::SessionError;
pub use manager::SessionManager;
pub use session::Session;
