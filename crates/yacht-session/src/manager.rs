//! The session manager: every live session, by player and by token.
//!
//! This is where the session layer does its work:
//! - handing out a token when a human joins
//! - turning a token back into a player on every call
//! - forgetting the token when the player is done
//!
//! # Concurrency
//!
//! `SessionManager` is plain data behind `&mut self`, two `HashMap`s. The
//! service layer owns it behind a mutex; nothing in here locks and nothing
//! here awaits.

use std::collections::HashMap;

use rand::Rng;
use yacht_protocol::PlayerId;

use crate::{Session, SessionError};

/// Registry of sessions, indexed both ways: by player for the room side
/// and by token for the client side.
///
/// ```text
/// create() ──→ [live] ── resolve(token) on every call ──→ end() ──→ gone
/// ```
#[derive(Debug, Default)]
pub struct SessionManager {
    /// Every live session, keyed by player. One per player.
    sessions: HashMap<PlayerId, Session>,

    /// Token → player, so a client's token resolves without scanning
    /// `sessions`. Kept in sync with it: every insert and removal there
    /// has a matching one here.
    tokens: HashMap<String, PlayerId>,
}

impl SessionManager {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session for `player_id` with a fresh random token.
    ///
    /// # Errors
    /// [`SessionError::AlreadyRegistered`] if the player has one already.
    pub fn create(
        &mut self,
        player_id: PlayerId,
        display_name: impl Into<String>,
    ) -> Result<&Session, SessionError> {
        if self.sessions.contains_key(&player_id) {
            return Err(SessionError::AlreadyRegistered(player_id));
        }

        let token = generate_token();
        let session = Session {
            player_id,
            display_name: display_name.into(),
            token: token.clone(),
        };

        self.tokens.insert(token, player_id);
        let session = self.sessions.entry(player_id).insert_entry(session).into_mut();

        tracing::info!(%player_id, "session created");
        Ok(session)
    }

    /// Looks up the session behind `token`.
    ///
    /// # Errors
    /// [`SessionError::InvalidToken`] if the token is unknown or ended.
    pub fn resolve(&self, token: &str) -> Result<&Session, SessionError> {
        self.tokens
            .get(token)
            .and_then(|player_id| self.sessions.get(player_id))
            .ok_or(SessionError::InvalidToken)
    }

    /// Removes a session outright.
    ///
    /// The token stops resolving at once. Returns the removed session, or
    /// `None` if the player had none.
    pub fn end(&mut self, player_id: PlayerId) -> Option<Session> {
        let session = self.sessions.remove(&player_id)?;
        self.tokens.remove(&session.token);
        tracing::info!(%player_id, "session ended");
        Some(session)
    }

    /// The session for `player_id`, if one is live.
    pub fn get(&self, player_id: &PlayerId) -> Option<&Session> {
        self.sessions.get(player_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// 16 random bytes as 32 lowercase hex characters.
fn generate_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
