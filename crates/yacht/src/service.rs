//! `GameService`: the transport-agnostic entry point.
//!
//! Ties the layers together: session tokens → player ids → room actors →
//! rules. An outer surface (WebSocket, HTTP, tests) calls these methods and
//! forwards [`RoomOutbound`] messages from [`GameService::subscribe`] to its
//! clients.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc};
use yacht_protocol::{PlayerId, RoomCode};
use yacht_room::{
    GameStarted, MemoryStore, RollReply, RoomConfig, RoomHandle, RoomInfo, RoomManager, RoomOutbound,
    ScoreReply, SnapshotStore, Versioned,
};
use yacht_rules::{Category, HeldMask};
use yacht_session::SessionManager;

use crate::YachtError;

/// Everything tunable about a [`GameService`].
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    pub room: RoomConfig,
}

/// Handed to a player who joined a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinTicket {
    /// Present this on every later call.
    pub token: String,
    pub player_id: PlayerId,
    pub player_index: usize,
    pub room: RoomCode,
}

/// The game service.
///
/// Generic over the snapshot store so several services (processes) can
/// share one. [`GameService::in_memory`] covers the single-process case.
pub struct GameService<S: SnapshotStore = MemoryStore> {
    sessions: Mutex<SessionManager>,
    rooms: Mutex<RoomManager<S>>,
    next_player_id: AtomicU64,
}

impl GameService<MemoryStore> {
    pub fn in_memory(config: ServiceConfig) -> Self {
        Self::new(Arc::new(MemoryStore::new()), config)
    }
}

impl<S: SnapshotStore> GameService<S> {
    pub fn new(store: Arc<S>, config: ServiceConfig) -> Self {
        Self {
            sessions: Mutex::new(SessionManager::new()),
            rooms: Mutex::new(RoomManager::new(store, config.room)),
            next_player_id: AtomicU64::new(1),
        }
    }

    /// Same as [`new`](Self::new) but player ids start at `first_id`, so
    /// services sharing a store can hand out disjoint ids.
    pub fn with_id_base(store: Arc<S>, config: ServiceConfig, first_id: u64) -> Self {
        let service = Self::new(store, config);
        service.next_player_id.store(first_id, Ordering::Relaxed);
        service
    }

    // -- lobby ------------------------------------------------------------

    pub async fn create_room(&self) -> Result<RoomCode, YachtError> {
        Ok(self.rooms.lock().await.create_room().await?)
    }

    /// Lobbies in this process that still have a free seat.
    pub async fn list_rooms(&self) -> Vec<RoomInfo> {
        self.rooms.lock().await.list_rooms().await
    }

    /// Seats a human and opens their session.
    pub async fn join_room(&self, code: &str, display_name: &str) -> Result<JoinTicket, YachtError> {
        let code: RoomCode = code.parse()?;
        let player_id = self.allocate_id();

        let player_index = self
            .rooms
            .lock()
            .await
            .join_room(player_id, &code, display_name)
            .await?;
        let token = self
            .sessions
            .lock()
            .await
            .create(player_id, display_name)?
            .token
            .clone();

        tracing::info!(room = %code, %player_id, player_index, "player joined");
        Ok(JoinTicket {
            token,
            player_id,
            player_index,
            room: code,
        })
    }

    /// Seats an automated player. Bots have no session.
    pub async fn add_bot(&self, code: &str, display_name: &str) -> Result<usize, YachtError> {
        let code: RoomCode = code.parse()?;
        let player_id = self.allocate_id();
        let index = self
            .rooms
            .lock()
            .await
            .add_bot(player_id, &code, display_name)
            .await?;
        tracing::info!(room = %code, %player_id, player_index = index, "bot added");
        Ok(index)
    }

    /// Leaves the current room and ends the caller's session. Returns
    /// `true` if the seat was given up (lobby); mid-game the seat is kept,
    /// marked disconnected, and the turn timer plays it out.
    pub async fn leave_room(&self, token: &str) -> Result<bool, YachtError> {
        let player_id = self.player(token).await?;
        let removed = self.rooms.lock().await.leave_room(player_id).await?;
        self.sessions.lock().await.end(player_id);
        Ok(removed)
    }

    pub async fn start_game(&self, code: &str) -> Result<GameStarted, YachtError> {
        let started = self.room(code).await?.start().await?;
        tracing::info!(room = %code, players = started.turn_order.len(), "game started");
        Ok(started)
    }

    // -- turns ------------------------------------------------------------

    /// Rolls for the caller, optionally replacing the held mask first.
    pub async fn roll(
        &self,
        code: &str,
        token: &str,
        held: Option<HeldMask>,
    ) -> Result<RollReply, YachtError> {
        let player_id = self.player(token).await?;
        Ok(self.room(code).await?.roll(player_id, held).await?)
    }

    pub async fn toggle_hold(&self, code: &str, token: &str, die: usize) -> Result<HeldMask, YachtError> {
        let player_id = self.player(token).await?;
        Ok(self.room(code).await?.toggle_hold(player_id, die).await?)
    }

    pub async fn select_category(
        &self,
        code: &str,
        token: &str,
        category: Category,
    ) -> Result<ScoreReply, YachtError> {
        let player_id = self.player(token).await?;
        let handle = self.room(code).await?;
        let reply = handle.select_category(player_id, category).await?;
        self.evict_if_finished(handle.code(), &reply).await;
        Ok(reply)
    }

    /// Zeroes the current player's first open category. For the turn
    /// timer, not for players.
    pub async fn skip_turn(&self, code: &str) -> Result<ScoreReply, YachtError> {
        let handle = self.room(code).await?;
        let reply = handle.skip().await?;
        tracing::info!(room = %code, player_index = reply.player_index, "turn timed out");
        self.evict_if_finished(handle.code(), &reply).await;
        Ok(reply)
    }

    /// Stops actors for rooms whose game is over and ends their players'
    /// sessions. Games that end on a player's or the timer's move are
    /// evicted right away; this catches the ones a bot finished. Call it
    /// periodically.
    pub async fn evict_finished(&self) -> Result<Vec<RoomCode>, YachtError> {
        let evicted = self.rooms.lock().await.evict_finished().await?;
        let mut sessions = self.sessions.lock().await;
        Ok(evicted
            .into_iter()
            .map(|(code, freed)| {
                for player_id in freed {
                    sessions.end(player_id);
                }
                code
            })
            .collect())
    }

    // -- observation ------------------------------------------------------

    pub async fn snapshot(&self, code: &str) -> Result<Versioned, YachtError> {
        Ok(self.room(code).await?.snapshot().await?)
    }

    /// A receiver that gets the room's snapshot, then every commit's events.
    pub async fn subscribe(&self, code: &str) -> Result<mpsc::UnboundedReceiver<RoomOutbound>, YachtError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.room(code).await?.subscribe(tx).await?;
        Ok(rx)
    }

    // -- helpers ----------------------------------------------------------

    fn allocate_id(&self) -> PlayerId {
        PlayerId(self.next_player_id.fetch_add(1, Ordering::Relaxed))
    }

    async fn evict_if_finished(&self, code: &RoomCode, reply: &ScoreReply) {
        if reply.finished {
            let freed = self.rooms.lock().await.evict(code).await;
            let mut sessions = self.sessions.lock().await;
            for player_id in freed {
                sessions.end(player_id);
            }
        }
    }

    async fn player(&self, token: &str) -> Result<PlayerId, YachtError> {
        Ok(self.sessions.lock().await.resolve(token)?.player_id)
    }

    /// Room handle, taken under the manager lock and used after it is
    /// released so one slow room does not hold up the others.
    async fn room(&self, code: &str) -> Result<RoomHandle, YachtError> {
        let code: RoomCode = code.parse()?;
        Ok(self.rooms.lock().await.open_room(&code).await?)
    }
}
