//! Room manager: creates rooms, runs their actors, and tracks who is where.

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use yacht_protocol::{PlayerId, RoomCode};
use yacht_rules::{Category, HeldMask};

use crate::room::spawn_room;
use crate::{
    GameStarted, ObserverSender, RollReply, RoomConfig, RoomError, RoomHandle, RoomInfo,
    RoomSnapshot, RoomStatus, ScoreReply, SnapshotStore, StoreError, Versioned,
};

/// How many fresh codes to try before giving up on `create_room`.
const CODE_ATTEMPTS: usize = 8;

/// Owns one actor per open room in this process.
///
/// Several managers (one per process, or several in a test) can share one
/// store. Each opens its own actor for a room on first use; the store keeps
/// them honest.
pub struct RoomManager<S: SnapshotStore> {
    store: Arc<S>,
    config: RoomConfig,

    /// Actors running in this process, keyed by room code.
    rooms: HashMap<RoomCode, RoomHandle>,

    /// The room each player is in. At most one per player.
    player_rooms: HashMap<PlayerId, RoomCode>,
}

impl<S: SnapshotStore> RoomManager<S> {
    pub fn new(store: Arc<S>, config: RoomConfig) -> Self {
        Self {
            store,
            config,
            rooms: HashMap::new(),
            player_rooms: HashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Creates an empty lobby under a fresh random code and starts its
    /// actor.
    ///
    /// # Errors
    /// [`RoomError::Conflict`] if every generated code was taken.
    pub async fn create_room(&mut self) -> Result<RoomCode, RoomError> {
        let mut last = None;
        for _ in 0..CODE_ATTEMPTS {
            let code = random_code();
            match self
                .store
                .compare_and_swap(&code, None, &RoomSnapshot::new(code.clone()))
                .await
            {
                Ok(_) => {
                    let handle = spawn_room(code.clone(), Arc::clone(&self.store), self.config.clone());
                    self.rooms.insert(code.clone(), handle);
                    tracing::info!(room = %code, "room created");
                    return Ok(code);
                }
                Err(StoreError::VersionConflict { .. }) => last = Some(code),
                Err(e) => return Err(e.into()),
            }
        }
        let code = last.unwrap_or_else(random_code);
        Err(RoomError::Conflict(code))
    }

    /// Handle to a room's actor, starting one if the room exists in the
    /// store but not in this process.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if the store has no such room.
    pub async fn open_room(&mut self, code: &RoomCode) -> Result<RoomHandle, RoomError> {
        match self.rooms.get(code) {
            Some(handle) if !handle.is_closed() => return Ok(handle.clone()),
            Some(_) => {
                tracing::debug!(room = %code, "room actor gone, reopening");
                self.rooms.remove(code);
            }
            None => {}
        }
        if self.store.load(code).await?.is_none() {
            return Err(RoomError::NotFound(code.clone()));
        }
        let handle = spawn_room(code.clone(), Arc::clone(&self.store), self.config.clone());
        self.rooms.insert(code.clone(), handle.clone());
        tracing::info!(room = %code, "room opened from store");
        Ok(handle)
    }

    /// Seats a human player. Returns their player index.
    ///
    /// A player sitting in a room whose game already finished is moved
    /// out of it first.
    pub async fn join_room(
        &mut self,
        player_id: PlayerId,
        code: &RoomCode,
        name: impl Into<String>,
    ) -> Result<usize, RoomError> {
        self.release_finished(player_id, code).await?;
        let handle = self.open_room(code).await?;
        let index = handle.join(player_id, name).await?;
        self.player_rooms.insert(player_id, code.clone());
        Ok(index)
    }

    /// Seats an automated player. Returns its player index.
    ///
    /// Bots never leave, so they are not tracked in the
    /// player → room map.
    pub async fn add_bot(
        &mut self,
        player_id: PlayerId,
        code: &RoomCode,
        name: impl Into<String>,
    ) -> Result<usize, RoomError> {
        self.open_room(code).await?.add_bot(player_id, name).await
    }

    /// Takes a player out of their room.
    ///
    /// In the lobby they lose their seat and are free to join elsewhere.
    /// Mid-game the seat stays, marked disconnected, and the turn timer
    /// plays it out. The player stays bound to the room until it is
    /// evicted.
    pub async fn leave_room(&mut self, player_id: PlayerId) -> Result<bool, RoomError> {
        let code = self.current_room(player_id)?;
        let removed = self.open_room(&code).await?.leave(player_id).await?;
        if removed {
            self.player_rooms.remove(&player_id);
        }
        Ok(removed)
    }

    pub async fn start_game(&mut self, code: &RoomCode) -> Result<GameStarted, RoomError> {
        self.open_room(code).await?.start().await
    }

    pub async fn roll(
        &mut self,
        code: &RoomCode,
        player_id: PlayerId,
        held: Option<HeldMask>,
    ) -> Result<RollReply, RoomError> {
        self.open_room(code).await?.roll(player_id, held).await
    }

    pub async fn toggle_hold(
        &mut self,
        code: &RoomCode,
        player_id: PlayerId,
        die: usize,
    ) -> Result<HeldMask, RoomError> {
        self.open_room(code).await?.toggle_hold(player_id, die).await
    }

    /// Scores for the current player. The move that ends the game also
    /// evicts the room.
    pub async fn select_category(
        &mut self,
        code: &RoomCode,
        player_id: PlayerId,
        category: Category,
    ) -> Result<ScoreReply, RoomError> {
        let reply = self
            .open_room(code)
            .await?
            .select_category(player_id, category)
            .await?;
        if reply.finished {
            self.evict(code).await;
        }
        Ok(reply)
    }

    pub async fn skip_turn(&mut self, code: &RoomCode) -> Result<ScoreReply, RoomError> {
        let reply = self.open_room(code).await?.skip().await?;
        if reply.finished {
            self.evict(code).await;
        }
        Ok(reply)
    }

    pub async fn subscribe(&mut self, code: &RoomCode, observer: ObserverSender) -> Result<(), RoomError> {
        self.open_room(code).await?.subscribe(observer).await
    }

    pub async fn snapshot(&mut self, code: &RoomCode) -> Result<Versioned, RoomError> {
        self.open_room(code).await?.snapshot().await
    }

    /// Stops the room's actor, deletes it from the store, and forgets its
    /// players.
    pub async fn destroy_room(&mut self, code: &RoomCode) -> Result<(), RoomError> {
        self.evict(code).await;
        if !self.store.remove(code).await? {
            return Err(RoomError::NotFound(code.clone()));
        }
        tracing::info!(room = %code, "room destroyed");
        Ok(())
    }

    /// Stops the room's actor in this process and frees its players to
    /// join elsewhere. The stored room is kept: opening it again (say, for
    /// a final snapshot) starts a fresh actor. Returns the players freed.
    pub async fn evict(&mut self, code: &RoomCode) -> Vec<PlayerId> {
        if let Some(handle) = self.rooms.remove(code) {
            let _ = handle.shutdown().await;
        }
        let mut freed = Vec::new();
        self.player_rooms.retain(|player_id, c| {
            if c == code {
                freed.push(*player_id);
                false
            } else {
                true
            }
        });
        tracing::info!(room = %code, freed = freed.len(), "room evicted");
        freed
    }

    /// Evicts every room whose game is over, or that is gone from the
    /// store. Catches games a bot finished, which no caller saw end.
    /// Returns the evicted rooms with the players each one freed.
    pub async fn evict_finished(&mut self) -> Result<Vec<(RoomCode, Vec<PlayerId>)>, RoomError> {
        let mut over = Vec::new();
        for code in self.rooms.keys() {
            let finished = match self.store.load(code).await? {
                Some(current) => current.snapshot.status == RoomStatus::Finished,
                None => true,
            };
            if finished {
                over.push(code.clone());
            }
        }
        let mut evicted = Vec::with_capacity(over.len());
        for code in over {
            let freed = self.evict(&code).await;
            evicted.push((code, freed));
        }
        Ok(evicted)
    }

    pub fn player_room(&self, player_id: &PlayerId) -> Option<&RoomCode> {
        self.player_rooms.get(player_id)
    }

    /// Lobbies open in this process that still take players.
    ///
    /// Rooms whose actor does not answer are skipped.
    pub async fn list_rooms(&self) -> Vec<RoomInfo> {
        let mut infos = Vec::with_capacity(self.rooms.len());
        for handle in self.rooms.values() {
            if let Ok(current) = handle.snapshot().await {
                let snap = current.snapshot;
                if snap.status.is_joinable() && snap.players.len() < self.config.max_players {
                    infos.push(RoomInfo {
                        code: snap.code,
                        status: snap.status,
                        player_count: snap.players.len(),
                        max_players: self.config.max_players,
                    });
                }
            }
        }
        infos
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn current_room(&self, player_id: PlayerId) -> Result<RoomCode, RoomError> {
        self.player_rooms
            .get(&player_id)
            .cloned()
            .ok_or(RoomError::NoRoom(player_id))
    }

    /// Enforces one room per player. Membership in a finished (or vanished)
    /// room does not count.
    async fn release_finished(&mut self, player_id: PlayerId, target: &RoomCode) -> Result<(), RoomError> {
        let Some(current) = self.player_rooms.get(&player_id).cloned() else {
            return Ok(());
        };
        if current == *target {
            return Err(RoomError::AlreadyInRoom(player_id, current));
        }
        let still_playing = match self.store.load(&current).await? {
            Some(v) => v.snapshot.status != RoomStatus::Finished,
            None => false,
        };
        if still_playing {
            return Err(RoomError::AlreadyInRoom(player_id, current));
        }
        self.player_rooms.remove(&player_id);
        Ok(())
    }
}

/// Six characters from the room-code alphabet.
fn random_code() -> RoomCode {
    let mut rng = rand::rng();
    RoomCode::from_indices(std::array::from_fn(|_| {
        rng.random_range(0..RoomCode::ALPHABET.len())
    }))
}
