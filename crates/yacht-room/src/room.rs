//! Room actor: one Tokio task per room, fed through an mpsc channel.
//!
//! The actor holds no game state of its own. For every mutating command it
//! loads the snapshot from the store, applies the change to that copy,
//! and compare-and-swaps it back. Commands for one room are handled in
//! channel order, so inside a process nothing interleaves; across
//! processes the store's version check decides who wins.
//!
//! Fan-out works the same way in every process: the committing actor
//! sends its envelope to its own observers and publishes it through the
//! store, and every other actor following the room forwards what it did
//! not commit itself.

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, mpsc, oneshot};
use yacht_protocol::{EventEnvelope, PlayerId, RoomCode, RoomEvent};
use yacht_rules::{Category, HeldMask};

use crate::transition::Applied;
use crate::{
    BotTurnKey, GameStarted, RollReply, RoomConfig, RoomError, RoomSnapshot, RoomStatus,
    ScoreReply, SnapshotStore, StoreError, Versioned,
};

/// What an observer receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomOutbound {
    /// The full room. Sent first on subscribe.
    Snapshot(Versioned),
    /// Events from one commit.
    Events(EventEnvelope),
}

/// Channel end an observer hands to [`RoomHandle::subscribe`].
pub type ObserverSender = mpsc::UnboundedSender<RoomOutbound>;

type Reply<T> = oneshot::Sender<Result<T, RoomError>>;

pub(crate) enum RoomCommand {
    Join {
        player_id: PlayerId,
        name: String,
        is_bot: bool,
        reply: Reply<usize>,
    },
    Leave {
        player_id: PlayerId,
        reply: Reply<bool>,
    },
    Start {
        reply: Reply<GameStarted>,
    },
    Roll {
        player_id: PlayerId,
        held: Option<HeldMask>,
        reply: Reply<RollReply>,
    },
    ToggleHold {
        player_id: PlayerId,
        die: usize,
        reply: Reply<HeldMask>,
    },
    SelectCategory {
        player_id: PlayerId,
        category: Category,
        reply: Reply<ScoreReply>,
    },
    Skip {
        reply: Reply<ScoreReply>,
    },
    /// Enqueued by the actor itself when a bot's turn comes up.
    BotTurn(BotTurnKey),
    Subscribe {
        observer: ObserverSender,
        reply: Reply<()>,
    },
    Snapshot {
        reply: Reply<Versioned>,
    },
    Shutdown,
}

/// Room metadata for lobby listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub code: RoomCode,
    pub status: RoomStatus,
    pub player_count: usize,
    pub max_players: usize,
}

// ---------------------------------------------------------------------------
// RoomHandle
// ---------------------------------------------------------------------------

/// Cheap-to-clone handle for sending commands to a room actor.
#[derive(Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Whether the actor behind this handle has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Sends a command and waits for its reply.
    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?
    }

    /// Seats a human. Returns their player index.
    pub async fn join(&self, player_id: PlayerId, name: impl Into<String>) -> Result<usize, RoomError> {
        let name = name.into();
        self.request(|reply| RoomCommand::Join {
            player_id,
            name,
            is_bot: false,
            reply,
        })
        .await
    }

    /// Seats an automated player. Returns its player index.
    pub async fn add_bot(&self, player_id: PlayerId, name: impl Into<String>) -> Result<usize, RoomError> {
        let name = name.into();
        self.request(|reply| RoomCommand::Join {
            player_id,
            name,
            is_bot: true,
            reply,
        })
        .await
    }

    /// Returns `true` if the player was removed (lobby), `false` if they
    /// keep their seat as disconnected (game running).
    pub async fn leave(&self, player_id: PlayerId) -> Result<bool, RoomError> {
        self.request(|reply| RoomCommand::Leave { player_id, reply }).await
    }

    pub async fn start(&self) -> Result<GameStarted, RoomError> {
        self.request(|reply| RoomCommand::Start { reply }).await
    }

    pub async fn roll(&self, player_id: PlayerId, held: Option<HeldMask>) -> Result<RollReply, RoomError> {
        self.request(|reply| RoomCommand::Roll {
            player_id,
            held,
            reply,
        })
        .await
    }

    pub async fn toggle_hold(&self, player_id: PlayerId, die: usize) -> Result<HeldMask, RoomError> {
        self.request(|reply| RoomCommand::ToggleHold {
            player_id,
            die,
            reply,
        })
        .await
    }

    pub async fn select_category(
        &self,
        player_id: PlayerId,
        category: Category,
    ) -> Result<ScoreReply, RoomError> {
        self.request(|reply| RoomCommand::SelectCategory {
            player_id,
            category,
            reply,
        })
        .await
    }

    /// Zeroes the current player's first open category (turn timer).
    pub async fn skip(&self) -> Result<ScoreReply, RoomError> {
        self.request(|reply| RoomCommand::Skip { reply }).await
    }

    /// Registers an observer. It receives the current snapshot first, then
    /// every later commit's events.
    pub async fn subscribe(&self, observer: ObserverSender) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Subscribe { observer, reply }).await
    }

    /// The latest committed snapshot, for resync.
    pub async fn snapshot(&self) -> Result<Versioned, RoomError> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }

    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }
}

// ---------------------------------------------------------------------------
// RoomActor
// ---------------------------------------------------------------------------

/// A subscribed observer and the version its view already includes.
struct Observer {
    sender: ObserverSender,
    since: u64,
}

/// What woke the actor up.
enum Wake {
    Command(Option<RoomCommand>),
    Published(Result<EventEnvelope, RecvError>),
}

struct RoomActor<S: SnapshotStore> {
    code: RoomCode,
    store: Arc<S>,
    config: RoomConfig,
    rng: StdRng,
    observers: Vec<Observer>,
    receiver: mpsc::Receiver<RoomCommand>,
    /// Our own channel, for enqueueing bot turns. Weak so the actor still
    /// stops once every handle is dropped.
    own_sender: mpsc::WeakSender<RoomCommand>,
    /// The room's feed in the store. `None` once the store closed it.
    feed: Option<broadcast::Receiver<EventEnvelope>>,
    /// Highest version already fanned out, ours or another instance's.
    fanned_out: u64,
}

impl<S: SnapshotStore> RoomActor<S> {
    async fn run(mut self) {
        tracing::info!(room = %self.code, "room actor started");

        // Another instance may have left a bot to move before we existed.
        if let Ok(current) = self.load().await {
            self.fanned_out = current.version;
            self.schedule_bot(&current.snapshot);
        }

        loop {
            let wake = tokio::select! {
                cmd = self.receiver.recv() => Wake::Command(cmd),
                published = next_published(&mut self.feed) => Wake::Published(published),
            };
            match wake {
                Wake::Command(Some(cmd)) => {
                    if !self.handle(cmd).await {
                        break;
                    }
                }
                Wake::Command(None) => break,
                Wake::Published(result) => self.handle_published(result).await,
            }
        }

        tracing::info!(room = %self.code, "room actor stopped");
    }

    /// Runs one command. Returns `false` when the actor should stop.
    async fn handle(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Join {
                player_id,
                name,
                is_bot,
                reply,
            } => {
                let max = self.config.max_players;
                let result = self
                    .commit("join", |snap, _| snap.join(player_id, name.clone(), is_bot, max))
                    .await;
                let _ = reply.send(result);
            }
            RoomCommand::Leave { player_id, reply } => {
                let result = self.commit("leave", |snap, _| snap.leave(player_id)).await;
                let _ = reply.send(result);
            }
            RoomCommand::Start { reply } => {
                let min = self.config.min_players;
                let result = self.commit("start", |snap, _| snap.start(min)).await;
                let _ = reply.send(result);
            }
            RoomCommand::Roll {
                player_id,
                held,
                reply,
            } => {
                let result = self
                    .commit("roll", |snap, rng| snap.roll(player_id, held, rng))
                    .await;
                let _ = reply.send(result);
            }
            RoomCommand::ToggleHold {
                player_id,
                die,
                reply,
            } => {
                let result = self
                    .commit("toggle_hold", |snap, _| snap.toggle_hold(player_id, die))
                    .await;
                let _ = reply.send(result);
            }
            RoomCommand::SelectCategory {
                player_id,
                category,
                reply,
            } => {
                let result = self
                    .commit("select_category", |snap, _| {
                        snap.select_category(player_id, category)
                    })
                    .await;
                let _ = reply.send(result);
            }
            RoomCommand::Skip { reply } => {
                let result = self.commit("skip", |snap, _| snap.skip()).await;
                let _ = reply.send(result);
            }
            RoomCommand::BotTurn(key) => self.handle_bot_turn(key).await,
            RoomCommand::Subscribe { observer, reply } => {
                let result = self.handle_subscribe(observer).await;
                let _ = reply.send(result);
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.load().await);
            }
            RoomCommand::Shutdown => {
                tracing::info!(room = %self.code, "room shutting down");
                return false;
            }
        }
        true
    }

    async fn load(&self) -> Result<Versioned, RoomError> {
        self.store
            .load(&self.code)
            .await?
            .ok_or_else(|| RoomError::NotFound(self.code.clone()))
    }

    /// Load, apply, compare-and-swap; reload and reapply on a version
    /// conflict. Broadcasts and schedules bots only after a write lands.
    async fn commit<T>(
        &mut self,
        action: &'static str,
        mut apply: impl FnMut(&mut RoomSnapshot, &mut StdRng) -> Result<Applied<T>, RoomError>,
    ) -> Result<T, RoomError> {
        let mut retries = 0;
        loop {
            let Versioned {
                version,
                mut snapshot,
            } = self.load().await?;

            let Applied { value, events } = match apply(&mut snapshot, &mut self.rng) {
                Ok(applied) => applied,
                Err(e) => {
                    tracing::debug!(room = %self.code, action, version, error = %e, "command rejected");
                    return Err(e);
                }
            };
            if events.is_empty() {
                return Ok(value);
            }

            match self
                .store
                .compare_and_swap(&self.code, Some(version), &snapshot)
                .await
            {
                Ok(committed) => {
                    tracing::debug!(room = %self.code, action, version = committed, "committed");
                    self.broadcast(committed, events).await;
                    self.schedule_bot(&snapshot);
                    return Ok(value);
                }
                Err(StoreError::VersionConflict { actual, .. })
                    if retries < self.config.max_commit_retries =>
                {
                    retries += 1;
                    tracing::debug!(
                        room = %self.code,
                        action,
                        expected = version,
                        ?actual,
                        retries,
                        "version conflict, retrying"
                    );
                }
                Err(StoreError::VersionConflict { .. }) => {
                    tracing::warn!(room = %self.code, action, retries, "commit retries exhausted");
                    return Err(RoomError::Conflict(self.code.clone()));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn handle_bot_turn(&mut self, key: BotTurnKey) {
        match self.commit("bot_turn", |snap, rng| snap.bot_turn(key, rng)).await {
            Ok(Some(reply)) => tracing::info!(
                room = %self.code,
                player_index = reply.player_index,
                category = %reply.category,
                score = reply.score,
                "bot scored"
            ),
            Ok(None) => tracing::debug!(
                room = %self.code,
                round = key.round,
                seat = key.seat,
                "stale bot turn dropped"
            ),
            Err(e) => tracing::warn!(room = %self.code, error = %e, "bot turn failed"),
        }
    }

    async fn handle_subscribe(&mut self, observer: ObserverSender) -> Result<(), RoomError> {
        let current = self.load().await?;
        let since = current.version;
        // A receiver that is already gone is not worth keeping.
        if observer.send(RoomOutbound::Snapshot(current)).is_ok() {
            self.observers.push(Observer {
                sender: observer,
                since,
            });
        }
        tracing::debug!(room = %self.code, observers = self.observers.len(), "observer subscribed");
        Ok(())
    }

    /// Fans out our own commit here, then publishes it for the other
    /// instances. Publishing is best effort like everything else here.
    async fn broadcast(&mut self, version: u64, events: Vec<RoomEvent>) {
        let envelope = EventEnvelope {
            room: self.code.clone(),
            version,
            events,
        };
        self.drain_feed();
        self.fan_out(&envelope);
        if let Err(e) = self.store.publish(&envelope).await {
            tracing::warn!(room = %self.code, version, error = %e, "publish failed");
        }
    }

    /// An envelope from the store's feed. Ours were already fanned out
    /// when we committed them; anything at or below what observers have
    /// is skipped. An observer that misses one sees a version gap.
    async fn handle_published(&mut self, result: Result<EventEnvelope, RecvError>) {
        match result {
            Ok(envelope) if envelope.version > self.fanned_out => {
                tracing::debug!(room = %self.code, version = envelope.version, "forwarding remote commit");
                self.fan_out(&envelope);
            }
            Ok(_) => {}
            Err(RecvError::Lagged(missed)) => {
                tracing::warn!(room = %self.code, missed, "feed lagged, resyncing observers");
                self.resync_observers().await;
            }
            Err(RecvError::Closed) => {
                tracing::debug!(room = %self.code, "room feed closed");
                self.feed = None;
            }
        }
    }

    /// Forwards whatever already sits in the feed, so earlier remote
    /// commits reach observers before our own newer one.
    fn drain_feed(&mut self) {
        while let Some(feed) = self.feed.as_mut() {
            match feed.try_recv() {
                Ok(envelope) => {
                    if envelope.version > self.fanned_out {
                        self.fan_out(&envelope);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Lagged(missed)) => {
                    tracing::warn!(room = %self.code, missed, "feed lagged");
                }
                Err(TryRecvError::Closed) => self.feed = None,
            }
        }
    }

    /// Closed observers are dropped on the way.
    fn fan_out(&mut self, envelope: &EventEnvelope) {
        self.fanned_out = self.fanned_out.max(envelope.version);
        self.observers.retain(|observer| {
            envelope.version <= observer.since
                || observer
                    .sender
                    .send(RoomOutbound::Events(envelope.clone()))
                    .is_ok()
        });
    }

    /// Sends every observer the current snapshot in place of whatever the
    /// feed dropped.
    async fn resync_observers(&mut self) {
        let Ok(current) = self.load().await else {
            return;
        };
        self.fanned_out = self.fanned_out.max(current.version);
        self.observers.retain_mut(|observer| {
            observer.since = current.version;
            observer
                .sender
                .send(RoomOutbound::Snapshot(current.clone()))
                .is_ok()
        });
    }

    /// Queues the bot's turn on our own channel if a bot is up next.
    fn schedule_bot(&self, snapshot: &RoomSnapshot) {
        let Some(key) = snapshot.pending_bot_turn() else {
            return;
        };
        let own_sender = self.own_sender.clone();
        let delay = self.config.bot_delay;
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if let Some(tx) = own_sender.upgrade() {
                let _ = tx.send(RoomCommand::BotTurn(key)).await;
            }
        });
    }
}

/// Next envelope from the feed; never resolves once the feed is gone.
async fn next_published(
    feed: &mut Option<broadcast::Receiver<EventEnvelope>>,
) -> Result<EventEnvelope, RecvError> {
    match feed {
        Some(feed) => feed.recv().await,
        None => std::future::pending().await,
    }
}

/// Spawns the actor for a room that already exists in the store.
pub(crate) fn spawn_room<S: SnapshotStore>(
    code: RoomCode,
    store: Arc<S>,
    config: RoomConfig,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.channel_size);
    let rng = match config.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let feed = store.follow(&code);
    let actor = RoomActor {
        code: code.clone(),
        store,
        config,
        rng,
        observers: Vec::new(),
        receiver: rx,
        own_sender: tx.downgrade(),
        feed: Some(feed),
        fanned_out: 0,
    };

    tokio::spawn(actor.run());

    RoomHandle { code, sender: tx }
}
