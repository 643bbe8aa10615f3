//! Integration tests for the room system: actors over a shared store.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;
use yacht_protocol::{EventEnvelope, PlayerId, RoomCode, RoomEvent};
use yacht_room::{
    MemoryStore, RoomConfig, RoomError, RoomManager, RoomOutbound, RoomSnapshot, RoomStatus,
    SnapshotStore, StoreError, Versioned,
};
use yacht_rules::{Category, RuleError};

// =========================================================================
// Helpers
// =========================================================================

fn pid(id: u64) -> PlayerId {
    PlayerId(id)
}

fn config() -> RoomConfig {
    RoomConfig {
        rng_seed: Some(42),
        ..RoomConfig::default()
    }
}

fn manager() -> RoomManager<MemoryStore> {
    RoomManager::new(Arc::new(MemoryStore::new()), config())
}

/// A started game with players 1 and 2 (indices 0 and 1).
async fn two_player_game<S: SnapshotStore>(mgr: &mut RoomManager<S>) -> RoomCode {
    let code = mgr.create_room().await.unwrap();
    mgr.join_room(pid(1), &code, "ann").await.unwrap();
    mgr.join_room(pid(2), &code, "bob").await.unwrap();
    mgr.start_game(&code).await.unwrap();
    code
}

/// Wraps a [`MemoryStore`] and interferes with upcoming swaps the way a
/// busy or failing backend would.
#[derive(Default)]
struct MeddlingStore {
    inner: MemoryStore,
    /// Swaps still to fail with a version conflict, writing nothing.
    conflicts: AtomicUsize,
    /// Swaps still to fail as if the backend were down.
    outages: AtomicUsize,
    /// Before the next swap, another writer skips the current turn.
    rival_skip: AtomicBool,
    swaps: AtomicUsize,
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl MeddlingStore {
    async fn skip_current_turn(&self, code: &RoomCode) -> Result<(), StoreError> {
        let current = self.inner.load(code).await?.expect("room exists");
        let mut rival = current.snapshot;
        rival.game.as_mut().expect("game running").skip().expect("turn to skip");
        self.inner
            .compare_and_swap(code, Some(current.version), &rival)
            .await?;
        Ok(())
    }
}

impl SnapshotStore for MeddlingStore {
    fn load(
        &self,
        code: &RoomCode,
    ) -> impl Future<Output = Result<Option<Versioned>, StoreError>> + Send {
        self.inner.load(code)
    }

    fn compare_and_swap(
        &self,
        code: &RoomCode,
        expected: Option<u64>,
        snapshot: &RoomSnapshot,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send {
        async move {
            self.swaps.fetch_add(1, Ordering::SeqCst);
            if self.rival_skip.swap(false, Ordering::SeqCst) {
                self.skip_current_turn(code).await?;
            }
            if take_one(&self.conflicts) {
                return Err(StoreError::VersionConflict {
                    code: code.clone(),
                    expected,
                    actual: expected.map(|v| v + 1),
                });
            }
            if take_one(&self.outages) {
                return Err(StoreError::Backend("store offline".into()));
            }
            self.inner.compare_and_swap(code, expected, snapshot).await
        }
    }

    fn remove(&self, code: &RoomCode) -> impl Future<Output = Result<bool, StoreError>> + Send {
        self.inner.remove(code)
    }

    fn publish(&self, envelope: &EventEnvelope) -> impl Future<Output = Result<(), StoreError>> + Send {
        self.inner.publish(envelope)
    }

    fn follow(&self, code: &RoomCode) -> broadcast::Receiver<EventEnvelope> {
        self.inner.follow(code)
    }
}

/// Next event batch, skipping snapshots.
async fn next_events(rx: &mut mpsc::UnboundedReceiver<RoomOutbound>) -> EventEnvelope {
    loop {
        let msg = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for events")
            .expect("observer channel closed");
        if let RoomOutbound::Events(envelope) = msg {
            return envelope;
        }
    }
}

// =========================================================================
// Lobby
// =========================================================================

#[tokio::test]
async fn test_create_room_returns_unique_codes() {
    let mut mgr = manager();
    let r1 = mgr.create_room().await.unwrap();
    let r2 = mgr.create_room().await.unwrap();

    assert_ne!(r1, r2);
    assert_eq!(mgr.room_count(), 2);
    assert_eq!(mgr.store().len(), 2);
}

#[tokio::test]
async fn test_join_room_assigns_indices() {
    let mut mgr = manager();
    let code = mgr.create_room().await.unwrap();

    let a = mgr.join_room(pid(1), &code, "ann").await.unwrap();
    let b = mgr.add_bot(pid(100), &code, "robo").await.unwrap();

    assert_eq!((a, b), (0, 1));
    assert_eq!(mgr.player_room(&pid(1)), Some(&code));
    let snap = mgr.snapshot(&code).await.unwrap().snapshot;
    assert!(snap.players[1].is_bot);
}

#[tokio::test]
async fn test_bots_are_not_tracked_as_room_members() {
    let mut mgr = manager();
    let code = mgr.create_room().await.unwrap();

    mgr.add_bot(pid(100), &code, "robo").await.unwrap();

    assert_eq!(mgr.player_room(&pid(100)), None);
}

#[tokio::test]
async fn test_join_room_not_found() {
    let mut mgr = manager();
    let code: RoomCode = "ZZZZZZ".parse().unwrap();

    let result = mgr.join_room(pid(1), &code, "ann").await;

    assert!(matches!(result, Err(RoomError::NotFound(c)) if c == code));
}

#[tokio::test]
async fn test_join_room_one_room_at_a_time() {
    let mut mgr = manager();
    let r1 = mgr.create_room().await.unwrap();
    let r2 = mgr.create_room().await.unwrap();
    mgr.join_room(pid(1), &r1, "ann").await.unwrap();

    let other = mgr.join_room(pid(1), &r2, "ann").await;
    let same = mgr.join_room(pid(1), &r1, "ann").await;

    assert!(matches!(other, Err(RoomError::AlreadyInRoom(..))));
    assert!(matches!(same, Err(RoomError::AlreadyInRoom(..))));
}

#[tokio::test]
async fn test_join_room_at_max_capacity() {
    let mut mgr = manager();
    let code = mgr.create_room().await.unwrap();
    for i in 1..=4 {
        mgr.join_room(pid(i), &code, format!("p{i}")).await.unwrap();
    }

    let result = mgr.join_room(pid(5), &code, "late").await;

    assert!(matches!(result, Err(RoomError::RoomFull(_))));
}

#[tokio::test]
async fn test_join_running_game_is_rejected() {
    let mut mgr = manager();
    let code = two_player_game(&mut mgr).await;

    let result = mgr.join_room(pid(3), &code, "late").await;

    assert!(matches!(result, Err(RoomError::NotJoinable(_, RoomStatus::Playing))));
}

#[tokio::test]
async fn test_leave_lobby_frees_player() {
    let mut mgr = manager();
    let code = mgr.create_room().await.unwrap();
    mgr.join_room(pid(1), &code, "ann").await.unwrap();

    let removed = mgr.leave_room(pid(1)).await.unwrap();

    assert!(removed);
    assert_eq!(mgr.player_room(&pid(1)), None);
    assert!(mgr.snapshot(&code).await.unwrap().snapshot.players.is_empty());
}

#[tokio::test]
async fn test_leave_room_not_in_any_room() {
    let mut mgr = manager();
    assert!(matches!(mgr.leave_room(pid(1)).await, Err(RoomError::NoRoom(_))));
}

#[tokio::test]
async fn test_leave_mid_game_marks_disconnected() {
    let mut mgr = manager();
    let code = two_player_game(&mut mgr).await;

    let removed = mgr.leave_room(pid(2)).await.unwrap();

    assert!(!removed);
    let snap = mgr.snapshot(&code).await.unwrap().snapshot;
    assert_eq!(snap.players.len(), 2);
    assert!(!snap.players[1].is_connected);
}

#[tokio::test]
async fn test_start_needs_two_players() {
    let mut mgr = manager();
    let code = mgr.create_room().await.unwrap();
    mgr.join_room(pid(1), &code, "ann").await.unwrap();

    let result = mgr.start_game(&code).await;

    assert!(matches!(result, Err(RoomError::NotEnoughPlayers { needed: 2, have: 1 })));
}

#[tokio::test]
async fn test_list_rooms_only_open_lobbies() {
    let mut mgr = manager();
    let open = mgr.create_room().await.unwrap();
    two_player_game(&mut mgr).await;

    let rooms = mgr.list_rooms().await;

    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].code, open);
    assert_eq!(rooms[0].status, RoomStatus::Lobby);
}

#[tokio::test]
async fn test_destroy_room_forgets_everything() {
    let mut mgr = manager();
    let code = two_player_game(&mut mgr).await;

    mgr.destroy_room(&code).await.unwrap();

    assert_eq!(mgr.room_count(), 0);
    assert!(mgr.store().is_empty());
    assert_eq!(mgr.player_room(&pid(1)), None);
    assert!(matches!(mgr.snapshot(&code).await, Err(RoomError::NotFound(_))));
}

// =========================================================================
// Turns
// =========================================================================

#[tokio::test]
async fn test_roll_at_limit_leaves_snapshot_untouched() {
    let mut mgr = manager();
    let code = two_player_game(&mut mgr).await;
    for _ in 0..3 {
        mgr.roll(&code, pid(1), None).await.unwrap();
    }
    let before = mgr.store().raw(&code).unwrap();

    let result = mgr.roll(&code, pid(1), None).await;

    assert!(matches!(result, Err(RoomError::Rule(RuleError::RollLimitReached))));
    assert_eq!(mgr.store().raw(&code).unwrap(), before);
    let turn = mgr.snapshot(&code).await.unwrap().snapshot.game.unwrap().turn().clone();
    assert_eq!(turn.roll_count, 3);
}

#[tokio::test]
async fn test_out_of_turn_roll_writes_nothing() {
    let mut mgr = manager();
    let code = two_player_game(&mut mgr).await;
    let before = mgr.store().raw(&code).unwrap();

    let result = mgr.roll(&code, pid(2), None).await;

    assert!(matches!(
        result,
        Err(RoomError::Rule(RuleError::NotYourTurn { expected: 0, actual: 1 }))
    ));
    assert_eq!(mgr.store().raw(&code).unwrap(), before);
}

#[tokio::test]
async fn test_hold_then_roll_keeps_held_dice() {
    let mut mgr = manager();
    let code = two_player_game(&mut mgr).await;
    let first = mgr.roll(&code, pid(1), None).await.unwrap();

    let held = mgr.toggle_hold(&code, pid(1), 0).await.unwrap();
    let second = mgr.roll(&code, pid(1), None).await.unwrap();

    assert_eq!(held, [true, false, false, false, false]);
    assert_eq!(second.hand.dice[0], first.hand.dice[0]);
    assert_eq!(second.roll_count, 2);
}

#[tokio::test]
async fn test_select_category_advances_turn() {
    let mut mgr = manager();
    let code = two_player_game(&mut mgr).await;
    let rolled = mgr.roll(&code, pid(1), None).await.unwrap();

    let reply = mgr.select_category(&code, pid(1), Category::Chance).await.unwrap();

    let sum: u16 = rolled.hand.dice.iter().map(|&d| u16::from(d)).sum();
    assert_eq!(reply.score, sum);
    assert_eq!(reply.next_player_index, 1);
    assert_eq!(reply.round, 1);
    assert!(!reply.finished);
}

#[tokio::test]
async fn test_skip_turn_zeroes_first_open_category() {
    let mut mgr = manager();
    let code = two_player_game(&mut mgr).await;

    let reply = mgr.skip_turn(&code).await.unwrap();

    assert_eq!(reply.player_index, 0);
    assert_eq!(reply.category, Category::Ones);
    assert_eq!(reply.score, 0);
    assert_eq!(reply.next_player_index, 1);
}

// =========================================================================
// Broadcast
// =========================================================================

#[tokio::test]
async fn test_subscribe_sends_snapshot_then_versioned_events() {
    let mut mgr = manager();
    let code = two_player_game(&mut mgr).await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    mgr.subscribe(&code, tx).await.unwrap();
    let first = rx.recv().await.unwrap();
    let RoomOutbound::Snapshot(initial) = first else {
        panic!("expected a snapshot first, got {first:?}");
    };

    mgr.roll(&code, pid(1), None).await.unwrap();
    mgr.select_category(&code, pid(1), Category::Chance).await.unwrap();

    let roll = next_events(&mut rx).await;
    let score = next_events(&mut rx).await;
    assert_eq!(roll.version, initial.version + 1);
    assert_eq!(score.version, initial.version + 2);
    assert!(matches!(roll.events[..], [RoomEvent::DiceRoll { player_index: 0, roll_count: 1, .. }]));
    assert!(matches!(
        score.events[..],
        [
            RoomEvent::ScoreUpdate { player_index: 0, category: Category::Chance, next_player_index: 1, .. },
            RoomEvent::TurnChange { player_index: 1, round: 1 },
        ]
    ));
}

#[tokio::test]
async fn test_dropped_observer_does_not_block_commits() {
    let mut mgr = manager();
    let code = two_player_game(&mut mgr).await;
    let (tx, rx) = mpsc::unbounded_channel();
    mgr.subscribe(&code, tx).await.unwrap();
    drop(rx);

    mgr.roll(&code, pid(1), None).await.unwrap();
    let reply = mgr.select_category(&code, pid(1), Category::Chance).await;

    assert!(reply.is_ok());
}

// =========================================================================
// Concurrency across instances
// =========================================================================

#[tokio::test]
async fn test_two_instances_never_both_commit_one_turn() {
    let store = Arc::new(MemoryStore::new());
    let mut a = RoomManager::new(Arc::clone(&store), config());
    let mut b = RoomManager::new(Arc::clone(&store), config());
    let code = two_player_game(&mut a).await;
    a.roll(&code, pid(1), None).await.unwrap();

    let handle_a = a.open_room(&code).await.unwrap();
    let handle_b = b.open_room(&code).await.unwrap();
    let version_before = store.load(&code).await.unwrap().unwrap().version;

    let (ra, rb) = tokio::join!(
        handle_a.select_category(pid(1), Category::Chance),
        handle_b.select_category(pid(1), Category::Chance),
    );

    let oks = [ra.is_ok(), rb.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(oks, 1, "exactly one instance may score the turn");
    let loser = if ra.is_ok() { rb } else { ra };
    assert!(matches!(loser, Err(RoomError::Rule(_))));

    let after = store.load(&code).await.unwrap().unwrap();
    assert_eq!(after.version, version_before + 1);
    let card = after.snapshot.game.unwrap().scorecard(0).unwrap().clone();
    assert_eq!(card.filled_count(), 1);
}

#[tokio::test]
async fn test_second_instance_sees_first_instance_moves() {
    let store = Arc::new(MemoryStore::new());
    let mut a = RoomManager::new(Arc::clone(&store), config());
    let mut b = RoomManager::new(Arc::clone(&store), config());
    let code = two_player_game(&mut a).await;

    a.roll(&code, pid(1), None).await.unwrap();
    a.select_category(&code, pid(1), Category::Chance).await.unwrap();
    let reply = b.roll(&code, pid(2), None).await.unwrap();

    assert_eq!(reply.player_index, 1);
    assert!(matches!(
        b.roll(&code, pid(1), None).await,
        Err(RoomError::Rule(RuleError::NotYourTurn { .. }))
    ));
}

// =========================================================================
// Bots
// =========================================================================

#[tokio::test]
async fn test_bots_play_a_whole_game() {
    let mut mgr = manager();
    let code = mgr.create_room().await.unwrap();
    mgr.add_bot(pid(100), &code, "robo-a").await.unwrap();
    mgr.add_bot(pid(101), &code, "robo-b").await.unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();
    mgr.subscribe(&code, tx).await.unwrap();

    mgr.start_game(&code).await.unwrap();

    let ranking = loop {
        let envelope = next_events(&mut rx).await;
        if let Some(RoomEvent::GameEnd { ranking, .. }) = envelope.events.last() {
            break ranking.clone();
        }
    };
    assert_eq!(ranking.len(), 2);
    assert!(ranking[0].grand_total >= ranking[1].grand_total);
    let snap = mgr.snapshot(&code).await.unwrap().snapshot;
    assert_eq!(snap.status, RoomStatus::Finished);
    assert!(snap.game.unwrap().scorecards().iter().all(|c| c.is_complete()));
}

#[tokio::test]
async fn test_bot_answers_a_human_move() {
    let mut mgr = manager();
    let code = mgr.create_room().await.unwrap();
    mgr.join_room(pid(1), &code, "ann").await.unwrap();
    mgr.add_bot(pid(100), &code, "robo").await.unwrap();
    mgr.start_game(&code).await.unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();
    mgr.subscribe(&code, tx).await.unwrap();

    mgr.roll(&code, pid(1), None).await.unwrap();
    mgr.select_category(&code, pid(1), Category::Chance).await.unwrap();

    // roll, score, then the bot's whole turn as one commit
    next_events(&mut rx).await;
    next_events(&mut rx).await;
    let bot = next_events(&mut rx).await;
    assert!(matches!(bot.events.first(), Some(RoomEvent::BotTurn { player_index: 1, round: 1 })));
    assert!(matches!(bot.events.last(), Some(RoomEvent::TurnChange { player_index: 0, round: 2 })));
    assert!(mgr.roll(&code, pid(1), None).await.is_ok());
}

#[tokio::test]
async fn test_stale_bot_turn_is_dropped_after_skip() {
    let mut mgr = RoomManager::new(
        Arc::new(MemoryStore::new()),
        RoomConfig {
            bot_delay: Duration::from_millis(200),
            ..config()
        },
    );
    let code = mgr.create_room().await.unwrap();
    mgr.join_room(pid(1), &code, "ann").await.unwrap();
    mgr.add_bot(pid(100), &code, "robo").await.unwrap();
    mgr.start_game(&code).await.unwrap();
    mgr.roll(&code, pid(1), None).await.unwrap();
    mgr.select_category(&code, pid(1), Category::Chance).await.unwrap();

    // The turn timer beats the bot to it.
    let skipped = mgr.skip_turn(&code).await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(skipped.player_index, 1);
    let game = mgr.snapshot(&code).await.unwrap().snapshot.game.unwrap();
    assert_eq!(game.turn().seat, 0);
    assert_eq!(game.turn().round, 2);
    assert_eq!(game.scorecard(1).unwrap().filled_count(), 1);
}

// =========================================================================
// Fan-out across instances
// =========================================================================

#[tokio::test]
async fn test_observer_on_other_instance_hears_commits() {
    let store = Arc::new(MemoryStore::new());
    let mut a = RoomManager::new(Arc::clone(&store), config());
    let mut b = RoomManager::new(Arc::clone(&store), config());
    let code = two_player_game(&mut a).await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    b.subscribe(&code, tx).await.unwrap();
    let Some(RoomOutbound::Snapshot(initial)) = rx.recv().await else {
        panic!("expected a snapshot first");
    };

    a.roll(&code, pid(1), None).await.unwrap();
    a.select_category(&code, pid(1), Category::Chance).await.unwrap();

    let roll = next_events(&mut rx).await;
    let score = next_events(&mut rx).await;
    assert_eq!(roll.version, initial.version + 1);
    assert_eq!(score.version, initial.version + 2);
    assert!(matches!(
        score.events.last(),
        Some(RoomEvent::TurnChange { player_index: 1, round: 1 })
    ));
}

#[tokio::test]
async fn test_each_commit_reaches_every_observer_once() {
    let store = Arc::new(MemoryStore::new());
    let mut a = RoomManager::new(Arc::clone(&store), config());
    let mut b = RoomManager::new(Arc::clone(&store), config());
    let code = two_player_game(&mut a).await;
    let (tx_a, mut rx_a) = mpsc::unbounded_channel();
    let (tx_b, mut rx_b) = mpsc::unbounded_channel();
    a.subscribe(&code, tx_a).await.unwrap();
    b.subscribe(&code, tx_b).await.unwrap();
    let start = store.load(&code).await.unwrap().unwrap().version;

    a.roll(&code, pid(1), None).await.unwrap();
    a.select_category(&code, pid(1), Category::Chance).await.unwrap();
    b.roll(&code, pid(2), None).await.unwrap();

    for rx in [&mut rx_a, &mut rx_b] {
        let versions = [
            next_events(rx).await.version,
            next_events(rx).await.version,
            next_events(rx).await.version,
        ];
        assert_eq!(versions, [start + 1, start + 2, start + 3]);
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx_a.try_recv().is_err(), "no duplicates on a");
    assert!(rx_b.try_recv().is_err(), "no duplicates on b");
}

// =========================================================================
// Conflicts and failures
// =========================================================================

fn meddling_manager() -> (Arc<MeddlingStore>, RoomManager<MeddlingStore>) {
    let store = Arc::new(MeddlingStore::default());
    let mgr = RoomManager::new(Arc::clone(&store), config());
    (store, mgr)
}

#[tokio::test]
async fn test_transient_conflicts_are_retried() {
    let (store, mut mgr) = meddling_manager();
    let code = two_player_game(&mut mgr).await;
    let before = store.inner.raw(&code).unwrap().0;
    let swaps = store.swaps.load(Ordering::SeqCst);

    store.conflicts.store(2, Ordering::SeqCst);
    let reply = mgr.roll(&code, pid(1), None).await.unwrap();

    assert_eq!(reply.roll_count, 1);
    assert_eq!(store.swaps.load(Ordering::SeqCst) - swaps, 3);
    assert_eq!(store.inner.raw(&code).unwrap().0, before + 1);
}

#[tokio::test]
async fn test_retry_revalidates_against_the_winner() {
    let (store, mut mgr) = meddling_manager();
    let code = two_player_game(&mut mgr).await;
    mgr.roll(&code, pid(1), None).await.unwrap();

    // Another writer times out ann's turn while her score is in flight.
    store.rival_skip.store(true, Ordering::SeqCst);
    let result = mgr.select_category(&code, pid(1), Category::Chance).await;

    assert!(matches!(
        result,
        Err(RoomError::Rule(RuleError::NotYourTurn { expected: 1, actual: 0 }))
    ));
    let game = mgr.snapshot(&code).await.unwrap().snapshot.game.unwrap();
    let card = game.scorecard(0).unwrap();
    assert_eq!(card.get(Category::Ones), Some(0));
    assert_eq!(card.get(Category::Chance), None);
    assert_eq!(game.turn().seat, 1);
}

#[tokio::test]
async fn test_exhausted_retries_reject_and_write_nothing() {
    let (store, mut mgr) = meddling_manager();
    let code = two_player_game(&mut mgr).await;
    let before = store.inner.raw(&code).unwrap();
    let swaps = store.swaps.load(Ordering::SeqCst);

    store.conflicts.store(10, Ordering::SeqCst);
    let result = mgr.roll(&code, pid(1), None).await;

    assert!(matches!(result, Err(RoomError::Conflict(c)) if c == code));
    let attempts = store.swaps.load(Ordering::SeqCst) - swaps;
    assert_eq!(attempts, 1 + config().max_commit_retries as usize);
    assert_eq!(store.inner.raw(&code).unwrap(), before);
}

#[tokio::test]
async fn test_store_failure_surfaces_without_retry() {
    let (store, mut mgr) = meddling_manager();
    let code = two_player_game(&mut mgr).await;
    let before = store.inner.raw(&code).unwrap();

    store.outages.store(1, Ordering::SeqCst);
    let result = mgr.roll(&code, pid(1), None).await;

    assert!(matches!(result, Err(RoomError::Store(StoreError::Backend(_)))));
    assert_eq!(store.inner.raw(&code).unwrap(), before);
    assert!(mgr.roll(&code, pid(1), None).await.is_ok());
}

#[tokio::test]
async fn test_failed_bot_turn_changes_nothing() {
    let store = Arc::new(MeddlingStore::default());
    let mut mgr = RoomManager::new(
        Arc::clone(&store),
        RoomConfig {
            bot_delay: Duration::from_millis(100),
            ..config()
        },
    );
    let code = mgr.create_room().await.unwrap();
    mgr.join_room(pid(1), &code, "ann").await.unwrap();
    mgr.add_bot(pid(100), &code, "robo").await.unwrap();
    mgr.start_game(&code).await.unwrap();
    mgr.roll(&code, pid(1), None).await.unwrap();
    mgr.select_category(&code, pid(1), Category::Chance).await.unwrap();
    let before = store.inner.raw(&code).unwrap();

    store.outages.store(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(store.outages.load(Ordering::SeqCst), 0, "the bot tried to commit");
    assert_eq!(store.inner.raw(&code).unwrap(), before);
    // The turn timer still works, and play goes on.
    let skipped = mgr.skip_turn(&code).await.unwrap();
    assert_eq!(skipped.player_index, 1);
    assert!(mgr.roll(&code, pid(1), None).await.is_ok());
}

// =========================================================================
// Eviction
// =========================================================================

#[tokio::test]
async fn test_game_ending_move_evicts_room() {
    let mut mgr = manager();
    let code = two_player_game(&mut mgr).await;

    let mut last = None;
    for _ in 0..2 * Category::COUNT {
        last = Some(mgr.skip_turn(&code).await.unwrap());
    }

    assert!(last.unwrap().finished);
    assert_eq!(mgr.room_count(), 0);
    assert_eq!(mgr.player_room(&pid(1)), None);
    assert_eq!(mgr.player_room(&pid(2)), None);
    // The finished room can still be read back from the store.
    let snap = mgr.snapshot(&code).await.unwrap().snapshot;
    assert_eq!(snap.status, RoomStatus::Finished);
}

#[tokio::test]
async fn test_evict_finished_catches_bot_games() {
    let mut mgr = manager();
    let open = mgr.create_room().await.unwrap();
    let code = mgr.create_room().await.unwrap();
    mgr.add_bot(pid(100), &code, "robo-a").await.unwrap();
    mgr.add_bot(pid(101), &code, "robo-b").await.unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();
    mgr.subscribe(&code, tx).await.unwrap();
    mgr.start_game(&code).await.unwrap();
    while !next_events(&mut rx)
        .await
        .events
        .iter()
        .any(|e| matches!(e, RoomEvent::GameEnd { .. }))
    {}

    let evicted = mgr.evict_finished().await.unwrap();

    assert_eq!(evicted, vec![(code, Vec::new())]);
    assert_eq!(mgr.room_count(), 1);
    assert!(mgr.snapshot(&open).await.is_ok());
}

#[tokio::test]
async fn test_stopped_actor_is_reopened() {
    let mut mgr = manager();
    let code = two_player_game(&mut mgr).await;
    mgr.open_room(&code).await.unwrap().shutdown().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let reply = mgr.roll(&code, pid(1), None).await;

    assert!(reply.is_ok());
    assert_eq!(mgr.room_count(), 1);
}
