//! Versioned snapshot storage.
//!
//! The store is the only shared state between room actors, including actors
//! for the same room running in different processes. Its one hard promise:
//! two commits against the same version can't both succeed.
//!
//! It also carries the room's event feed. The actor that commits a version
//! publishes its envelope; every actor following the room (this process or
//! another) forwards it to its own observers.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use tokio::sync::broadcast;
use yacht_protocol::{Codec, EventEnvelope, JsonCodec, RoomCode};

use crate::{RoomSnapshot, StoreError, Versioned};

/// Where room snapshots live.
///
/// Methods return `Send` futures so a store can be used from spawned room
/// tasks. Implementations must make [`compare_and_swap`](Self::compare_and_swap)
/// atomic with respect to other callers, in-process or not.
pub trait SnapshotStore: Send + Sync + 'static {
    /// The latest snapshot and its version, or `None` for an unknown room.
    fn load(
        &self,
        code: &RoomCode,
    ) -> impl Future<Output = Result<Option<Versioned>, StoreError>> + Send;

    /// Writes `snapshot` if the stored version still equals `expected`
    /// (`None` means "room must not exist yet") and returns the new version.
    ///
    /// # Errors
    /// [`StoreError::VersionConflict`] if someone else got there first.
    fn compare_and_swap(
        &self,
        code: &RoomCode,
        expected: Option<u64>,
        snapshot: &RoomSnapshot,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Deletes a room. Returns whether it existed. Followers of its feed
    /// see the feed close.
    fn remove(&self, code: &RoomCode) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Hands a committed envelope to everyone following `envelope.room`.
    /// At most once; nobody following is not an error.
    fn publish(&self, envelope: &EventEnvelope) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Starts following a room's feed. Envelopes published from now on
    /// arrive in publish order. A follower that falls behind gets
    /// [`RecvError::Lagged`](broadcast::error::RecvError::Lagged) and
    /// should resync from [`load`](Self::load).
    fn follow(&self, code: &RoomCode) -> broadcast::Receiver<EventEnvelope>;
}

/// Envelopes a [`MemoryStore`] feed buffers per follower before it lags.
pub const FEED_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-process [`SnapshotStore`].
///
/// Keeps encoded bytes, not live objects: every `load` decodes a fresh
/// copy, so two actors sharing one `MemoryStore` behave like two processes
/// sharing a database.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rooms: Mutex<HashMap<RoomCode, (u64, Vec<u8>)>>,
    feeds: Mutex<HashMap<RoomCode, broadcast::Sender<EventEnvelope>>>,
    codec: JsonCodec,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored bytes and version, for tests that check a rejected
    /// command wrote nothing.
    pub fn raw(&self, code: &RoomCode) -> Option<(u64, Vec<u8>)> {
        self.lock().get(code).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// A poisoned lock only means another thread panicked mid-access; the
    /// map itself is always whole, so keep going.
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<RoomCode, (u64, Vec<u8>)>> {
        self.rooms.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn feeds(&self) -> std::sync::MutexGuard<'_, HashMap<RoomCode, broadcast::Sender<EventEnvelope>>> {
        self.feeds.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SnapshotStore for MemoryStore {
    fn load(
        &self,
        code: &RoomCode,
    ) -> impl Future<Output = Result<Option<Versioned>, StoreError>> + Send {
        let entry = self.lock().get(code).cloned();
        let decoded = entry
            .map(|(version, bytes)| -> Result<Versioned, StoreError> {
                let snapshot = self.codec.decode(&bytes)?;
                Ok(Versioned { version, snapshot })
            })
            .transpose();
        std::future::ready(decoded)
    }

    fn compare_and_swap(
        &self,
        code: &RoomCode,
        expected: Option<u64>,
        snapshot: &RoomSnapshot,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send {
        std::future::ready(self.swap(code, expected, snapshot))
    }

    fn remove(&self, code: &RoomCode) -> impl Future<Output = Result<bool, StoreError>> + Send {
        self.feeds().remove(code);
        std::future::ready(Ok(self.lock().remove(code).is_some()))
    }

    fn publish(&self, envelope: &EventEnvelope) -> impl Future<Output = Result<(), StoreError>> + Send {
        if let Some(feed) = self.feeds().get(&envelope.room) {
            // No receivers left is fine.
            let _ = feed.send(envelope.clone());
        }
        std::future::ready(Ok(()))
    }

    fn follow(&self, code: &RoomCode) -> broadcast::Receiver<EventEnvelope> {
        self.feeds()
            .entry(code.clone())
            .or_insert_with(|| broadcast::channel(FEED_CAPACITY).0)
            .subscribe()
    }
}

impl MemoryStore {
    fn swap(
        &self,
        code: &RoomCode,
        expected: Option<u64>,
        snapshot: &RoomSnapshot,
    ) -> Result<u64, StoreError> {
        let bytes = self.codec.encode(snapshot)?;
        let mut rooms = self.lock();
        let actual = rooms.get(code).map(|(version, _)| *version);
        if actual != expected {
            return Err(StoreError::VersionConflict {
                code: code.clone(),
                expected,
                actual,
            });
        }
        let next = actual.map_or(1, |v| v + 1);
        rooms.insert(code.clone(), (next, bytes));
        Ok(next)
    }
}
