//! Retained snapshot store
//!
//! Holds the last successfully observed routing table. Readers get a shared
//! immutable handle; the single writer swaps in a whole new snapshot.

use parking_lot::RwLock;
use routewatch_core::Timestamp;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::snapshot::Snapshot;

#[derive(Debug)]
struct Committed {
    snapshot: Arc<Snapshot>,
    generation: u64,
    committed_at: Option<Timestamp>,
}

/// Consistent view of the store for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStatus {
    /// Number of replaces since startup
    pub generation: u64,
    /// Time of the latest replace, `None` before the first one
    pub committed_at: Option<Timestamp>,
    /// Routes in the retained snapshot
    pub route_count: usize,
}

/// Store for the single retained snapshot
#[derive(Debug)]
pub struct SnapshotStore {
    inner: RwLock<Committed>,
}

impl SnapshotStore {
    /// Empty store, as at startup
    pub fn new() -> Self {
        Self::with_snapshot(Snapshot::new())
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            inner: RwLock::new(Committed {
                snapshot: Arc::new(snapshot),
                generation: 0,
                committed_at: None,
            }),
        }
    }

    /// The retained snapshot
    pub fn current(&self) -> Arc<Snapshot> {
        self.inner.read().snapshot.clone()
    }

    /// Swap in `snapshot` and hand back the one it replaced.
    ///
    /// Readers see either the old or the new snapshot, never a mix.
    pub fn replace(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        self.replace_at(snapshot, Timestamp::now())
    }

    pub fn replace_at(&self, snapshot: Snapshot, at: Timestamp) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        let mut inner = self.inner.write();
        let previous = std::mem::replace(&mut inner.snapshot, snapshot);
        inner.generation += 1;
        inner.committed_at = Some(at);
        debug!(
            generation = inner.generation,
            routes = inner.snapshot.len(),
            "Retained snapshot replaced"
        );
        previous
    }

    /// Retained snapshot together with the status it was committed under
    pub fn view(&self) -> (Arc<Snapshot>, StoreStatus) {
        let inner = self.inner.read();
        let status = StoreStatus {
            generation: inner.generation,
            committed_at: inner.committed_at,
            route_count: inner.snapshot.len(),
        };
        (inner.snapshot.clone(), status)
    }

    pub fn generation(&self) -> u64 {
        self.inner.read().generation
    }

    pub fn committed_at(&self) -> Option<Timestamp> {
        self.inner.read().committed_at
    }

    pub fn status(&self) -> StoreStatus {
        self.view().1
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe store handle
pub type SharedSnapshotStore = Arc<SnapshotStore>;

/// Create a shared, empty snapshot store
pub fn create_snapshot_store() -> SharedSnapshotStore {
    Arc::new(SnapshotStore::new())
}
