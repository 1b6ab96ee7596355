//! Snapshot comparison

use routewatch_core::RouteId;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::snapshot::Snapshot;

/// Result of comparing two consecutive snapshots
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ChangeRecord {
    /// Present now, absent before
    pub added: BTreeSet<RouteId>,
    /// Absent now, present before
    pub removed: BTreeSet<RouteId>,
    /// Present in both
    pub retained: BTreeSet<RouteId>,
}

impl ChangeRecord {
    /// True iff anything was added or removed
    pub fn changed(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }

    pub fn is_added(&self, route: &RouteId) -> bool {
        self.added.contains(route)
    }

    /// Routes of the current snapshot, added first then retained
    pub fn present(&self) -> impl Iterator<Item = &RouteId> {
        self.added.iter().chain(self.retained.iter())
    }
}

/// Classify every route of `previous` and `current`.
///
/// Pure and deterministic; empty inputs are fine.
pub fn diff(previous: &Snapshot, current: &Snapshot) -> ChangeRecord {
    let mut record = ChangeRecord::default();

    for route in current {
        if previous.contains(route) {
            record.retained.insert(route.clone());
        } else {
            record.added.insert(route.clone());
        }
    }

    record.removed = previous
        .iter()
        .filter(|route| !current.contains(route))
        .cloned()
        .collect();

    record
}
