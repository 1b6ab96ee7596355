//! One collection cycle: fetch, diff, update the sink, commit
//!
//! Cycles never run concurrently. The retained snapshot and the sink are only
//! touched once a fetch has succeeded.

use parking_lot::{Mutex, RwLock};
use routewatch_core::{
    Clock, CycleReport, MetricsSink, RouteId, RoutewatchResult, SnapshotSource, Timestamp,
};
use routewatch_state::{diff, SharedSnapshotStore, Snapshot};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct CycleState {
    /// Latest timestamp handed to the sink
    last_stamp: Timestamp,
    /// Removed routes whose labels are still exported, with removal time
    tombstones: BTreeMap<RouteId, Timestamp>,
}

impl CycleState {
    /// Wall-clock time, never earlier than any previous stamp
    fn stamp(&mut self, now: Timestamp) -> Timestamp {
        if now > self.last_stamp {
            self.last_stamp = now;
        }
        self.last_stamp
    }
}

/// Drives cycles against a source, a sink and the retained snapshot
pub struct RouteCollector {
    source: Arc<dyn SnapshotSource>,
    sink: Arc<dyn MetricsSink>,
    store: SharedSnapshotStore,
    clock: Arc<dyn Clock>,
    retention: Option<Duration>,
    state: Mutex<CycleState>,
    last_report: RwLock<Option<CycleReport>>,
    last_error: RwLock<Option<String>>,
}

impl RouteCollector {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        sink: Arc<dyn MetricsSink>,
        store: SharedSnapshotStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            sink,
            store,
            clock,
            retention: None,
            state: Mutex::new(CycleState::default()),
            last_report: RwLock::new(None),
            last_error: RwLock::new(None),
        }
    }

    /// Forget removed routes after they stayed absent for `retention`
    pub fn with_retention(mut self, retention: Option<Duration>) -> Self {
        self.retention = retention;
        self
    }

    pub fn store(&self) -> &SharedSnapshotStore {
        &self.store
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Report of the latest successful cycle
    pub fn last_report(&self) -> Option<CycleReport> {
        self.last_report.read().clone()
    }

    /// Error of the latest cycle, cleared by the next success
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Run one full cycle.
    ///
    /// A fetch failure (including cancellation) leaves the retained snapshot
    /// and every route signal untouched and is returned to the caller.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> RoutewatchResult<CycleReport> {
        let started = Instant::now();
        let started_at = self.clock.now();

        let lines = match self.source.fetch(cancel).await {
            Ok(lines) => lines,
            Err(e) => {
                warn!(source = self.source.name(), error = %e, "Route fetch failed, keeping previous snapshot");
                if let Err(err) = self.sink.record_failure() {
                    warn!(error = %err, "Failed to record fetch failure");
                }
                *self.last_error.write() = Some(e.to_string());
                return Err(e);
            }
        };

        let report = self.apply(Snapshot::from_lines(lines), started, started_at);
        *self.last_report.write() = Some(report.clone());
        *self.last_error.write() = None;
        Ok(report)
    }

    fn apply(&self, current: Snapshot, started: Instant, started_at: Timestamp) -> CycleReport {
        let mut state = self.state.lock();
        let now = state.stamp(self.clock.now());

        let previous = self.store.current();
        let record = diff(&previous, &current);
        let mut sink_errors = 0;

        for route in &record.added {
            info!(route = %route, "Route added");
            state.tombstones.remove(route);
            sink_errors += self.check(route, self.sink.set_route_present(route, true));
            sink_errors += self.check(route, self.sink.set_route_last_change(route, now));
            sink_errors += self.check(route, self.sink.set_route_last_seen(route, now));
        }

        for route in &record.retained {
            sink_errors += self.check(route, self.sink.set_route_present(route, true));
            sink_errors += self.check(route, self.sink.set_route_last_seen(route, now));
        }

        for route in &record.removed {
            info!(route = %route, "Route removed");
            sink_errors += self.check(route, self.sink.set_route_present(route, false));
            sink_errors += self.check(route, self.sink.set_route_last_change(route, now));
            if self.retention.is_some() {
                state.tombstones.insert(route.clone(), now);
            }
        }

        let purged = self.purge_stale(&mut state, now);

        if let Err(e) = self.sink.set_changed(record.changed()) {
            sink_errors += 1;
            warn!(error = %e, "Failed to update change indicator");
        }

        let total = current.len();
        self.store.replace_at(current, now);

        let report = CycleReport {
            started_at,
            duration_ms: started.elapsed().as_millis() as u64,
            total,
            added: record.added.len(),
            removed: record.removed.len(),
            purged,
            sink_errors,
        };
        if let Err(e) = self.sink.record_cycle(&report) {
            warn!(error = %e, "Failed to record cycle");
        }

        debug!(
            total = report.total,
            added = report.added,
            removed = report.removed,
            purged = report.purged,
            duration_ms = report.duration_ms,
            "Collection cycle complete"
        );
        report
    }

    fn purge_stale(&self, state: &mut CycleState, now: Timestamp) -> usize {
        let Some(retention) = self.retention else {
            return 0;
        };
        let retention_ms = retention.as_millis() as u64;

        let expired: Vec<RouteId> = state
            .tombstones
            .iter()
            .filter(|(_, removed_at)| now.saturating_sub(**removed_at) >= retention_ms)
            .map(|(route, _)| route.clone())
            .collect();

        let mut purged = 0;
        for route in expired {
            match self.sink.forget_route(&route) {
                Ok(()) => {
                    debug!(route = %route, "Dropped labels of stale route");
                    state.tombstones.remove(&route);
                    purged += 1;
                }
                // keep the tombstone, retry next cycle
                Err(e) => warn!(route = %route, error = %e, "Failed to drop stale route"),
            }
        }
        purged
    }

    fn check(&self, route: &RouteId, result: RoutewatchResult<()>) -> usize {
        match result {
            Ok(()) => 0,
            Err(e) => {
                warn!(route = %route, error = %e, "Metrics sink write failed");
                1
            }
        }
    }
}
