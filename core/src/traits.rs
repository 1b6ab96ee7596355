//! Core traits defining routewatch interfaces
//!
//! The collector only talks to the outside world through these seams: a
//! source that lists the routing table, a sink that stores the exported
//! gauges, and a clock.

use crate::types::*;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

/// Result type for routewatch operations
pub type RoutewatchResult<T> = Result<T, crate::error::RoutewatchError>;

/// Produces the raw routing table on demand
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Human readable name used in logs
    fn name(&self) -> &str;

    /// Fetch the current routing table as raw lines.
    ///
    /// Implementations must return promptly with
    /// [`RoutewatchError::Cancelled`](crate::RoutewatchError::Cancelled) once
    /// `cancel` fires.
    async fn fetch(&self, cancel: &CancellationToken) -> RoutewatchResult<Vec<String>>;
}

/// Receives the per-route and global signals computed by a cycle
///
/// Writes are independent: a failure on one route must not affect others.
pub trait MetricsSink: Send + Sync {
    /// Global indicator, true if the latest cycle saw any change
    fn set_changed(&self, changed: bool) -> RoutewatchResult<()>;

    /// 1 while the route is present, 0 once removed
    fn set_route_present(&self, route: &RouteId, present: bool) -> RoutewatchResult<()>;

    /// Time of the latest presence transition of the route
    fn set_route_last_change(&self, route: &RouteId, at: Timestamp) -> RoutewatchResult<()>;

    /// Time the route was last observed by a successful cycle
    fn set_route_last_seen(&self, route: &RouteId, at: Timestamp) -> RoutewatchResult<()>;

    /// Drop every series labelled with the route
    fn forget_route(&self, route: &RouteId) -> RoutewatchResult<()>;

    /// Bookkeeping for a completed cycle
    fn record_cycle(&self, report: &CycleReport) -> RoutewatchResult<()>;

    /// Bookkeeping for a cycle whose fetch failed
    fn record_failure(&self) -> RoutewatchResult<()>;
}

/// Wall clock abstraction
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Real system clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            millis: AtomicU64::new(start.as_millis()),
        }
    }

    pub fn set(&self, at: Timestamp) {
        self.millis.store(at.as_millis(), Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: u64) {
        self.millis.fetch_add(secs * 1000, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(Timestamp::from_secs(100));
        assert_eq!(clock.now().as_secs(), 100);

        clock.advance_secs(30);
        assert_eq!(clock.now().as_secs(), 130);

        // may go backwards, like a real wall clock
        clock.set(Timestamp::from_secs(90));
        assert_eq!(clock.now().as_secs(), 90);
    }

    #[test]
    fn test_system_clock_after_2020() {
        assert!(SystemClock.now().as_secs() > 1_577_836_800);
    }

    #[test]
    fn test_clock_trait_object() {
        let clock: Box<dyn Clock> = Box::new(ManualClock::new(Timestamp::from_secs(7)));
        assert_eq!(clock.now(), Timestamp::from_secs(7));
    }
}
