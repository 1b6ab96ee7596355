//! Core types for routewatch
//!
//! Defines the fundamental values exchanged between the collector components.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One routing-table entry, exactly as printed by the snapshot source
///
/// Identity is the trimmed line. Nothing inside the line is interpreted.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteId(String);

impl RouteId {
    /// Normalize a raw source line into a route identifier.
    ///
    /// Returns `None` for lines that are empty after trimming.
    pub fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(RouteId(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for RouteId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RouteId({:?})", self.0)
    }
}

/// Timestamp in milliseconds since Unix epoch
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub fn now() -> Self {
        Timestamp(chrono::Utc::now().timestamp_millis().max(0) as u64)
    }

    pub fn from_millis(millis: u64) -> Self {
        Timestamp(millis)
    }

    pub fn from_secs(secs: u64) -> Self {
        Timestamp(secs.saturating_mul(1000))
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Whole seconds, the unit exported to the metrics sink
    pub fn as_secs(&self) -> u64 {
        self.0 / 1000
    }

    pub fn saturating_sub(&self, other: Timestamp) -> u64 {
        self.0.saturating_sub(other.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// Summary of one collection cycle, kept for diagnostics and metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Cycle start time
    pub started_at: Timestamp,
    /// Wall time spent in the cycle, in milliseconds
    pub duration_ms: u64,
    /// Routes present after the cycle
    pub total: usize,
    pub added: usize,
    pub removed: usize,
    /// Labels dropped from the sink by the retention policy
    pub purged: usize,
    /// Sink writes that failed during the update
    pub sink_errors: usize,
}

impl CycleReport {
    /// True when the routing table differed from the previous cycle
    pub fn changed(&self) -> bool {
        self.added > 0 || self.removed > 0
    }
}
