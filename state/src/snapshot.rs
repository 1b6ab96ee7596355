//! Routing table snapshots

use routewatch_core::RouteId;
use serde::Serialize;
use std::collections::btree_set::{self, BTreeSet};

/// The routing table at one point in time
///
/// Each route appears at most once; duplicate lines from the source collapse.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Snapshot {
    routes: BTreeSet<RouteId>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from raw source lines.
    ///
    /// Lines are trimmed and blank lines are dropped.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        lines
            .into_iter()
            .filter_map(|line| RouteId::parse(line.as_ref()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn contains(&self, route: &RouteId) -> bool {
        self.routes.contains(route)
    }

    pub fn iter(&self) -> btree_set::Iter<'_, RouteId> {
        self.routes.iter()
    }

    pub fn routes(&self) -> &BTreeSet<RouteId> {
        &self.routes
    }
}

impl FromIterator<RouteId> for Snapshot {
    fn from_iter<T: IntoIterator<Item = RouteId>>(iter: T) -> Self {
        Self {
            routes: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a RouteId;
    type IntoIter = btree_set::Iter<'a, RouteId>;

    fn into_iter(self) -> Self::IntoIter {
        self.routes.iter()
    }
}
