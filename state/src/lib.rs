//! routewatch State Management
//!
//! Snapshots of the routing table, the diff engine comparing two of them,
//! and the store retaining the latest one between collection cycles.

pub mod snapshot;
pub mod diff;
pub mod store;

pub use snapshot::*;
pub use diff::*;
pub use store::*;
