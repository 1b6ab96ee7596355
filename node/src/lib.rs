//! routewatch node implementation
//!
//! Combines the collection loop and its outputs:
//! - route table source (`ip route show` by default)
//! - diff and Prometheus metrics sink
//! - HTTP API serving `/metrics`

mod api;
mod collector;
mod metrics;
mod node;
mod runtime;
mod scheduler;
mod source;

#[cfg(test)]
mod test_utils;

pub use api::*;
pub use collector::*;
pub use metrics::*;
pub use node::*;
pub use runtime::*;
pub use scheduler::*;
pub use source::*;
