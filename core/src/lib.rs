//! routewatch Core Library
//!
//! Core types, traits, and configuration shared by the routewatch crates.
//! The collector treats routes as opaque strings; everything here is about
//! moving those strings between the source, the diff engine and the sink.

pub mod types;
pub mod traits;
pub mod error;
pub mod config;

pub use types::*;
pub use traits::*;
pub use error::*;
pub use config::*;

pub use tokio_util::sync::CancellationToken;
