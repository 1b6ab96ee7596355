//! Error types for routewatch

use std::time::Duration;
use thiserror::Error;

/// Main error type for routewatch
#[derive(Error, Debug)]
pub enum RoutewatchError {
    // ============ Snapshot Source Errors ============
    #[error("Failed to spawn `{command}`: {reason}")]
    Spawn { command: String, reason: String },

    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Fetch cancelled")]
    Cancelled,

    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),

    // ============ Metrics Errors ============
    #[error("Metrics error: {0}")]
    Metrics(String),

    // ============ Configuration Errors ============
    #[error("Configuration error: {0}")]
    Config(String),

    // ============ General Errors ============
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RoutewatchError {
    /// Whether the error means the source could not produce a snapshot.
    ///
    /// These are recovered by skipping the cycle; the retained snapshot and
    /// the sink stay as they were.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            RoutewatchError::Spawn { .. }
                | RoutewatchError::CommandFailed { .. }
                | RoutewatchError::Cancelled
                | RoutewatchError::Timeout(_)
        )
    }
}

impl From<std::io::Error> for RoutewatchError {
    fn from(err: std::io::Error) -> Self {
        RoutewatchError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for RoutewatchError {
    fn from(err: toml::de::Error) -> Self {
        RoutewatchError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for RoutewatchError {
    fn from(err: toml::ser::Error) -> Self {
        RoutewatchError::Config(err.to_string())
    }
}
