//! Configuration types for routewatch
//!
//! All settings are fixed at startup. A TOML file may provide any subset of
//! the fields; everything missing falls back to the defaults below.

use crate::error::RoutewatchError;
use crate::traits::RoutewatchResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Main node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Node name for logging
    pub name: String,

    /// Logging level, used when `RUST_LOG` is not set
    pub log_level: String,

    /// Collection loop configuration
    pub collector: CollectorConfig,

    /// API configuration
    pub api: ApiConfig,

    /// Exported metric naming
    pub metrics: MetricsConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: "routewatch".to_string(),
            log_level: "info".to_string(),
            collector: CollectorConfig::default(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> RoutewatchResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RoutewatchError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> RoutewatchResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> RoutewatchResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject settings the node cannot run with
    pub fn validate(&self) -> RoutewatchResult<()> {
        if self.collector.interval_secs == 0 {
            return Err(RoutewatchError::Config(
                "collector.interval_secs must be greater than zero".into(),
            ));
        }
        if self.collector.command.is_empty() || self.collector.command[0].trim().is_empty() {
            return Err(RoutewatchError::Config(
                "collector.command must name a program".into(),
            ));
        }
        self.api.socket_addr()?;
        Ok(())
    }
}

/// How the interval between cycles is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SchedulePolicy {
    /// Sleep for the interval after each cycle finishes.
    /// The effective period is collection time plus interval.
    #[default]
    FixedDelay,
    /// Start a cycle every interval, measured start to start.
    /// A cycle that overruns delays the next one; cycles never overlap.
    FixedRate,
}

impl fmt::Display for SchedulePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulePolicy::FixedDelay => f.write_str("fixed-delay"),
            SchedulePolicy::FixedRate => f.write_str("fixed-rate"),
        }
    }
}

impl FromStr for SchedulePolicy {
    type Err = RoutewatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed-delay" => Ok(SchedulePolicy::FixedDelay),
            "fixed-rate" => Ok(SchedulePolicy::FixedRate),
            other => Err(RoutewatchError::Config(format!(
                "unknown schedule policy `{}` (expected fixed-delay or fixed-rate)",
                other
            ))),
        }
    }
}

/// Collection loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Seconds between cycles
    pub interval_secs: u64,

    /// Interval measurement policy
    pub schedule: SchedulePolicy,

    /// Upper bound on one fetch in seconds, 0 disables the bound
    pub fetch_timeout_secs: u64,

    /// Program and arguments that print the routing table, one route per line
    pub command: Vec<String>,

    /// Drop the labels of a removed route after it stayed absent this many
    /// seconds. 0 keeps them for the lifetime of the process.
    pub stale_route_retention_secs: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            schedule: SchedulePolicy::FixedDelay,
            fetch_timeout_secs: 10,
            command: vec!["ip".to_string(), "route".to_string(), "show".to_string()],
            stale_route_retention_secs: 86_400, // 1 day
        }
    }
}

impl CollectorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        match self.fetch_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn stale_route_retention(&self) -> Option<Duration> {
        match self.stale_route_retention_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// API configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API listen address
    pub listen_addr: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8081".to_string(),
        }
    }
}

impl ApiConfig {
    pub fn socket_addr(&self) -> RoutewatchResult<SocketAddr> {
        self.listen_addr.parse().map_err(|_| {
            RoutewatchError::Config(format!("invalid api.listen_addr `{}`", self.listen_addr))
        })
    }
}

/// Exported metric naming
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MetricsConfig {
    /// Optional prefix joined to every metric name with `_`
    pub namespace: Option<String>,
}
