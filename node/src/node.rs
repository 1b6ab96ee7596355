//! Full node implementation

use crate::api::{bind_api, start_api_server};
use crate::runtime::NodeRuntime;
use routewatch_core::{NodeConfig, SchedulePolicy};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Route watching node: collection loop plus HTTP API
pub struct RouteWatchNode {
    runtime: Arc<NodeRuntime>,
    shutdown: CancellationToken,
}

impl RouteWatchNode {
    /// Create a new node
    pub fn new(config: NodeConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let runtime = Arc::new(NodeRuntime::new(config)?);
        Ok(Self::with_runtime(runtime))
    }

    pub fn with_runtime(runtime: Arc<NodeRuntime>) -> Self {
        Self {
            runtime,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops the node when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Start the node and run until Ctrl-C or the shutdown token fires
    pub async fn start(&self) -> anyhow::Result<()> {
        info!("Starting routewatch node {}...", self.runtime.config().name);

        // Bind before collecting so an unusable address fails fast
        let addr = self.runtime.config().api.socket_addr()?;
        let listener = bind_api(addr).await?;

        let scheduler_runtime = self.runtime.clone();
        let scheduler_cancel = self.shutdown.clone();
        let scheduler_handle = tokio::spawn(async move {
            scheduler_runtime.run_scheduler(scheduler_cancel).await
        });

        let api_runtime = self.runtime.clone();
        let api_cancel = self.shutdown.clone();
        let api_handle = tokio::spawn(async move {
            if let Err(e) = start_api_server(api_runtime, listener, api_cancel).await {
                error!("API server error: {}", e);
            }
        });

        info!("Node started successfully");

        // Wait for shutdown signal
        tokio::select! {
            result = signal::ctrl_c() => match result {
                Ok(()) => info!("Shutdown signal received, stopping node..."),
                Err(e) => error!("Error waiting for shutdown signal: {}", e),
            },
            _ = self.shutdown.cancelled() => info!("Shutdown requested, stopping node..."),
        }

        self.shutdown.cancel();
        let summary = scheduler_handle.await?;
        api_handle.await?;

        info!(
            cycles = summary.cycles,
            failures = summary.failures,
            "Node stopped"
        );

        Ok(())
    }

    /// Get runtime reference
    pub fn runtime(&self) -> &Arc<NodeRuntime> {
        &self.runtime
    }
}

/// Node builder for easier configuration
pub struct NodeBuilder {
    config: NodeConfig,
}

impl NodeBuilder {
    pub fn new() -> Self {
        Self {
            config: NodeConfig::default(),
        }
    }

    pub fn config(mut self, config: NodeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn interval_secs(mut self, secs: u64) -> Self {
        self.config.collector.interval_secs = secs;
        self
    }

    pub fn schedule(mut self, policy: SchedulePolicy) -> Self {
        self.config.collector.schedule = policy;
        self
    }

    pub fn api_addr(mut self, addr: &str) -> Self {
        self.config.api.listen_addr = addr.to_string();
        self
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.log_level = level.to_string();
        self
    }

    /// Effective configuration
    pub fn current_config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn build(self) -> anyhow::Result<RouteWatchNode> {
        RouteWatchNode::new(self.config)
    }
}

impl Default for NodeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
