//! Node runtime combining all components

use routewatch_core::{
    Clock, MetricsSink, NodeConfig, RoutewatchResult, SnapshotSource, SystemClock,
};
use routewatch_state::{create_snapshot_store, SharedSnapshotStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::collector::RouteCollector;
use crate::metrics::PrometheusSink;
use crate::scheduler::{Scheduler, SchedulerState, SchedulerSummary};
use crate::source::CommandSource;

/// Node runtime owning the store, the sink and the collection loop
pub struct NodeRuntime {
    config: NodeConfig,
    store: SharedSnapshotStore,
    sink: Arc<PrometheusSink>,
    collector: Arc<RouteCollector>,
    scheduler: Scheduler,
}

impl NodeRuntime {
    /// Create a runtime reading routes from the configured command
    pub fn new(config: NodeConfig) -> RoutewatchResult<Self> {
        let source = Arc::new(CommandSource::from_config(&config.collector)?);
        Self::with_source(config, source, Arc::new(SystemClock))
    }

    /// Create a runtime around any snapshot source
    pub fn with_source(
        config: NodeConfig,
        source: Arc<dyn SnapshotSource>,
        clock: Arc<dyn Clock>,
    ) -> RoutewatchResult<Self> {
        let store = create_snapshot_store();
        let sink = Arc::new(PrometheusSink::new(&config.metrics)?);
        let sink_handle: Arc<dyn MetricsSink> = sink.clone();

        let collector = Arc::new(
            RouteCollector::new(source, sink_handle, store.clone(), clock)
                .with_retention(config.collector.stale_route_retention()),
        );
        let scheduler = Scheduler::from_config(&config.collector);

        Ok(Self {
            config,
            store,
            sink,
            collector,
            scheduler,
        })
    }

    /// Run the collection loop until `cancel` fires
    pub async fn run_scheduler(&self, cancel: CancellationToken) -> SchedulerSummary {
        self.scheduler.run(&self.collector, cancel).await
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn collector(&self) -> &Arc<RouteCollector> {
        &self.collector
    }

    pub fn store(&self) -> &SharedSnapshotStore {
        &self.store
    }

    pub fn sink(&self) -> &Arc<PrometheusSink> {
        &self.sink
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }
}
