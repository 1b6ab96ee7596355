//! Collection scheduler
//!
//! Fires the first cycle immediately, then keeps firing until cancelled.
//! Cycles run one at a time; see [`SchedulePolicy`] for how the interval is
//! measured.

use routewatch_core::{CollectorConfig, SchedulePolicy};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::collector::RouteCollector;

/// Scheduler life cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// Waiting for the next tick
    Idle,
    /// A cycle is in progress
    Collecting,
    /// Cancelled, no more cycles will run
    Stopped,
}

/// Totals returned when the scheduler stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerSummary {
    pub cycles: u64,
    pub failures: u64,
}

pub struct Scheduler {
    interval: Duration,
    policy: SchedulePolicy,
    state: watch::Sender<SchedulerState>,
}

impl Scheduler {
    pub fn new(interval: Duration, policy: SchedulePolicy) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            interval,
            policy,
            state,
        }
    }

    pub fn from_config(config: &CollectorConfig) -> Self {
        Self::new(config.interval(), config.schedule)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn policy(&self) -> SchedulePolicy {
        self.policy
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: SchedulerState) {
        self.state.send_replace(state);
    }

    /// Run cycles until `cancel` fires.
    ///
    /// An in-flight fetch is abandoned on cancellation and counted as a
    /// failed cycle.
    pub async fn run(&self, collector: &RouteCollector, cancel: CancellationToken) -> SchedulerSummary {
        info!(
            source = collector.source_name(),
            interval = ?self.interval,
            policy = %self.policy,
            "Route collection started"
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut summary = SchedulerSummary::default();

        loop {
            let fire = async {
                match self.policy {
                    SchedulePolicy::FixedRate => {
                        ticker.tick().await;
                    }
                    SchedulePolicy::FixedDelay if summary.cycles > 0 => sleep(self.interval).await,
                    SchedulePolicy::FixedDelay => {}
                }
            };
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = fire => {}
            }

            self.set_state(SchedulerState::Collecting);
            match collector.run_cycle(&cancel).await {
                Ok(report) => debug!(changed = report.changed(), "Cycle finished"),
                Err(e) => {
                    summary.failures += 1;
                    if cancel.is_cancelled() {
                        debug!("Cycle abandoned on shutdown");
                    } else {
                        warn!(error = %e, "Cycle failed, retrying on next tick");
                    }
                }
            }
            summary.cycles += 1;
            self.set_state(SchedulerState::Idle);
        }

        self.set_state(SchedulerState::Stopped);
        info!(
            cycles = summary.cycles,
            failures = summary.failures,
            "Route collection stopped"
        );
        summary
    }
}
