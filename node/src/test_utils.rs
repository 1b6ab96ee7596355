//! Scripted collaborators for unit tests

use async_trait::async_trait;
use parking_lot::Mutex;
use routewatch_core::{
    CycleReport, MetricsSink, RouteId, RoutewatchError, RoutewatchResult, SnapshotSource,
    Timestamp,
};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// One scripted answer of [`ScriptedSource`]
#[derive(Debug, Clone)]
pub enum Step {
    Routes(Vec<String>),
    Fail(String),
}

pub fn routes(lines: &[&str]) -> Step {
    Step::Routes(lines.iter().map(|s| s.to_string()).collect())
}

/// Source replaying a fixed script, then repeating its last step
pub struct ScriptedSource {
    steps: Mutex<VecDeque<Step>>,
    last: Mutex<Step>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    started: Mutex<Vec<Instant>>,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            last: Mutex::new(Step::Routes(Vec::new())),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            started: Mutex::new(Vec::new()),
        }
    }

    /// Every fetch takes `delay` (tokio time) before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> Vec<Instant> {
        self.started.lock().clone()
    }

    fn next_step(&self) -> Step {
        let mut steps = self.steps.lock();
        match steps.pop_front() {
            Some(step) => {
                *self.last.lock() = step.clone();
                step
            }
            None => self.last.lock().clone(),
        }
    }
}

#[async_trait]
impl SnapshotSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch(&self, cancel: &CancellationToken) -> RoutewatchResult<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.lock().push(Instant::now());
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let waited = if self.delay.is_zero() {
            !cancel.is_cancelled()
        } else {
            tokio::select! {
                _ = cancel.cancelled() => false,
                _ = tokio::time::sleep(self.delay) => true,
            }
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if !waited {
            return Err(RoutewatchError::Cancelled);
        }
        match self.next_step() {
            Step::Routes(lines) => Ok(lines),
            Step::Fail(stderr) => Err(RoutewatchError::CommandFailed {
                command: "scripted".into(),
                status: "exit status: 1".into(),
                stderr,
            }),
        }
    }
}

/// Sink rejecting writes for selected routes, recording everything else
#[derive(Default)]
pub struct FlakySink {
    reject: HashSet<String>,
    pub present: Mutex<Vec<(String, bool)>>,
    pub changed: Mutex<Option<bool>>,
    pub cycles: AtomicUsize,
}

impl FlakySink {
    pub fn rejecting(routes: &[&str]) -> Self {
        Self {
            reject: routes.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn check(&self, route: &RouteId) -> RoutewatchResult<()> {
        if self.reject.contains(route.as_str()) {
            Err(RoutewatchError::Metrics(format!("rejected {}", route)))
        } else {
            Ok(())
        }
    }
}

impl MetricsSink for FlakySink {
    fn set_changed(&self, changed: bool) -> RoutewatchResult<()> {
        *self.changed.lock() = Some(changed);
        Ok(())
    }

    fn set_route_present(&self, route: &RouteId, present: bool) -> RoutewatchResult<()> {
        self.check(route)?;
        self.present.lock().push((route.to_string(), present));
        Ok(())
    }

    fn set_route_last_change(&self, route: &RouteId, _at: Timestamp) -> RoutewatchResult<()> {
        self.check(route)
    }

    fn set_route_last_seen(&self, route: &RouteId, _at: Timestamp) -> RoutewatchResult<()> {
        self.check(route)
    }

    fn forget_route(&self, route: &RouteId) -> RoutewatchResult<()> {
        self.check(route)
    }

    fn record_cycle(&self, _report: &CycleReport) -> RoutewatchResult<()> {
        self.cycles.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn record_failure(&self) -> RoutewatchResult<()> {
        Ok(())
    }
}
