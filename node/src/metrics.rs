//! Prometheus metrics sink
//!
//! Owns its registry instead of registering into process globals, so several
//! sinks can live side by side (one per node, one per test).

use prometheus::{Encoder, Gauge, GaugeVec, IntCounter, IntGauge, Opts, Registry, TextEncoder};
use routewatch_core::{
    CycleReport, MetricsConfig, MetricsSink, RouteId, RoutewatchError, RoutewatchResult,
    Timestamp,
};

const ROUTE_LABEL: &str = "route";

fn metrics_error(err: prometheus::Error) -> RoutewatchError {
    RoutewatchError::Metrics(err.to_string())
}

/// Metrics sink backed by a private Prometheus registry
pub struct PrometheusSink {
    registry: Registry,
    changes: Gauge,
    routes: GaugeVec,
    last_change: GaugeVec,
    last_seen: GaugeVec,
    current: IntGauge,
    cycles: IntCounter,
    failures: IntCounter,
    duration: Gauge,
}

impl PrometheusSink {
    pub fn new(config: &MetricsConfig) -> RoutewatchResult<Self> {
        let opts = |name: &str, help: &str| {
            let opts = Opts::new(name, help);
            match &config.namespace {
                Some(namespace) => opts.namespace(namespace.clone()),
                None => opts,
            }
        };

        let changes = Gauge::with_opts(opts(
            "ip_route_changes",
            "Indicates if there was a change in IP routes (1 for change, 0 for no change)",
        ))
        .map_err(metrics_error)?;
        let routes = GaugeVec::new(
            opts("ip_routes_list", "Current IP routes (1 present, 0 removed)"),
            &[ROUTE_LABEL],
        )
        .map_err(metrics_error)?;
        let last_change = GaugeVec::new(
            opts(
                "ip_route_last_change_timestamp",
                "Timestamp of the last change for each IP route",
            ),
            &[ROUTE_LABEL],
        )
        .map_err(metrics_error)?;
        let last_seen = GaugeVec::new(
            opts(
                "ip_route_last_seen_timestamp",
                "Timestamp of the last cycle that observed each IP route",
            ),
            &[ROUTE_LABEL],
        )
        .map_err(metrics_error)?;
        let current = IntGauge::with_opts(opts(
            "ip_routes_current",
            "Number of routes in the latest successful snapshot",
        ))
        .map_err(metrics_error)?;
        let cycles = IntCounter::with_opts(opts(
            "ip_route_collect_cycles_total",
            "Completed collection cycles",
        ))
        .map_err(metrics_error)?;
        let failures = IntCounter::with_opts(opts(
            "ip_route_collect_failures_total",
            "Collection cycles aborted because the routing table could not be fetched",
        ))
        .map_err(metrics_error)?;
        let duration = Gauge::with_opts(opts(
            "ip_route_collect_duration_seconds",
            "Duration of the latest completed collection cycle",
        ))
        .map_err(metrics_error)?;

        let registry = Registry::new();
        registry.register(Box::new(changes.clone())).map_err(metrics_error)?;
        registry.register(Box::new(routes.clone())).map_err(metrics_error)?;
        registry.register(Box::new(last_change.clone())).map_err(metrics_error)?;
        registry.register(Box::new(last_seen.clone())).map_err(metrics_error)?;
        registry.register(Box::new(current.clone())).map_err(metrics_error)?;
        registry.register(Box::new(cycles.clone())).map_err(metrics_error)?;
        registry.register(Box::new(failures.clone())).map_err(metrics_error)?;
        registry.register(Box::new(duration.clone())).map_err(metrics_error)?;

        Ok(Self {
            registry,
            changes,
            routes,
            last_change,
            last_seen,
            current,
            cycles,
            failures,
            duration,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Content type of [`render`](Self::render) output
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }

    /// Current contents in the text exposition format
    pub fn render(&self) -> RoutewatchResult<String> {
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buffer)
            .map_err(metrics_error)?;
        String::from_utf8(buffer).map_err(|e| RoutewatchError::Metrics(e.to_string()))
    }

    /// Read back one sample; `route` selects a labelled series
    #[cfg(test)]
    pub(crate) fn sample(&self, name: &str, route: Option<&str>) -> Option<f64> {
        let families = self.registry.gather();
        let family = families.iter().find(|family| family.get_name() == name)?;
        let metric = family.get_metric().iter().find(|metric| match route {
            Some(route) => metric
                .get_label()
                .iter()
                .any(|label| label.get_name() == ROUTE_LABEL && label.get_value() == route),
            None => true,
        })?;
        if family.get_field_type() == prometheus::proto::MetricType::COUNTER {
            Some(metric.get_counter().get_value())
        } else {
            Some(metric.get_gauge().get_value())
        }
    }
}

impl MetricsSink for PrometheusSink {
    fn set_changed(&self, changed: bool) -> RoutewatchResult<()> {
        self.changes.set(if changed { 1.0 } else { 0.0 });
        Ok(())
    }

    fn set_route_present(&self, route: &RouteId, present: bool) -> RoutewatchResult<()> {
        self.routes
            .get_metric_with_label_values(&[route.as_str()])
            .map_err(metrics_error)?
            .set(if present { 1.0 } else { 0.0 });
        Ok(())
    }

    fn set_route_last_change(&self, route: &RouteId, at: Timestamp) -> RoutewatchResult<()> {
        self.last_change
            .get_metric_with_label_values(&[route.as_str()])
            .map_err(metrics_error)?
            .set(at.as_secs() as f64);
        Ok(())
    }

    fn set_route_last_seen(&self, route: &RouteId, at: Timestamp) -> RoutewatchResult<()> {
        self.last_seen
            .get_metric_with_label_values(&[route.as_str()])
            .map_err(metrics_error)?
            .set(at.as_secs() as f64);
        Ok(())
    }

    fn forget_route(&self, route: &RouteId) -> RoutewatchResult<()> {
        // a series that was never written is already gone
        for vec in [&self.routes, &self.last_change, &self.last_seen] {
            let _ = vec.remove_label_values(&[route.as_str()]);
        }
        Ok(())
    }

    fn record_cycle(&self, report: &CycleReport) -> RoutewatchResult<()> {
        self.cycles.inc();
        self.current.set(report.total as i64);
        self.duration.set(report.duration_ms as f64 / 1000.0);
        Ok(())
    }

    fn record_failure(&self) -> RoutewatchResult<()> {
        self.failures.inc();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(s: &str) -> RouteId {
        RouteId::parse(s).unwrap()
    }

    #[test]
    fn test_exposition_metric_names() {
        let sink = PrometheusSink::new(&MetricsConfig::default()).unwrap();
        sink.set_changed(true).unwrap();
        sink.set_route_present(&route("10.0.0.0/24"), true).unwrap();
        sink.set_route_last_change(&route("10.0.0.0/24"), Timestamp::from_secs(1_700_000_000))
            .unwrap();

        let text = sink.render().unwrap();
        assert!(text.contains("ip_route_changes 1"));
        assert!(text.contains(r#"ip_routes_list{route="10.0.0.0/24"} 1"#));
        assert!(text.contains(r#"ip_route_last_change_timestamp{route="10.0.0.0/24"} 1700000000"#));
    }

    #[test]
    fn test_namespace_prefix() {
        let config = MetricsConfig {
            namespace: Some("edge".into()),
        };
        let sink = PrometheusSink::new(&config).unwrap();
        sink.set_changed(false).unwrap();

        let text = sink.render().unwrap();
        assert!(text.contains("edge_ip_route_changes 0"));
    }

    #[test]
    fn test_independent_registries() {
        let a = PrometheusSink::new(&MetricsConfig::default()).unwrap();
        let b = PrometheusSink::new(&MetricsConfig::default()).unwrap();
        a.set_route_present(&route("a"), true).unwrap();

        assert_eq!(a.sample("ip_routes_list", Some("a")), Some(1.0));
        assert_eq!(b.sample("ip_routes_list", Some("a")), None);
    }

    #[test]
    fn test_removed_route_reports_zero() {
        let sink = PrometheusSink::new(&MetricsConfig::default()).unwrap();
        let r = route("10.0.1.0/24");
        sink.set_route_present(&r, true).unwrap();
        sink.set_route_present(&r, false).unwrap();
        assert_eq!(sink.sample("ip_routes_list", Some("10.0.1.0/24")), Some(0.0));
    }

    #[test]
    fn test_forget_route_drops_all_series() {
        let sink = PrometheusSink::new(&MetricsConfig::default()).unwrap();
        let r = route("10.0.1.0/24");
        sink.set_route_present(&r, false).unwrap();
        sink.set_route_last_change(&r, Timestamp::from_secs(5)).unwrap();

        sink.forget_route(&r).unwrap();
        // forgetting twice is harmless
        sink.forget_route(&r).unwrap();

        assert_eq!(sink.sample("ip_routes_list", Some("10.0.1.0/24")), None);
        assert_eq!(sink.sample("ip_route_last_change_timestamp", Some("10.0.1.0/24")), None);
        assert!(!sink.render().unwrap().contains("10.0.1.0/24"));
    }

    #[test]
    fn test_cycle_bookkeeping() {
        let sink = PrometheusSink::new(&MetricsConfig::default()).unwrap();
        let report = CycleReport {
            started_at: Timestamp::from_secs(1),
            duration_ms: 250,
            total: 12,
            added: 12,
            removed: 0,
            purged: 0,
            sink_errors: 0,
        };
        sink.record_cycle(&report).unwrap();
        sink.record_cycle(&report).unwrap();
        sink.record_failure().unwrap();

        // counters and gauges both read back through the gathered families
        assert_eq!(sink.sample("ip_route_collect_cycles_total", None), Some(2.0));
        assert_eq!(sink.sample("ip_route_collect_failures_total", None), Some(1.0));
        assert_eq!(sink.sample("ip_routes_current", None), Some(12.0));
        assert_eq!(sink.sample("ip_route_collect_duration_seconds", None), Some(0.25));
    }

    #[test]
    fn test_content_type() {
        let sink = PrometheusSink::new(&MetricsConfig::default()).unwrap();
        assert!(sink.content_type().starts_with("text/plain"));
    }
}
