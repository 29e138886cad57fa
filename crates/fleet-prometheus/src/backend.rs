use std::sync::Arc;

use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
    proto::MetricFamily,
};

use fleet_core::{JobOutcome, MetricsBackend};

/// Prometheus backend for pooled jobs and reported action errors.
///
/// ## Metrics
/// - `fleet_jobs_started_total{action}`
/// - `fleet_jobs_completed_total{action, outcome}`
/// - `fleet_job_duration_seconds{action}`
/// - `fleet_action_errors_total{action, error_kind}`
///
/// Labels are bounded: `action` is one of the six lifecycle actions,
/// `outcome` is `success|failure|panicked`, `error_kind` is a
/// `CoreError::kind()` label or `panic`.
#[derive(Clone)]
pub struct PrometheusMetrics {
    jobs_started: CounterVec,
    jobs_completed: CounterVec,
    job_duration: HistogramVec,
    action_errors: CounterVec,
    registry: Arc<Registry>,
}

impl PrometheusMetrics {
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let jobs_started = CounterVec::new(
            Opts::new("jobs_started_total", "Pooled per-instance jobs picked up by a worker")
                .namespace("fleet"),
            &["action"],
        )?;
        registry.register(Box::new(jobs_started.clone()))?;

        let jobs_completed = CounterVec::new(
            Opts::new("jobs_completed_total", "Pooled jobs that reached a terminal state")
                .namespace("fleet"),
            &["action", "outcome"],
        )?;
        registry.register(Box::new(jobs_completed.clone()))?;

        // Minion configuration includes agent runs that take tens of seconds.
        let job_duration = HistogramVec::new(
            HistogramOpts::new("job_duration_seconds", "Pooled job duration in seconds")
                .namespace("fleet")
                .buckets(vec![0.1, 0.5, 1.0, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0]),
            &["action"],
        )?;
        registry.register(Box::new(job_duration.clone()))?;

        let action_errors = CounterVec::new(
            Opts::new("action_errors_total", "Non-fatal errors reported to the operator")
                .namespace("fleet"),
            &["action", "error_kind"],
        )?;
        registry.register(Box::new(action_errors.clone()))?;

        Ok(Self {
            jobs_started,
            jobs_completed,
            job_duration,
            action_errors,
            registry,
        })
    }

    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Text exposition of everything in the registry.
    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_job_started(&self, action: &str) {
        self.jobs_started.with_label_values(&[action]).inc();
    }

    fn record_job_completed(&self, action: &str, outcome: JobOutcome, duration_ms: u64) {
        self.jobs_completed
            .with_label_values(&[action, outcome.as_label()])
            .inc();
        self.job_duration
            .with_label_values(&[action])
            .observe(duration_ms as f64 / 1000.0);
    }

    fn record_action_error(&self, action: &str, error_kind: &str) {
        self.action_errors
            .with_label_values(&[action, error_kind])
            .inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family<'a>(families: &'a [MetricFamily], name: &str) -> &'a MetricFamily {
        families
            .iter()
            .find(|f| f.name() == name)
            .unwrap_or_else(|| panic!("{name} not registered"))
    }

    #[test]
    fn started_jobs_are_counted_per_action() {
        let m = PrometheusMetrics::new().unwrap();
        m.record_job_started("configure");
        m.record_job_started("configure");
        m.record_job_started("stop");

        let families = m.gather();
        assert_eq!(family(&families, "fleet_jobs_started_total").get_metric().len(), 2);
    }

    #[test]
    fn completion_feeds_counter_and_histogram() {
        let m = PrometheusMetrics::new().unwrap();
        m.record_job_completed("configure", JobOutcome::Success, 1_500);
        m.record_job_completed("configure", JobOutcome::Panicked, 10);

        let families = m.gather();
        assert_eq!(family(&families, "fleet_jobs_completed_total").get_metric().len(), 2);
        assert_eq!(family(&families, "fleet_job_duration_seconds").get_metric().len(), 1);
    }

    #[test]
    fn errors_are_labelled_by_kind() {
        let m = PrometheusMetrics::new().unwrap();
        m.record_action_error("delete", "runtime-protocol");
        m.record_action_error("configure", "resource-state");

        let text = m.encode_text().unwrap();
        assert!(text.contains(
            r#"fleet_action_errors_total{action="delete",error_kind="runtime-protocol"} 1"#
        ));
    }

    #[test]
    fn registering_twice_on_one_registry_fails() {
        let registry = Arc::new(Registry::new());
        PrometheusMetrics::new_with_registry(registry.clone()).unwrap();
        assert!(PrometheusMetrics::new_with_registry(registry).is_err());
    }
}
