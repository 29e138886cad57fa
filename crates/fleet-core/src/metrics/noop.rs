use crate::metrics::backend::{JobOutcome, MetricsBackend};

#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl MetricsBackend for NoOpMetrics {
    #[inline(always)]
    fn record_job_started(&self, _: &str) {}

    #[inline(always)]
    fn record_job_completed(&self, _: &str, _: JobOutcome, _: u64) {}

    #[inline(always)]
    fn record_action_error(&self, _: &str, _: &str) {}
}
