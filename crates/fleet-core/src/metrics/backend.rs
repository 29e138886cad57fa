use std::sync::Arc;

/// Terminal state of one pooled job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Success,
    /// The handler returned an error.
    Failure,
    /// The handler panicked; the pool survived.
    Panicked,
}

impl JobOutcome {
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            JobOutcome::Success => "success",
            JobOutcome::Failure => "failure",
            JobOutcome::Panicked => "panicked",
        }
    }
}

/// Metrics sink. `action` is the lowercase action name (`configure`, `stop`, ...).
pub trait MetricsBackend: Send + Sync + 'static {
    /// A worker picked up a job.
    fn record_job_started(&self, action: &str);

    /// A job finished, whatever the outcome.
    fn record_job_completed(&self, action: &str, outcome: JobOutcome, duration_ms: u64);

    /// A non-fatal error was reported to the operator.
    fn record_action_error(&self, action: &str, error_kind: &str);
}

pub type MetricsHandle = Arc<dyn MetricsBackend>;
