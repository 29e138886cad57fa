//! Operator-visible error channel.
//!
//! Per-instance failures that must not abort an action (a minion that failed
//! to configure, a container that refused to delete) are sent here instead of
//! being returned. The channel decides how the operator sees them.
use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use serde::Serialize;
use tracing::error;

/// One non-fatal failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    /// Action that was running (`configure`, `stop`, ...).
    pub action: String,
    /// Instance name, or the image name for image-level steps.
    pub instance: String,
    /// Short stable error category (e.g. `runtime-protocol`).
    pub kind: String,
    pub message: String,
}

impl ErrorReport {
    pub fn new(
        action: impl Into<String>,
        instance: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            instance: instance.into(),
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {} [{}]",
            self.action, self.instance, self.message, self.kind
        )
    }
}

/// Sink for non-fatal failures.
///
/// Called concurrently from pool workers; implementations must not block.
pub trait ErrorChannel: Send + Sync + 'static {
    fn report(&self, report: ErrorReport);
}

/// Shared handle to an error channel.
pub type ErrorChannelHandle = Arc<dyn ErrorChannel>;

/// Channel that only logs at `ERROR` with structured fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorChannel;

impl ErrorChannel for TracingErrorChannel {
    fn report(&self, report: ErrorReport) {
        error!(
            action = %report.action,
            instance = %report.instance,
            kind = %report.kind,
            "{}",
            report.message
        );
    }
}

/// Default channel handle.
pub fn tracing_channel() -> ErrorChannelHandle {
    Arc::new(TracingErrorChannel)
}

/// Channel that logs and also keeps every report for a later summary.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    reports: Mutex<Vec<ErrorReport>>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far.
    pub fn reports(&self) -> Vec<ErrorReport> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reports for a single instance, in arrival order.
    pub fn for_instance(&self, instance: &str) -> Vec<ErrorReport> {
        self.reports()
            .into_iter()
            .filter(|r| r.instance == instance)
            .collect()
    }
}

impl ErrorChannel for ErrorCollector {
    fn report(&self, report: ErrorReport) {
        TracingErrorChannel.report(report.clone());
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report);
    }
}
