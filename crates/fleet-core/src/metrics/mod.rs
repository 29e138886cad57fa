//! Metrics abstraction for pooled jobs and reported action errors.
//!
//! Backends (prometheus, ...) implement [`MetricsBackend`] and are handed to the
//! orchestrator, which passes them on to every worker pool it spawns.
mod backend;
pub use backend::{JobOutcome, MetricsBackend, MetricsHandle};

mod noop;
pub use noop::NoOpMetrics;

use std::sync::Arc;

#[inline]
pub fn noop_metrics() -> MetricsHandle {
    Arc::new(NoOpMetrics)
}
