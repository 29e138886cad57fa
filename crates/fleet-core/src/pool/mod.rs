//! Bounded worker pool with a drain barrier.
//!
//! A pool is built per action, receives one job per instance, and is drained
//! exactly once. `drain()` returns only after every accepted job has reached a
//! terminal state (success, failure or panic). Job failures are reported on
//! the error channel and never stop the workers.
mod job;
pub use job::{DrainReport, HandlerFn, Job, JobHandler, handler_fn};

mod state;
pub use state::{PoolError, PoolState};

use std::{
    any::Any,
    collections::VecDeque,
    pin::pin,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use fleet_observe::{ErrorChannelHandle, ErrorReport};
use tokio::{
    sync::{Notify, watch},
    task::{JoinError, JoinHandle},
    time::timeout,
};
use tracing::{debug, trace, warn};

use crate::{
    error::CoreError,
    metrics::{JobOutcome, MetricsHandle},
};

/// Worker count and idle poll period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub workers: usize,
    /// Upper bound on how long an idle worker sleeps before rechecking the
    /// queue and the pool state.
    pub poll_interval: Duration,
}

impl PoolConfig {
    pub fn new(workers: usize, poll_interval: Duration) -> Result<Self, PoolError> {
        if workers == 0 {
            return Err(PoolError::NoWorkers);
        }
        Ok(Self {
            workers,
            poll_interval,
        })
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            poll_interval: Duration::from_secs(1),
        }
    }
}

struct Shared<P> {
    action: &'static str,
    queue: Mutex<VecDeque<Job<P>>>,
    job_ready: Notify,
    idle: Notify,
    outstanding: AtomicUsize,
    enqueued: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    fatal: Mutex<Option<CoreError>>,
    state: watch::Sender<PoolState>,
    poll_interval: Duration,
    errors: ErrorChannelHandle,
    metrics: MetricsHandle,
}

impl<P: Send + 'static> Shared<P> {
    fn pop(&self) -> Option<Job<P>> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    fn current(&self) -> PoolState {
        *self.state.borrow()
    }

    async fn worker<H: JobHandler<P>>(self: Arc<Self>, id: usize, handler: Arc<H>) {
        trace!(action = self.action, worker = id, "worker started");
        loop {
            if let Some(job) = self.pop() {
                self.run(job, &handler).await;
                continue;
            }
            if self.current() == PoolState::Stopped {
                break;
            }
            // Timeout elapsing just means "look again".
            let _ = timeout(self.poll_interval, self.job_ready.notified()).await;
        }
        trace!(action = self.action, worker = id, "worker exited");
    }

    async fn run<H: JobHandler<P>>(&self, job: Job<P>, handler: &Arc<H>) {
        let instance = job.instance_name.clone();
        let started = Instant::now();
        self.metrics.record_job_started(self.action);
        debug!(action = self.action, instance = %instance, "job started");

        let h = Arc::clone(handler);
        let outcome = match tokio::spawn(async move { h.handle(job).await }).await {
            Ok(Ok(())) => {
                self.succeeded.fetch_add(1, Ordering::Relaxed);
                JobOutcome::Success
            }
            Ok(Err(e)) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                if e.is_fatal() {
                    self.retain_fatal(&instance, e);
                } else {
                    self.report(&instance, e.kind(), e.to_string());
                }
                JobOutcome::Failure
            }
            Err(join) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                self.report(&instance, "panic", describe_join_error(join));
                JobOutcome::Panicked
            }
        };

        let elapsed = started.elapsed().as_millis() as u64;
        self.metrics
            .record_job_completed(self.action, outcome, elapsed);
        debug!(
            action = self.action,
            instance = %instance,
            outcome = outcome.as_label(),
            elapsed_ms = elapsed,
            "job finished"
        );

        if self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }

    /// Keep the first fatal error for `drain()`; later ones are reported.
    fn retain_fatal(&self, instance: &str, e: CoreError) {
        let mut slot = self.fatal.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(e);
            return;
        }
        drop(slot);
        warn!(action = self.action, instance = %instance, error = %e, "further fatal job error");
        self.report(instance, e.kind(), e.to_string());
    }

    fn report(&self, instance: &str, kind: &str, message: String) {
        self.metrics.record_action_error(self.action, kind);
        self.errors
            .report(ErrorReport::new(self.action, instance, kind, message));
    }

    /// Resolves once `outstanding` reaches zero.
    async fn wait_idle(&self) {
        loop {
            let mut notified = pin!(self.idle.notified());
            notified.as_mut().enable();
            if self.outstanding.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    fn stop(&self) {
        self.state.send_replace(PoolState::Stopped);
        self.job_ready.notify_waiters();
    }
}

fn describe_join_error(err: JoinError) -> String {
    if err.is_cancelled() {
        return "job cancelled".to_string();
    }
    let payload: Box<dyn Any + Send> = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("job panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("job panicked: {s}")
    } else {
        "job panicked".to_string()
    }
}

/// Fixed-size pool of async workers consuming one shared FIFO queue.
///
/// Lifecycle: `new` → any number of `enqueue` → `spawn` → more `enqueue` →
/// `drain`. Jobs may be queued before the workers exist. A pool is not reusable
/// after `drain`.
pub struct WorkerPool<P> {
    shared: Arc<Shared<P>>,
    workers: usize,
    handles: Vec<JoinHandle<()>>,
}

impl<P: Send + 'static> WorkerPool<P> {
    pub fn new(
        action: &'static str,
        config: PoolConfig,
        errors: ErrorChannelHandle,
        metrics: MetricsHandle,
    ) -> Self {
        let (state, _) = watch::channel(PoolState::Idle);
        Self {
            shared: Arc::new(Shared {
                action,
                queue: Mutex::new(VecDeque::new()),
                job_ready: Notify::new(),
                idle: Notify::new(),
                outstanding: AtomicUsize::new(0),
                enqueued: AtomicUsize::new(0),
                succeeded: AtomicUsize::new(0),
                failed: AtomicUsize::new(0),
                fatal: Mutex::new(None),
                state,
                poll_interval: config.poll_interval,
                errors,
                metrics,
            }),
            workers: config.workers.max(1),
            handles: Vec::new(),
        }
    }

    pub fn state(&self) -> PoolState {
        self.shared.current()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<PoolState> {
        self.shared.state.subscribe()
    }

    /// Jobs accepted but not yet finished.
    pub fn outstanding(&self) -> usize {
        self.shared.outstanding.load(Ordering::Acquire)
    }

    /// Queue a job. Refused once `drain()` has begun.
    pub fn enqueue(&self, job: Job<P>) -> Result<(), PoolError> {
        {
            let mut queue = self
                .shared
                .queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let state = self.shared.current();
            if !state.accepts_jobs() {
                return Err(PoolError::Closed(state));
            }
            // Counted before it becomes visible to workers, so the barrier can
            // never observe zero while this job is pending.
            self.shared.outstanding.fetch_add(1, Ordering::AcqRel);
            self.shared.enqueued.fetch_add(1, Ordering::Relaxed);
            queue.push_back(job);
        }
        self.shared.job_ready.notify_one();
        Ok(())
    }

    /// Start the workers. Must be called from inside a tokio runtime.
    pub fn spawn<H: JobHandler<P>>(&mut self, handler: Arc<H>) -> Result<(), PoolError> {
        let state = self.state();
        if state != PoolState::Idle {
            return Err(PoolError::AlreadyStarted(state));
        }
        self.shared.state.send_replace(PoolState::Running);
        debug!(action = self.shared.action, workers = self.workers, "pool started");

        self.handles = (0..self.workers)
            .map(|id| {
                let shared = Arc::clone(&self.shared);
                tokio::spawn(shared.worker(id, Arc::clone(&handler)))
            })
            .collect();
        Ok(())
    }

    /// Close the pool, wait for every accepted job, then stop the workers.
    pub async fn drain(&mut self) -> Result<DrainReport, PoolError> {
        match self.state() {
            PoolState::Running => {}
            PoolState::Idle => {
                let pending = self.outstanding();
                if pending > 0 {
                    return Err(PoolError::NotStarted(pending));
                }
                self.shared.stop();
                return Ok(DrainReport::default());
            }
            other => return Err(PoolError::Closed(other)),
        }

        {
            // Same lock as `enqueue`, so no job slips in after the state flips.
            let _queue = self
                .shared
                .queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            self.shared.state.send_replace(PoolState::Draining);
        }

        self.shared.wait_idle().await;
        self.shared.stop();

        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(action = self.shared.action, error = %e, "worker task ended abnormally");
            }
        }

        let report = DrainReport {
            enqueued: self.shared.enqueued.load(Ordering::Relaxed),
            succeeded: self.shared.succeeded.load(Ordering::Relaxed),
            failed: self.shared.failed.load(Ordering::Relaxed),
            fatal: self
                .shared
                .fatal
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        };
        debug!(
            action = self.shared.action,
            enqueued = report.enqueued,
            succeeded = report.succeeded,
            failed = report.failed,
            "pool drained"
        );
        Ok(report)
    }
}

impl<P> Drop for WorkerPool<P> {
    fn drop(&mut self) {
        self.shared.state.send_replace(PoolState::Stopped);
        self.shared
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.shared.job_ready.notify_waiters();
    }
}

#[cfg(test)]
mod tests;
