use std::{future::Future, sync::Arc};

use async_trait::async_trait;
use fleet_model::InstanceNumber;

use crate::error::{CoreError, CoreResult};

/// Unit of pooled work for one instance.
///
/// Jobs are independent: a handler must not rely on the order in which
/// sibling jobs run or on state they mutate.
#[derive(Debug, Clone)]
pub struct Job<P> {
    pub instance_number: InstanceNumber,
    pub instance_name: String,
    pub payload: P,
}

impl<P> Job<P> {
    pub fn new(instance_number: InstanceNumber, instance_name: impl Into<String>, payload: P) -> Self {
        Self {
            instance_number,
            instance_name: instance_name.into(),
            payload,
        }
    }
}

/// Per-job work executed by pool workers.
#[async_trait]
pub trait JobHandler<P>: Send + Sync + 'static
where
    P: Send + 'static,
{
    async fn handle(&self, job: Job<P>) -> CoreResult<()>;
}

/// [`JobHandler`] backed by an async closure.
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<P, F, Fut> JobHandler<P> for HandlerFn<F>
where
    P: Send + 'static,
    F: Fn(Job<P>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CoreResult<()>> + Send + 'static,
{
    async fn handle(&self, job: Job<P>) -> CoreResult<()> {
        (self.f)(job).await
    }
}

/// Wrap an async closure as a shareable handler.
pub fn handler_fn<P, F, Fut>(f: F) -> Arc<HandlerFn<F>>
where
    P: Send + 'static,
    F: Fn(Job<P>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CoreResult<()>> + Send + 'static,
{
    Arc::new(HandlerFn { f })
}

/// Counts returned by `drain()`.
///
/// `succeeded + failed == enqueued` always holds once the barrier passed.
#[derive(Debug, Default)]
pub struct DrainReport {
    pub enqueued: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// First fatal error raised by a job, if any.
    pub fatal: Option<CoreError>,
}

impl DrainReport {
    /// Turn a retained fatal job error back into an action failure.
    pub fn into_result(mut self) -> CoreResult<DrainReport> {
        if let Some(e) = self.fatal.take() {
            return Err(e);
        }
        Ok(self)
    }
}
