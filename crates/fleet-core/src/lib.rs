pub mod agent;
pub mod config;
pub mod error;
pub mod hosts;
pub mod manifest;
pub mod metrics;
pub mod orchestrator;
pub mod pool;
pub mod runtime;

#[cfg(test)]
pub(crate) mod testing;

pub use metrics::{JobOutcome, MetricsBackend, MetricsHandle, NoOpMetrics, noop_metrics};

pub mod prelude {
    pub use crate::agent::ConfigAgent;
    pub use crate::config::ClusterConfig;
    pub use crate::error::{CoreError, CoreResult, Severity};
    pub use crate::hosts::{HOSTS_SENTINEL, HostEntries, HostsTableReconciler};
    pub use crate::manifest::Manifest;
    pub use crate::orchestrator::{Action, ClusterOrchestrator, ClusterState, Scope};
    pub use crate::pool::{DrainReport, Job, JobHandler, PoolConfig, PoolError, PoolState, WorkerPool};
    pub use crate::runtime::{ContainerRuntime, ImageRecipe};
}
