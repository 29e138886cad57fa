//! Pooled per-minion work.
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::{
    agent::ConfigAgent,
    error::CoreResult,
    hosts::{HostEntries, HostsTableReconciler},
    manifest::Manifest,
    pool::{Job, JobHandler},
    runtime::ContainerRuntime,
};

/// Configures one minion against an already-configured master.
///
/// Payload is the minion's current address.
pub(crate) struct MinionConfigurator<R, A> {
    pub runtime: Arc<R>,
    pub agent: Arc<A>,
    pub hosts: HostsTableReconciler,
    pub master_name: String,
    /// The master's entry, written into every minion's hosts table.
    pub master_entry: HostEntries,
    pub fingerprint: String,
}

#[async_trait]
impl<R, A> JobHandler<String> for MinionConfigurator<R, A>
where
    R: ContainerRuntime,
    A: ConfigAgent,
{
    async fn handle(&self, job: Job<String>) -> CoreResult<()> {
        info!(instance = %job.instance_name, "configuring minion {}", job.instance_number);
        let address = job.payload.as_str();

        let path = self.runtime.get_hosts_table_path(&job.instance_name).await?;
        self.hosts.reconcile(&path, &self.master_entry).await?;

        Manifest::minion_config(&self.master_name)
            .push(self.agent.as_ref(), address)
            .await?;
        Manifest::minion_start(&self.master_name, &self.fingerprint)
            .push(self.agent.as_ref(), address)
            .await?;

        debug!(instance = %job.instance_name, address, "minion configured");
        Ok(())
    }
}

/// Stops one minion if it is running.
pub(crate) struct MinionStopper<R> {
    pub runtime: Arc<R>,
}

#[async_trait]
impl<R: ContainerRuntime> JobHandler<()> for MinionStopper<R> {
    async fn handle(&self, job: Job<()>) -> CoreResult<()> {
        if !self.runtime.is_running(&job.instance_name).await? {
            debug!(instance = %job.instance_name, "already stopped");
            return Ok(());
        }
        info!(instance = %job.instance_name, "stopping minion {}", job.instance_number);
        self.runtime.stop_container(&job.instance_name).await
    }
}
