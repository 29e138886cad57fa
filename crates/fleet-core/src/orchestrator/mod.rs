//! Cluster lifecycle orchestration.
//!
//! The orchestrator owns [`ClusterState`] and sequences the six actions over
//! the master and the minion set. Non-pooled steps run inline and an error
//! there aborts the action. Pooled steps (minion configure, minion stop) go
//! through a fresh [`WorkerPool`] per action; their per-instance failures are
//! reported on the error channel and the action carries on.
mod action;
pub use action::{Action, Scope};

mod jobs;
use jobs::{MinionConfigurator, MinionStopper};

mod state;
pub use state::ClusterState;

use std::{
    collections::{BTreeSet, HashSet},
    sync::Arc,
};

use fleet_model::{InstanceRef, ModelError, Tag, TagDistribution, naming};
use fleet_observe::{ErrorChannelHandle, ErrorReport, tracing_channel};
use tracing::{debug, info, warn};

use crate::{
    agent::ConfigAgent,
    config::ClusterConfig,
    error::{CoreError, CoreResult},
    hosts::{HostEntries, HostsTableReconciler},
    manifest::Manifest,
    metrics::{MetricsHandle, noop_metrics},
    pool::{Job, WorkerPool},
    runtime::{ContainerRuntime, ImageRecipe},
};

pub struct ClusterOrchestrator<R, A> {
    config: ClusterConfig,
    fleet: TagDistribution,
    runtime: Arc<R>,
    agent: Arc<A>,
    recipe: Arc<dyn ImageRecipe>,
    hosts: HostsTableReconciler,
    errors: ErrorChannelHandle,
    metrics: MetricsHandle,
    state: ClusterState,
}

impl<R, A> ClusterOrchestrator<R, A>
where
    R: ContainerRuntime,
    A: ConfigAgent,
{
    /// Resolve every instance of `fleet` plus the master up front.
    pub fn new(
        config: ClusterConfig,
        fleet: TagDistribution,
        master_tag: Tag,
        runtime: Arc<R>,
        agent: Arc<A>,
        recipe: Arc<dyn ImageRecipe>,
    ) -> CoreResult<Self> {
        config.validate()?;

        let master = InstanceRef::master(&config.master_prefix, &master_tag);
        let minions = (1..=fleet.total_count())
            .map(|n| InstanceRef::minion(&config.minion_prefix, n, &fleet))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(master = %master.name(), minions = minions.len(), "cluster resolved");

        Ok(Self {
            hosts: HostsTableReconciler::new(config.hosts_sentinel.clone()),
            config,
            fleet,
            runtime,
            agent,
            recipe,
            errors: tracing_channel(),
            metrics: noop_metrics(),
            state: ClusterState::new(master, minions),
        })
    }

    pub fn with_errors(mut self, errors: ErrorChannelHandle) -> Self {
        self.errors = errors;
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn state(&self) -> &ClusterState {
        &self.state
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Run `actions` in their fixed order. The first action error aborts the rest.
    pub async fn run(
        &mut self,
        actions: impl IntoIterator<Item = Action>,
        scope: Scope,
        force: bool,
    ) -> CoreResult<()> {
        let ordered: BTreeSet<Action> = actions.into_iter().collect();
        for action in ordered {
            info!(action = %action, scope = %scope, "running action");
            match action {
                Action::Create => self.create(scope, force).await?,
                Action::Start => self.start(scope).await?,
                Action::Configure => self.configure(scope).await?,
                Action::Stop => self.stop(scope).await?,
                Action::Delete => self.delete(scope).await?,
                Action::Purge => self.purge(scope).await?,
            }
        }
        Ok(())
    }

    /// Minions covered by `scope`. An out-of-range instance is fatal.
    pub fn targets(&self, scope: Scope) -> CoreResult<Vec<InstanceRef>> {
        match scope {
            Scope::Cluster => Ok(self.state.minions.clone()),
            Scope::Instance(n) => self
                .state
                .minion(n)
                .cloned()
                .map(|m| vec![m])
                .ok_or_else(|| {
                    ModelError::Naming {
                        instance: n,
                        total: self.fleet.total_count(),
                    }
                    .into()
                }),
        }
    }

    /// Build missing images, then create missing containers.
    ///
    /// With `force`, targeted containers are removed first and their images
    /// rebuilt even if present.
    pub async fn create(&mut self, scope: Scope, force: bool) -> CoreResult<()> {
        let targets = self.targets(scope)?;
        if force {
            info!(scope = %scope, "removing existing containers before create");
            self.remove_containers(Action::Create, scope, &targets, true)
                .await;
        }

        let target_images: HashSet<String> = targets
            .iter()
            .map(|m| naming::image_name(&self.config.image_repo, m.tag()))
            .collect();
        let master_tag = self.state.master.tag().clone();
        let tags = std::iter::once(&master_tag).chain(targets.iter().map(InstanceRef::tag));

        for (image, tag) in distinct_images(&self.config.image_repo, tags) {
            let rebuild = force && (scope.is_cluster() || target_images.contains(&image));
            let image_tag = naming::image_tag(tag);
            if !rebuild && self.runtime.image_exists(&self.config.image_repo, &image_tag).await? {
                debug!(image = %image, "image present");
                continue;
            }
            info!(image = %image, "building image");
            let spec = self.recipe.render(tag);
            self.runtime
                .build_image(&spec, &self.config.image_repo, &image_tag)
                .await?;
        }

        let master = &self.state.master;
        if !self.runtime.container_exists(master.name(), true).await? {
            info!(instance = %master.name(), "creating master container");
            let image = naming::image_name(&self.config.image_repo, master.tag());
            self.runtime.create_container(&image, master.name()).await?;
        }

        // Forced targets were removed above, so existence is the only check.
        for minion in &targets {
            if self.runtime.container_exists(minion.name(), true).await? {
                debug!(instance = %minion.name(), "container present");
                continue;
            }
            info!(instance = %minion.name(), "creating minion container");
            let image = naming::image_name(&self.config.image_repo, minion.tag());
            self.runtime.create_container(&image, minion.name()).await?;
        }
        Ok(())
    }

    /// Start the master if needed, then restart every targeted minion so that
    /// each one comes up with a fresh address.
    pub async fn start(&mut self, scope: Scope) -> CoreResult<()> {
        let targets = self.targets(scope)?;

        let master = self.state.master.name();
        if !self.runtime.is_running(master).await? {
            info!(instance = %master, "starting master container");
            self.runtime.start_container(master).await?;
        }

        for minion in &targets {
            info!(instance = %minion.name(), "starting minion container");
            if let Err(e) = self.restart(minion.name()).await {
                self.report(Action::Start, minion.name(), &e);
            }
        }
        Ok(())
    }

    async fn restart(&self, name: &str) -> CoreResult<()> {
        if self.runtime.is_running(name).await? {
            self.runtime.stop_container(name).await?;
        }
        self.runtime.start_container(name).await
    }

    /// Master first, fingerprint next, minions in the pool, master hosts last.
    pub async fn configure(&mut self, scope: Scope) -> CoreResult<()> {
        let targets = self.targets(scope)?;
        let fingerprint = self.configure_master().await?;
        let master_name = self.state.master.name().to_string();
        let master_address = self
            .state
            .master_address
            .clone()
            .ok_or_else(|| CoreError::ResourceState(format!("{master_name} has no address")))?;

        self.collect_addresses().await;

        let handler = Arc::new(MinionConfigurator {
            runtime: Arc::clone(&self.runtime),
            agent: Arc::clone(&self.agent),
            hosts: self.hosts.clone(),
            master_entry: HostEntries::from([(master_name.clone(), master_address)]),
            master_name: master_name.clone(),
            fingerprint,
        });
        let mut pool = WorkerPool::new(
            Action::Configure.as_str(),
            self.config.pool_config(),
            Arc::clone(&self.errors),
            Arc::clone(&self.metrics),
        );
        pool.spawn(handler)?;

        for minion in &targets {
            let Some(address) = self.state.ip_table.get(minion.name()) else {
                // Already reported by the address sweep.
                warn!(instance = %minion.name(), "no address, not configuring");
                continue;
            };
            let number = minion.role().number().unwrap_or_default();
            pool.enqueue(Job::new(number, minion.name(), address.clone()))?;
        }

        let report = pool.drain().await?.into_result()?;
        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            "minion configuration finished"
        );

        info!(instance = %master_name, "updating master hosts table");
        let path = self.runtime.get_hosts_table_path(&master_name).await?;
        self.hosts.reconcile(&path, &self.state.ip_table).await
    }

    /// Push master manifests, wait for key generation, read the fingerprint.
    async fn configure_master(&mut self) -> CoreResult<String> {
        let name = self.state.master.name().to_string();
        let address = self.runtime.get_address(&name).await?;
        self.state.master_address = Some(address.clone());
        info!(instance = %name, address = %address, "configuring master");

        Manifest::master_config()
            .push(self.agent.as_ref(), &address)
            .await?;
        Manifest::master_start()
            .push(self.agent.as_ref(), &address)
            .await?;

        tokio::time::sleep(self.config.settle_delay()).await;

        let fingerprint = self
            .agent
            .get_fact(&address, &self.config.fingerprint_fact)
            .await?
            .trim()
            .to_string();
        if fingerprint.is_empty() {
            return Err(CoreError::ResourceState(format!(
                "{name} reported an empty {}",
                self.config.fingerprint_fact
            )));
        }
        debug!(instance = %name, fingerprint = %fingerprint, "master fingerprint");
        Ok(self
            .state
            .master_fingerprint
            .get_or_insert(fingerprint)
            .clone())
    }

    /// Record the address of every minion in the fleet, not just the targets.
    async fn collect_addresses(&mut self) {
        self.state.ip_table.clear();
        let names: Vec<String> = self
            .state
            .minions
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        for name in names {
            match self.runtime.get_address(&name).await {
                Ok(address) => {
                    debug!(instance = %name, address = %address, "minion address");
                    self.state.ip_table.insert(name, address);
                }
                Err(e) => self.report(Action::Configure, &name, &e),
            }
        }
    }

    /// Stop the master (always), then the targeted minions in the pool.
    pub async fn stop(&mut self, scope: Scope) -> CoreResult<()> {
        let targets = self.targets(scope)?;

        let master = self.state.master.name();
        info!(instance = %master, "stopping master container");
        if let Err(e) = self.stop_if_running(master).await {
            self.report(Action::Stop, master, &e);
        }

        let mut pool = WorkerPool::new(
            Action::Stop.as_str(),
            self.config.pool_config(),
            Arc::clone(&self.errors),
            Arc::clone(&self.metrics),
        );
        pool.spawn(Arc::new(MinionStopper {
            runtime: Arc::clone(&self.runtime),
        }))?;
        for minion in &targets {
            let number = minion.role().number().unwrap_or_default();
            pool.enqueue(Job::new(number, minion.name(), ()))?;
        }
        let report = pool.drain().await?.into_result()?;
        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            "minions stopped"
        );
        Ok(())
    }

    async fn stop_if_running(&self, name: &str) -> CoreResult<()> {
        if self.runtime.is_running(name).await? {
            self.runtime.stop_container(name).await?;
        }
        Ok(())
    }

    /// Delete targeted minion containers, and the master on a cluster scope.
    /// Failures are reported per instance.
    pub async fn delete(&mut self, scope: Scope) -> CoreResult<()> {
        let targets = self.targets(scope)?;
        self.remove_containers(Action::Delete, scope, &targets, false)
            .await;
        Ok(())
    }

    async fn remove_containers(
        &self,
        action: Action,
        scope: Scope,
        targets: &[InstanceRef],
        stop_first: bool,
    ) {
        for minion in targets {
            if let Err(e) = self.remove_container(minion.name(), stop_first).await {
                self.report(action, minion.name(), &e);
            }
        }
        if scope.is_cluster() {
            let master = self.state.master.name();
            if let Err(e) = self.remove_container(master, stop_first).await {
                self.report(action, master, &e);
            }
        }
    }

    async fn remove_container(&self, name: &str, stop_first: bool) -> CoreResult<()> {
        if !self.runtime.container_exists(name, true).await? {
            return Ok(());
        }
        if stop_first {
            self.stop_if_running(name).await?;
        }
        info!(instance = %name, "deleting container");
        self.runtime.delete_container(name).await
    }

    /// Delete every image the cluster uses. Images are shared between
    /// instances of one tag, so a single-instance purge does nothing.
    pub async fn purge(&mut self, scope: Scope) -> CoreResult<()> {
        if let Scope::Instance(n) = scope {
            self.targets(scope)?;
            info!(instance = n, "purge is cluster-wide only; nothing to do");
            return Ok(());
        }

        let repo = &self.config.image_repo;
        let tags = std::iter::once(self.state.master.tag()).chain(self.fleet.tags().iter());
        for (image, tag) in distinct_images(repo, tags) {
            let result = async {
                if self.runtime.image_exists(repo, &naming::image_tag(tag)).await? {
                    info!(image = %image, "deleting image");
                    self.runtime.delete_image(&image).await?;
                }
                Ok::<_, CoreError>(())
            }
            .await;
            if let Err(e) = result {
                self.report(Action::Purge, &image, &e);
            }
        }
        Ok(())
    }

    fn report(&self, action: Action, instance: &str, err: &CoreError) {
        self.metrics.record_action_error(action.as_str(), err.kind());
        self.errors.report(ErrorReport::new(
            action.as_str(),
            instance,
            err.kind(),
            err.to_string(),
        ));
    }
}

/// `(image name, tag)` for each distinct image, first occurrence wins.
fn distinct_images<'a>(
    repo: &str,
    tags: impl IntoIterator<Item = &'a Tag>,
) -> Vec<(String, &'a Tag)> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .filter_map(|tag| {
            let image = naming::image_name(repo, tag);
            seen.insert(image.clone()).then_some((image, tag))
        })
        .collect()
}
