//! In-memory collaborators for orchestrator tests.
use std::{
    collections::{BTreeMap, BTreeSet, HashSet},
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use async_trait::async_trait;
use fleet_model::Tag;
use tempfile::TempDir;

use crate::{
    agent::ConfigAgent,
    error::{CoreError, CoreResult},
    runtime::{ContainerRuntime, ImageRecipe},
};

/// Completion order shared between a runtime and an agent double.
pub type Timeline = Arc<Mutex<Vec<String>>>;

#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub image: String,
    pub running: bool,
    pub address: Option<String>,
    pub hosts: PathBuf,
}

#[derive(Debug, Default)]
struct RuntimeInner {
    images: BTreeSet<String>,
    containers: BTreeMap<String, FakeContainer>,
    next_host: u8,
    calls: Vec<String>,
    failures: HashSet<(String, String)>,
}

/// Docker-like runtime with hosts files in a temp dir.
pub struct FakeRuntime {
    inner: Mutex<RuntimeInner>,
    dir: TempDir,
    timeline: Timeline,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RuntimeInner {
                next_host: 2,
                ..Default::default()
            }),
            dir: tempfile::tempdir().unwrap(),
            timeline: Timeline::default(),
        }
    }

    /// Log `hosts <name>` on every hosts-table lookup.
    pub fn with_timeline(mut self, timeline: Timeline) -> Self {
        self.timeline = timeline;
        self
    }

    fn lock(&self) -> MutexGuard<'_, RuntimeInner> {
        self.inner.lock().unwrap()
    }

    /// Make `op` fail with status 500 for `name`.
    pub fn fail_on(&self, op: &str, name: &str) {
        self.lock().failures.insert((op.into(), name.into()));
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn calls_of(&self, op: &str) -> Vec<String> {
        let prefix = format!("{op} ");
        self.calls()
            .into_iter()
            .filter_map(|c| c.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    pub fn container(&self, name: &str) -> Option<FakeContainer> {
        self.lock().containers.get(name).cloned()
    }

    pub fn container_names(&self) -> Vec<String> {
        self.lock().containers.keys().cloned().collect()
    }

    pub fn images(&self) -> BTreeSet<String> {
        self.lock().images.clone()
    }

    pub fn address(&self, name: &str) -> Option<String> {
        self.container(name).and_then(|c| c.address)
    }

    pub fn hosts_of(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(format!("{name}.hosts"))).unwrap()
    }

    fn enter(&self, op: &str, name: &str) -> CoreResult<MutexGuard<'_, RuntimeInner>> {
        let mut inner = self.lock();
        inner.calls.push(format!("{op} {name}"));
        if inner.failures.contains(&(op.to_string(), name.to_string())) {
            return Err(CoreError::protocol(format!("/{op}/{name}"), 500, "injected"));
        }
        Ok(inner)
    }
}

fn missing(op: &str, name: &str) -> CoreError {
    CoreError::protocol(format!("/{op}/{name}"), 404, "no such object")
}

fn conflict(op: &str, name: &str) -> CoreError {
    CoreError::protocol(format!("/{op}/{name}"), 409, "conflict")
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn build_image(&self, spec: &str, repo: &str, tag: &str) -> CoreResult<()> {
        let image = format!("{repo}:{tag}");
        let mut inner = self.enter("build", &image)?;
        assert!(!spec.is_empty());
        inner.images.insert(image);
        Ok(())
    }

    async fn create_container(&self, image: &str, name: &str) -> CoreResult<()> {
        let mut inner = self.enter("create", name)?;
        if inner.containers.contains_key(name) {
            return Err(conflict("create", name));
        }
        if !inner.images.contains(image) {
            return Err(missing("create", image));
        }
        let hosts = self.dir.path().join(format!("{name}.hosts"));
        std::fs::write(&hosts, "127.0.0.1 localhost\n").unwrap();
        inner.containers.insert(
            name.to_string(),
            FakeContainer {
                image: image.to_string(),
                running: false,
                address: None,
                hosts,
            },
        );
        Ok(())
    }

    async fn start_container(&self, name: &str) -> CoreResult<()> {
        let mut inner = self.enter("start", name)?;
        let host = inner.next_host;
        inner.next_host = inner.next_host.wrapping_add(1);
        let c = inner
            .containers
            .get_mut(name)
            .ok_or_else(|| missing("start", name))?;
        c.running = true;
        c.address = Some(format!("172.17.0.{host}"));
        Ok(())
    }

    async fn stop_container(&self, name: &str) -> CoreResult<()> {
        let mut inner = self.enter("stop", name)?;
        let c = inner
            .containers
            .get_mut(name)
            .ok_or_else(|| missing("stop", name))?;
        c.running = false;
        c.address = None;
        Ok(())
    }

    async fn delete_container(&self, name: &str) -> CoreResult<()> {
        let mut inner = self.enter("delete", name)?;
        match inner.containers.get(name) {
            None => Err(missing("delete", name)),
            Some(c) if c.running => Err(conflict("delete", name)),
            Some(_) => {
                inner.containers.remove(name);
                Ok(())
            }
        }
    }

    async fn delete_image(&self, image: &str) -> CoreResult<()> {
        let mut inner = self.enter("rmi", image)?;
        if inner.containers.values().any(|c| c.image == image) {
            return Err(conflict("rmi", image));
        }
        if !inner.images.remove(image) {
            return Err(missing("rmi", image));
        }
        Ok(())
    }

    async fn container_exists(&self, name: &str, include_stopped: bool) -> CoreResult<bool> {
        let inner = self.lock();
        Ok(inner
            .containers
            .get(name)
            .is_some_and(|c| include_stopped || c.running))
    }

    async fn image_exists(&self, repo: &str, tag: &str) -> CoreResult<bool> {
        Ok(self.lock().images.contains(&format!("{repo}:{tag}")))
    }

    async fn get_address(&self, name: &str) -> CoreResult<String> {
        let inner = self.enter("inspect", name)?;
        inner
            .containers
            .get(name)
            .and_then(|c| c.address.clone())
            .ok_or_else(|| CoreError::ResourceState(format!("{name} is not running")))
    }

    async fn get_hosts_table_path(&self, name: &str) -> CoreResult<PathBuf> {
        self.timeline.lock().unwrap().push(format!("hosts {name}"));
        let inner = self.lock();
        inner
            .containers
            .get(name)
            .map(|c| c.hosts.clone())
            .ok_or_else(|| missing("inspect", name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    Put {
        target: String,
        id: String,
        contents: String,
    },
    Apply {
        target: String,
        id: String,
    },
    Fact {
        target: String,
        fact: String,
    },
}

impl AgentEvent {
    pub fn target(&self) -> &str {
        match self {
            AgentEvent::Put { target, .. }
            | AgentEvent::Apply { target, .. }
            | AgentEvent::Fact { target, .. } => target,
        }
    }
}

/// Config agent that logs every call in arrival order.
pub struct FakeAgent {
    events: Mutex<Vec<AgentEvent>>,
    fingerprint: String,
    failing: Mutex<HashSet<String>>,
    apply_delay: Duration,
    timeline: Timeline,
}

impl FakeAgent {
    pub fn new(fingerprint: &str) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fingerprint: fingerprint.to_string(),
            failing: Mutex::new(HashSet::new()),
            apply_delay: Duration::ZERO,
            timeline: Timeline::default(),
        }
    }

    /// Every apply takes `delay` before it answers.
    pub fn with_apply_delay(mut self, delay: Duration) -> Self {
        self.apply_delay = delay;
        self
    }

    /// Log `applied <target> <id>` when an apply completes.
    pub fn with_timeline(mut self, timeline: Timeline) -> Self {
        self.timeline = timeline;
        self
    }

    /// Every call against `target` answers 500.
    pub fn fail_target(&self, target: &str) {
        self.failing.lock().unwrap().insert(target.to_string());
    }

    pub fn events(&self) -> Vec<AgentEvent> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: AgentEvent) -> CoreResult<()> {
        let target = event.target().to_string();
        self.events.lock().unwrap().push(event);
        if self.failing.lock().unwrap().contains(&target) {
            return Err(CoreError::protocol(format!("http://{target}:8010/"), 500, "agent failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl ConfigAgent for FakeAgent {
    async fn apply_manifest(&self, target: &str, manifest_id: &str) -> CoreResult<()> {
        if self.apply_delay.is_zero() {
            // Give other workers a chance to interleave.
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.apply_delay).await;
        }
        let res = self.record(AgentEvent::Apply {
            target: target.into(),
            id: manifest_id.into(),
        });
        self.timeline
            .lock()
            .unwrap()
            .push(format!("applied {target} {manifest_id}"));
        res
    }

    async fn put_manifest(&self, target: &str, manifest_id: &str, contents: &str) -> CoreResult<()> {
        self.record(AgentEvent::Put {
            target: target.into(),
            id: manifest_id.into(),
            contents: contents.into(),
        })
    }

    async fn get_fact(&self, target: &str, fact: &str) -> CoreResult<String> {
        self.record(AgentEvent::Fact {
            target: target.into(),
            fact: fact.into(),
        })?;
        Ok(format!("{}\n", self.fingerprint))
    }
}

pub struct StaticRecipe;

impl ImageRecipe for StaticRecipe {
    fn render(&self, tag: &Tag) -> String {
        format!("FROM base:{}\n", tag.image_base())
    }
}
