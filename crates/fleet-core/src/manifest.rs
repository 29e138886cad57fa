//! Manifests pushed to the configuration agent.
use crate::{agent::ConfigAgent, error::CoreResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub id: &'static str,
    pub contents: String,
}

const PRELUDE: &str = "import 'salt.pp'\n";

impl Manifest {
    pub fn master_config() -> Self {
        Self {
            id: "manifests/salt_master_config.pp",
            contents: format!("{PRELUDE}class {{ 'salt::master::config': }}\n"),
        }
    }

    pub fn master_start() -> Self {
        Self {
            id: "manifests/salt_master_start.pp",
            contents: format!("{PRELUDE}class {{ 'salt::master': ensure => 'running' }}\n"),
        }
    }

    pub fn minion_config(master: &str) -> Self {
        Self {
            id: "manifests/salt_minion_config.pp",
            contents: format!(
                "{PRELUDE}class {{ 'salt::minion::config': salt_master => '{master}' }}\n"
            ),
        }
    }

    pub fn minion_start(master: &str, fingerprint: &str) -> Self {
        Self {
            id: "manifests/salt_minion_start.pp",
            contents: format!(
                "{PRELUDE}class {{ 'salt::minion': ensure => 'running', salt_master => '{master}', master_fingerprint => '{fingerprint}' }}\n"
            ),
        }
    }

    /// Put then apply on `target`.
    pub async fn push<A: ConfigAgent + ?Sized>(&self, agent: &A, target: &str) -> CoreResult<()> {
        agent.put_manifest(target, self.id, &self.contents).await?;
        agent.apply_manifest(target, self.id).await
    }
}
