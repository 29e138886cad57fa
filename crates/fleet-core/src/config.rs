use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    error::{CoreError, CoreResult},
    hosts::HOSTS_SENTINEL,
    pool::PoolConfig,
};

/// Orchestrator settings. Every field has a default, so a partial JSON object
/// is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub master_prefix: String,
    pub minion_prefix: String,
    /// Repository every built image is tagged into.
    pub image_repo: String,
    /// Concurrent pooled jobs. Keep at 1 unless the agent is known to cope
    /// with parallel requests.
    pub worker_count: usize,
    pub poll_interval_ms: u64,
    /// Pause between starting the master service and reading its fingerprint.
    pub settle_delay_ms: u64,
    pub fingerprint_fact: String,
    pub hosts_sentinel: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            master_prefix: "saltmaster".into(),
            minion_prefix: "minion".into(),
            image_repo: "ariel/salt".into(),
            worker_count: 1,
            poll_interval_ms: 1_000,
            settle_delay_ms: 5_000,
            fingerprint_fact: "salt_key_fingerprint".into(),
            hosts_sentinel: HOSTS_SENTINEL.into(),
        }
    }
}

impl ClusterConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.worker_count == 0 {
            return Err(CoreError::Config("worker_count must be at least 1".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(CoreError::Config("poll_interval_ms must be positive".into()));
        }
        for (field, value) in [
            ("master_prefix", &self.master_prefix),
            ("minion_prefix", &self.minion_prefix),
            ("image_repo", &self.image_repo),
            ("fingerprint_fact", &self.fingerprint_fact),
            ("hosts_sentinel", &self.hosts_sentinel),
        ] {
            if value.trim().is_empty() {
                return Err(CoreError::Config(format!("{field} must not be empty")));
            }
        }
        if self.master_prefix == self.minion_prefix {
            return Err(CoreError::Config(
                "master_prefix and minion_prefix must differ".into(),
            ));
        }
        Ok(())
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            workers: self.worker_count.max(1),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }

    #[inline]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}
