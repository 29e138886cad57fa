//! Layered configuration: defaults, then the `--config` file, then flags.
use std::path::Path;

use anyhow::Context;
use fleet_core::config::ClusterConfig;
use fleet_exec::{DockerfileRecipe, agent::AgentConfig, docker::DockerConfig};
use fleet_observe::LoggerConfig;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

/// Everything the tool can be configured with, one section per component.
///
/// ```json
/// {
///   "cluster": { "worker_count": 4, "settle_delay_ms": 8000 },
///   "docker":  { "socket": "/run/docker.sock" },
///   "agent":   { "port": 8001 },
///   "logger":  { "format": "json" }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CtlConfig {
    pub cluster: ClusterConfig,
    pub docker: DockerConfig,
    pub agent: AgentConfig,
    pub recipe: DockerfileRecipe,
    pub logger: LoggerConfig,
}

impl CtlConfig {
    /// Read the config file named on the command line, if any, and apply the
    /// flags on top.
    ///
    /// Runs before the tokio runtime exists, so the file is read blocking.
    pub fn resolve(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Flags win over file values; flags that were not given leave them alone.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(prefix) = &cli.master_prefix {
            self.cluster.master_prefix = prefix.clone();
        }
        if let Some(prefix) = &cli.minion_prefix {
            self.cluster.minion_prefix = prefix.clone();
        }
        if let Some(workers) = cli.workers {
            self.cluster.worker_count = workers;
        }
        if let Some(binary) = &cli.docker {
            self.docker.binary = binary.clone();
        }
        if let Some(socket) = &cli.socket {
            self.docker.socket = socket.clone();
        }
        if cli.selinux_hack {
            self.docker.selinux_hack = true;
        }
        if let Some(port) = cli.port {
            self.agent.port = port;
        }
        if let Some(format) = cli.log_format {
            self.logger.format = format;
        }
        self.logger = std::mem::take(&mut self.logger).with_verbosity(cli.verbose);
    }
}
