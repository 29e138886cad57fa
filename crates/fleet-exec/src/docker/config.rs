use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::ExecError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    /// Daemon API socket.
    pub socket: PathBuf,
    /// CLI used for image builds.
    pub binary: PathBuf,
    pub timeout_ms: u64,
    /// Seconds the daemon waits before killing a stopping container.
    pub stop_grace_secs: u32,
    /// Bind the host selinuxfs read-only at `/selinux` in every container.
    pub selinux_hack: bool,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            socket: PathBuf::from("/var/run/docker.sock"),
            binary: PathBuf::from("/usr/bin/docker"),
            timeout_ms: 20_000,
            stop_grace_secs: 5,
            selinux_hack: false,
        }
    }
}

impl DockerConfig {
    pub fn validate(&self) -> Result<(), ExecError> {
        if self.timeout_ms == 0 {
            return Err(ExecError::InvalidConfig("docker timeout_ms must be positive".into()));
        }
        if self.socket.as_os_str().is_empty() {
            return Err(ExecError::InvalidConfig("docker socket path is empty".into()));
        }
        Ok(())
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
