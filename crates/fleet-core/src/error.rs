use std::path::PathBuf;

use fleet_model::ModelError;
use thiserror::Error;

use crate::pool::PoolError;

/// How far an error is allowed to travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Broken invocation (bad fleet text, unresolvable instance): abort the action.
    Fatal,
    /// Per-instance condition: report it and keep going where the action allows.
    Recoverable,
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("{endpoint} returned status {status}: {detail}")]
    RuntimeProtocol {
        endpoint: String,
        status: u16,
        detail: String,
    },

    #[error("{endpoint} unreachable: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("resource state: {0}")]
    ResourceState(String),

    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("worker pool: {0}")]
    Pool(#[from] PoolError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn protocol(endpoint: impl Into<String>, status: u16, detail: impl Into<String>) -> Self {
        CoreError::RuntimeProtocol {
            endpoint: endpoint.into(),
            status,
            detail: detail.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            CoreError::Model(_) | CoreError::Config(_) => Severity::Fatal,
            _ => Severity::Recoverable,
        }
    }

    #[inline]
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    /// Short stable label for reports and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Model(ModelError::Naming { .. }) => "naming",
            CoreError::Model(_) => "parse",
            CoreError::RuntimeProtocol { .. } => "runtime-protocol",
            CoreError::Transport { .. } => "transport",
            CoreError::ResourceState(_) => "resource-state",
            CoreError::Io { .. } => "io",
            CoreError::Pool(_) => "pool",
            CoreError::Config(_) => "config",
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
