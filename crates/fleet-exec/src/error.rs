use std::time::Duration;

use fleet_core::error::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("cannot connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{endpoint} did not answer within {after:?}")]
    Timeout { endpoint: String, after: Duration },

    #[error("i/o with {endpoint} failed: {source}")]
    Io {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("http exchange with {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: hyper::Error,
    },

    #[error("cannot build request for {endpoint}: {reason}")]
    InvalidRequest { endpoint: String, reason: String },

    #[error("malformed response from {endpoint}: {reason}")]
    Malformed { endpoint: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<ExecError> for CoreError {
    fn from(e: ExecError) -> Self {
        let (endpoint, reason) = match e {
            ExecError::InvalidConfig(msg) => return CoreError::Config(msg),
            ExecError::Connect { endpoint, source } => (endpoint, format!("connect: {source}")),
            ExecError::Timeout { endpoint, after } => (endpoint, format!("no answer within {after:?}")),
            ExecError::Io { endpoint, source } => (endpoint, source.to_string()),
            ExecError::Http { endpoint, source } => (endpoint, format!("http: {source}")),
            ExecError::InvalidRequest { endpoint, reason } => (endpoint, format!("bad request: {reason}")),
            ExecError::Malformed { endpoint, reason } => (endpoint, format!("malformed response: {reason}")),
        };
        CoreError::Transport { endpoint, reason }
    }
}
