use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::logger::error::LoggerError;

/// Crates whose progress messages `--verbose` turns up to `debug`.
const FLEET_TARGETS: [&str; 4] = ["fleet_core", "fleet_exec", "fleet_ctl", "fleet_observe"];

/// Validated `EnvFilter` expression (e.g. `"info"`, `"fleet_core=debug,warn"`).
///
/// The raw string is kept so the config can be serialized back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LoggerLevel(String);

impl LoggerLevel {
    pub fn new(s: impl Into<String>) -> Result<Self, LoggerError> {
        Self::try_from(s.into())
    }

    /// `info` for every crate, or `debug` for the fleet crates when `verbose`.
    pub fn for_verbosity(verbose: bool) -> Self {
        if !verbose {
            return Self::default();
        }
        let mut directives: Vec<String> =
            FLEET_TARGETS.iter().map(|t| format!("{t}=debug")).collect();
        directives.push("info".into());
        Self(directives.join(","))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build the filter. Never fails: the expression was checked on construction.
    pub fn to_env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.0).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

impl Default for LoggerLevel {
    fn default() -> Self {
        Self("info".into())
    }
}

impl FromStr for LoggerLevel {
    type Err = LoggerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_owned())
    }
}

impl TryFrom<String> for LoggerLevel {
    type Error = LoggerError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        EnvFilter::try_new(&s)
            .map(|_| LoggerLevel(s.clone()))
            .map_err(|e| LoggerError::InvalidLevel(format!("{s}: {e}")))
    }
}

impl From<LoggerLevel> for String {
    fn from(l: LoggerLevel) -> Self {
        l.0
    }
}
