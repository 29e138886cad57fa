use std::{fmt, str::FromStr};

use fleet_model::InstanceNumber;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Top-level lifecycle actions. Declaration order is execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Start,
    Configure,
    Stop,
    Delete,
    Purge,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::Create,
        Action::Start,
        Action::Configure,
        Action::Stop,
        Action::Delete,
        Action::Purge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Start => "start",
            Action::Configure => "configure",
            Action::Stop => "stop",
            Action::Delete => "delete",
            Action::Purge => "purge",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::Config(format!("unknown action: {s}")))
    }
}

/// What an action targets: the whole fleet or one minion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    Cluster,
    Instance(InstanceNumber),
}

impl Scope {
    #[inline]
    pub fn is_cluster(&self) -> bool {
        matches!(self, Scope::Cluster)
    }
}

impl From<Option<InstanceNumber>> for Scope {
    fn from(v: Option<InstanceNumber>) -> Self {
        v.map_or(Scope::Cluster, Scope::Instance)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Cluster => f.write_str("cluster"),
            Scope::Instance(n) => write!(f, "instance {n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_follows_execution_order() {
        let mut v = vec![Action::Purge, Action::Stop, Action::Create, Action::Configure];
        v.sort();
        assert_eq!(
            v,
            vec![Action::Create, Action::Configure, Action::Stop, Action::Purge]
        );
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("Configure".parse::<Action>().unwrap(), Action::Configure);
        assert!("restart".parse::<Action>().is_err());
    }

    #[test]
    fn scope_from_option() {
        assert_eq!(Scope::from(None), Scope::Cluster);
        assert_eq!(Scope::from(Some(3)), Scope::Instance(3));
        assert!(!Scope::Instance(3).is_cluster());
    }
}
