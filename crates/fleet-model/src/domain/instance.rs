use std::fmt;

use crate::{InstanceNumber, Tag, TagDistribution, error::ModelResult, naming};

/// Position of an instance inside the cluster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Master,
    Minion(InstanceNumber),
}

impl Role {
    /// Minion number, `None` for the master.
    pub fn number(&self) -> Option<InstanceNumber> {
        match self {
            Role::Master => None,
            Role::Minion(n) => Some(*n),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Master => f.write_str("master"),
            Role::Minion(n) => write!(f, "minion {n}"),
        }
    }
}

/// A concrete instance: its role, governing tag and derived name.
///
/// The name is computed once at construction and never changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstanceRef {
    role: Role,
    tag: Tag,
    name: String,
}

impl InstanceRef {
    /// The master instance, named `<prefix>-<imageBase>-<version>-<source>`.
    pub fn master(prefix: &str, tag: &Tag) -> Self {
        Self {
            role: Role::Master,
            name: naming::instance_name(prefix, None, tag),
            tag: tag.clone(),
        }
    }

    /// Minion `instance`, named `<prefix>-<n>-<imageBase>-<version>-<source>`.
    pub fn minion(
        prefix: &str,
        instance: InstanceNumber,
        fleet: &TagDistribution,
    ) -> ModelResult<Self> {
        let tag = fleet.resolve(instance)?;
        Ok(Self {
            role: Role::Minion(instance),
            name: naming::instance_name(prefix, Some(instance), tag),
            tag: tag.clone(),
        })
    }

    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    #[inline]
    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for InstanceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.role)
    }
}
