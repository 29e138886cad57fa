use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Where the software installed in an image comes from.
///
/// - `Git`: the version is a git ref checked out from the source tree.
/// - `Deb`: the version is a debian package version (may contain `+` or `~`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PackageSource {
    Git,
    Deb,
}

impl PackageSource {
    /// Returns the canonical lowercase name used in names and specs.
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageSource::Git => "git",
            PackageSource::Deb => "deb",
        }
    }
}

impl FromStr for PackageSource {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "git" => Ok(PackageSource::Git),
            "deb" => Ok(PackageSource::Deb),
            other => Err(ModelError::UnknownPackageSource(other.to_string())),
        }
    }
}

impl fmt::Display for PackageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
