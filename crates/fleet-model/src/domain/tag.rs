use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    FIELD_SEPARATOR, PackageSource,
    error::{ModelError, ModelResult},
};

/// Build descriptor shared by a group of instances.
///
/// A tag is immutable and can only be obtained through [`Tag::parse_group`],
/// [`Tag::parse_master`] or [`crate::TagDistribution::parse`], so every field is
/// already validated: `count >= 1`, text fields are non-empty.
///
/// Serialized as its textual master form (`"<imageBase>:<version>:<source>"`)
/// when `count == 1`, and as the group form otherwise.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Tag {
    count: u32,
    image_base: String,
    version: String,
    source: PackageSource,
}

impl Tag {
    /// Parse a fleet group: `"<count>:<imageBase>:<version>:<packageSource>"`.
    pub fn parse_group(text: &str) -> ModelResult<Self> {
        let fields: Vec<&str> = text.trim().split(FIELD_SEPARATOR).collect();
        let [count, image_base, version, source] = fields.as_slice() else {
            return Err(ModelError::Parse(format!(
                "group '{text}' must have exactly 4 fields, got {}",
                fields.len()
            )));
        };

        let count = count.trim();
        let count: u32 = count.parse().map_err(|_| {
            ModelError::Parse(format!("group '{text}': count '{count}' is not a number"))
        })?;
        if count == 0 {
            return Err(ModelError::Parse(format!(
                "group '{text}': count must be positive"
            )));
        }
        Self::build(count, image_base, version, source, text)
    }

    /// Parse a master specification: `"<imageBase>:<version>:<packageSource>"`.
    ///
    /// The master is always a single instance, so `count` is 1.
    pub fn parse_master(text: &str) -> ModelResult<Self> {
        let fields: Vec<&str> = text.trim().split(FIELD_SEPARATOR).collect();
        let [image_base, version, source] = fields.as_slice() else {
            return Err(ModelError::Parse(format!(
                "master '{text}' must have exactly 3 fields, got {}",
                fields.len()
            )));
        };
        Self::build(1, image_base, version, source, text)
    }

    fn build(
        count: u32,
        image_base: &str,
        version: &str,
        source: &str,
        text: &str,
    ) -> ModelResult<Self> {
        let image_base = image_base.trim();
        let version = version.trim();
        if image_base.is_empty() || version.is_empty() {
            return Err(ModelError::Parse(format!("'{text}' has an empty field")));
        }
        let source = PackageSource::from_str(source)
            .map_err(|e| ModelError::Parse(format!("'{text}': {e}")))?;

        Ok(Self {
            count,
            image_base: image_base.to_string(),
            version: version.to_string(),
            source,
        })
    }

    /// Number of instances sharing this tag.
    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    #[inline]
    pub fn image_base(&self) -> &str {
        &self.image_base
    }

    #[inline]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[inline]
    pub fn source(&self) -> PackageSource {
        self.source
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count != 1 {
            write!(f, "{}{FIELD_SEPARATOR}", self.count)?;
        }
        write!(
            f,
            "{}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{}",
            self.image_base, self.version, self.source
        )
    }
}

impl TryFrom<String> for Tag {
    type Error = ModelError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.trim().split(FIELD_SEPARATOR).count() {
            3 => Self::parse_master(&s),
            _ => Self::parse_group(&s),
        }
    }
}

impl From<Tag> for String {
    fn from(t: Tag) -> Self {
        t.to_string()
    }
}
