use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    FIELD_SEPARATOR, GROUP_SEPARATOR, InstanceNumber, Tag,
    error::{ModelError, ModelResult},
};

/// Ordered tag groups describing a whole minion fleet.
///
/// Instance numbers are assigned contiguously in group order: with
/// `"2:a:1:git,3:b:2:deb"` instances 1-2 use the first tag and 3-5 the second.
/// Every number in `1..=total_count()` resolves to exactly one tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagDistribution {
    tags: Vec<Tag>,
    /// Running sum of `tags[..=i].count()`.
    cumulative: Vec<u32>,
}

impl TagDistribution {
    /// Parse a fleet specification (comma-separated groups).
    pub fn parse(text: &str) -> ModelResult<Self> {
        if text.trim().is_empty() {
            return Err(ModelError::Parse("fleet specification is empty".into()));
        }
        let tags = text
            .split(GROUP_SEPARATOR)
            .map(Tag::parse_group)
            .collect::<ModelResult<Vec<_>>>()?;
        Self::from_tags(tags)
    }

    fn from_tags(tags: Vec<Tag>) -> ModelResult<Self> {
        let mut cumulative = Vec::with_capacity(tags.len());
        let mut total: u32 = 0;
        for tag in &tags {
            total = total
                .checked_add(tag.count())
                .ok_or_else(|| ModelError::Parse("fleet instance count overflows".into()))?;
            cumulative.push(total);
        }
        Ok(Self { tags, cumulative })
    }

    /// Resolve an instance number to the tag governing it.
    pub fn resolve(&self, instance: InstanceNumber) -> ModelResult<&Tag> {
        if instance == 0 {
            return Err(self.out_of_range(instance));
        }
        self.tags
            .iter()
            .zip(&self.cumulative)
            .find(|(_, upto)| **upto >= instance)
            .map(|(tag, _)| tag)
            .ok_or_else(|| self.out_of_range(instance))
    }

    /// Sum of all group counts.
    #[inline]
    pub fn total_count(&self) -> u32 {
        self.cumulative.last().copied().unwrap_or(0)
    }

    /// Tag groups in declaration order.
    #[inline]
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Running instance totals, one per group.
    #[inline]
    pub fn cumulative(&self) -> &[u32] {
        &self.cumulative
    }

    fn out_of_range(&self, instance: InstanceNumber) -> ModelError {
        ModelError::Naming {
            instance,
            total: self.total_count(),
        }
    }
}

impl fmt::Display for TagDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, tag) in self.tags.iter().enumerate() {
            if i > 0 {
                write!(f, "{GROUP_SEPARATOR}")?;
            }
            // Always emit the count so the text parses back as a group.
            write!(
                f,
                "{}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{}",
                tag.count(),
                tag.image_base(),
                tag.version(),
                tag.source()
            )?;
        }
        Ok(())
    }
}

impl TryFrom<String> for TagDistribution {
    type Error = ModelError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<TagDistribution> for String {
    fn from(d: TagDistribution) -> Self {
        d.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PackageSource;

    #[test]
    fn single_group_resolves_every_instance() {
        let dist = TagDistribution::parse("2:alpine:1.0:git").unwrap();
        assert_eq!(dist.total_count(), 2);

        for i in 1..=2 {
            let tag = dist.resolve(i).unwrap();
            assert_eq!(tag.image_base(), "alpine");
            assert_eq!(tag.version(), "1.0");
            assert_eq!(tag.source(), PackageSource::Git);
        }
    }

    #[test]
    fn resolves_across_group_boundaries() {
        let dist =
            TagDistribution::parse("2:lucid:0.17.1:git, 3:precise:0.17.5+ds-1:deb,1:trusty:v2014.1.10:git")
                .unwrap();
        assert_eq!(dist.cumulative(), &[2, 5, 6]);
        assert_eq!(dist.total_count(), 6);

        let bases: Vec<&str> = (1..=6)
            .map(|i| dist.resolve(i).unwrap().image_base())
            .collect();
        assert_eq!(
            bases,
            ["lucid", "lucid", "precise", "precise", "precise", "trusty"]
        );
    }

    #[test]
    fn total_equals_sum_of_groups() {
        let dist = TagDistribution::parse("4:a:1:git,7:b:2:deb,1:c:3:git").unwrap();
        let sum: u32 = dist.tags().iter().map(Tag::count).sum();
        assert_eq!(dist.total_count(), sum);
        assert_eq!(dist.cumulative(), [4, 11, 12]);
    }

    #[test]
    fn out_of_range_is_naming_error() {
        let dist = TagDistribution::parse("2:alpine:1.0:git").unwrap();
        assert_eq!(
            dist.resolve(0).unwrap_err(),
            ModelError::Naming { instance: 0, total: 2 }
        );
        assert_eq!(
            dist.resolve(3).unwrap_err(),
            ModelError::Naming { instance: 3, total: 2 }
        );
    }

    #[test]
    fn instances_are_numbered_from_one_in_group_order() {
        let dist = TagDistribution::parse("1:a:1:git,2:b:2:deb").unwrap();
        let got: Vec<(u32, &str)> = (1..=dist.total_count())
            .map(|n| (n, dist.resolve(n).unwrap().image_base()))
            .collect();
        assert_eq!(got, vec![(1, "a"), (2, "b"), (3, "b")]);
    }

    #[test]
    fn rejects_malformed_specs() {
        for bad in ["", "   ", "2:alpine:1.0", "2:alpine:1.0:git,", "two:alpine:1.0:git"] {
            assert!(
                matches!(TagDistribution::parse(bad), Err(ModelError::Parse(_))),
                "expected parse error for {bad:?}"
            );
        }
    }

    #[test]
    fn display_parses_back() {
        let text = "1:a:1:git,2:b:0.17.5+ds-1:deb";
        let dist = TagDistribution::parse(text).unwrap();
        assert_eq!(dist.to_string(), text);
        assert_eq!(TagDistribution::parse(&dist.to_string()).unwrap(), dist);
    }

    #[test]
    fn display_spells_out_single_counts() {
        let dist = TagDistribution::parse("1:precise:0.17.5:git").unwrap();
        assert_eq!(dist.tags()[0].to_string(), "precise:0.17.5:git");
        let rendered = dist.to_string();
        let fields: Vec<&str> = rendered.split(FIELD_SEPARATOR).collect();
        assert_eq!(fields, ["1", "precise", "0.17.5", "git"]);
    }
}
