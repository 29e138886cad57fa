//! Deterministic names for instances and images.
//!
//! All functions here are pure: the same inputs always give the same name.
//! Tag fields are sanitized before use because versions and package sources
//! may carry characters that are not valid in container or image identifiers.
use crate::{InstanceNumber, Tag};

/// Joins the parts of an instance name.
pub const NAME_SEPARATOR: char = '-';

/// Joins an image repository and its tag.
pub const IMAGE_TAG_SEPARATOR: char = ':';

/// Remove every character outside `[A-Za-z0-9_.-]`.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect()
}

/// Instance name: `prefix[-n]-imageBase-version-source`.
pub fn instance_name(prefix: &str, instance: Option<InstanceNumber>, tag: &Tag) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(5);
    parts.push(prefix.to_string());
    if let Some(n) = instance {
        parts.push(n.to_string());
    }
    parts.push(sanitize(tag.image_base()));
    parts.push(sanitize(tag.version()));
    parts.push(sanitize(tag.source().as_str()));
    parts.join(&NAME_SEPARATOR.to_string())
}

/// Image tag (the part after `:`): `imageBase-version-source`.
///
/// `+` in the version becomes `_` before sanitization, so `0.17.5+ds-1`
/// stays distinguishable from `0.17.5ds-1`.
pub fn image_tag(tag: &Tag) -> String {
    [
        sanitize(tag.image_base()),
        sanitize(&tag.version().replace('+', "_")),
        sanitize(tag.source().as_str()),
    ]
    .join(&NAME_SEPARATOR.to_string())
}

/// Full image name: `repo:imageBase-version-source`.
pub fn image_name(repo: &str, tag: &Tag) -> String {
    format!("{repo}{IMAGE_TAG_SEPARATOR}{}", image_tag(tag))
}
