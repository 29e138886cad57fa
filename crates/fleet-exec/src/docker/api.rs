//! Subset of the docker engine API payloads we read.
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct ContainerSummary {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Names", default)]
    pub names: Vec<String>,
}

impl ContainerSummary {
    /// Id prefix, or exact name without the leading `/`.
    pub fn matches(&self, name: &str) -> bool {
        self.id.starts_with(name) || self.names.iter().any(|n| n.trim_start_matches('/') == name)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageSummary {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "RepoTags", default)]
    pub repo_tags: Option<Vec<String>>,
}

impl ImageSummary {
    pub fn matches(&self, image: &str) -> bool {
        self.id.starts_with(image)
            || self
                .repo_tags
                .as_deref()
                .is_some_and(|tags| tags.iter().any(|t| t == image))
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct NetworkSettings {
    #[serde(rename = "IPAddress", default)]
    pub ip_address: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContainerInspect {
    #[serde(rename = "HostsPath", default)]
    pub hosts_path: String,
    #[serde(rename = "NetworkSettings", default)]
    pub network_settings: NetworkSettings,
}
