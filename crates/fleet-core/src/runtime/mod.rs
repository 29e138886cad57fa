//! Container runtime and image recipe seams.
use std::path::PathBuf;

use async_trait::async_trait;
use fleet_model::Tag;

use crate::error::CoreResult;

/// Image and container lifecycle on one runtime daemon.
///
/// Containers and images are addressed by name. Any non-success outcome is an
/// error; callers decide whether it is fatal.
#[async_trait]
pub trait ContainerRuntime: Send + Sync + 'static {
    /// Build `repo:tag` from a rendered recipe.
    async fn build_image(&self, spec: &str, repo: &str, tag: &str) -> CoreResult<()>;

    async fn create_container(&self, image: &str, name: &str) -> CoreResult<()>;

    async fn start_container(&self, name: &str) -> CoreResult<()>;

    async fn stop_container(&self, name: &str) -> CoreResult<()>;

    async fn delete_container(&self, name: &str) -> CoreResult<()>;

    /// Remove an image by full name (`repo:tag`) or id.
    async fn delete_image(&self, image: &str) -> CoreResult<()>;

    /// With `include_stopped == false` only running containers count.
    async fn container_exists(&self, name: &str, include_stopped: bool) -> CoreResult<bool>;

    async fn image_exists(&self, repo: &str, tag: &str) -> CoreResult<bool>;

    /// Current network address. Fails with `ResourceState` if not running.
    async fn get_address(&self, name: &str) -> CoreResult<String>;

    /// Host-side path of the container's hosts table.
    async fn get_hosts_table_path(&self, name: &str) -> CoreResult<PathBuf>;

    async fn is_running(&self, name: &str) -> CoreResult<bool> {
        self.container_exists(name, false).await
    }
}

/// Renders the build recipe (e.g. a Dockerfile) for one tag.
pub trait ImageRecipe: Send + Sync + 'static {
    fn render(&self, tag: &Tag) -> String;
}
