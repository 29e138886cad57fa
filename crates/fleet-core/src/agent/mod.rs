//! Per-instance configuration agent seam.
use async_trait::async_trait;

use crate::error::CoreResult;

/// Declarative configuration service running inside every instance.
///
/// `target` is the address (or resolvable name) of the instance.
#[async_trait]
pub trait ConfigAgent: Send + Sync + 'static {
    async fn apply_manifest(&self, target: &str, manifest_id: &str) -> CoreResult<()>;

    /// Store `contents` under `manifest_id`, replacing any previous version.
    async fn put_manifest(&self, target: &str, manifest_id: &str, contents: &str)
    -> CoreResult<()>;

    async fn get_fact(&self, target: &str, fact: &str) -> CoreResult<String>;
}
