//! Host selinuxfs discovery.
use std::path::{Path, PathBuf};

/// Default mount table location.
pub const PROC_MOUNTS: &str = "/proc/mounts";

/// Mount point of the first `selinuxfs` entry in a mount table.
pub fn parse_mounts(table: &str) -> Option<PathBuf> {
    table
        .lines()
        .filter(|l| l.starts_with("selinuxfs "))
        .find_map(|l| l.split_whitespace().nth(1))
        .map(PathBuf::from)
}

pub async fn find_mount(mounts: &Path) -> std::io::Result<Option<PathBuf>> {
    let table = tokio::fs::read_to_string(mounts).await?;
    Ok(parse_mounts(&table))
}
