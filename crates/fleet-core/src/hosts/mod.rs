//! Managed section of an instance's hosts table.
//!
//! Everything above the sentinel line belongs to the container runtime and is
//! kept byte for byte. Everything from the sentinel on is ours and is rewritten
//! on every reconcile, so running it twice with the same entries is a no-op.
use std::{collections::BTreeMap, path::Path};

use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// Marks the start of the managed section.
pub const HOSTS_SENTINEL: &str = "# saltcluster additions";

/// Name → address pairs written below the sentinel, in name order.
pub type HostEntries = BTreeMap<String, String>;

#[derive(Debug, Clone)]
pub struct HostsTableReconciler {
    sentinel: String,
}

impl Default for HostsTableReconciler {
    fn default() -> Self {
        Self::new(HOSTS_SENTINEL)
    }
}

impl HostsTableReconciler {
    pub fn new(sentinel: impl Into<String>) -> Self {
        Self {
            sentinel: sentinel.into(),
        }
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    /// Rewrite `existing` so that exactly `entries` follow the sentinel.
    ///
    /// Content after the first sentinel line is discarded. A missing trailing
    /// newline on the preserved part is added so the sentinel starts a line.
    pub fn patch(&self, existing: &str, entries: &HostEntries) -> String {
        let mut preserved = String::with_capacity(existing.len());
        for line in existing.split_inclusive('\n') {
            if line.trim_end() == self.sentinel {
                break;
            }
            preserved.push_str(line);
        }
        if !preserved.is_empty() && !preserved.ends_with('\n') {
            preserved.push('\n');
        }

        preserved.push_str(&self.sentinel);
        preserved.push('\n');
        for (name, addr) in entries {
            preserved.push_str(addr);
            preserved.push_str("   ");
            preserved.push_str(name);
            preserved.push('\n');
        }
        preserved
    }

    /// Read, patch and write back the hosts table at `path`.
    ///
    /// The file is rewritten in place: it is usually bind-mounted into a
    /// container, and a rename would replace the host-side inode only.
    pub async fn reconcile(&self, path: &Path, entries: &HostEntries) -> CoreResult<()> {
        let existing = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CoreError::io(path, e))?;
        let patched = self.patch(&existing, entries);
        if patched == existing {
            debug!(path = %path.display(), "hosts table already up to date");
            return Ok(());
        }
        tokio::fs::write(path, patched.as_bytes())
            .await
            .map_err(|e| CoreError::io(path, e))?;
        debug!(path = %path.display(), entries = entries.len(), "hosts table reconciled");
        Ok(())
    }
}
