use std::collections::BTreeMap;

use fleet_model::InstanceRef;

/// What the orchestrator knows about the cluster during one invocation.
#[derive(Debug, Clone)]
pub struct ClusterState {
    pub master: InstanceRef,
    /// Every minion of the fleet, in instance-number order.
    pub minions: Vec<InstanceRef>,
    /// Minion name → address, filled by `configure`.
    pub ip_table: BTreeMap<String, String>,
    pub master_address: Option<String>,
    /// Set once per invocation by the first successful master configure.
    pub master_fingerprint: Option<String>,
}

impl ClusterState {
    pub fn new(master: InstanceRef, minions: Vec<InstanceRef>) -> Self {
        Self {
            master,
            minions,
            ip_table: BTreeMap::new(),
            master_address: None,
            master_fingerprint: None,
        }
    }

    pub fn minion(&self, number: u32) -> Option<&InstanceRef> {
        number
            .checked_sub(1)
            .and_then(|i| self.minions.get(i as usize))
    }
}
