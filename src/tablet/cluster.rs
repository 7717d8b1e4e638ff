//! Local in-memory cluster: one primary and its replicas

use std::sync::Arc;

use super::{MemoryTablet, TabletBackend, TabletResult};
use crate::topology::{TabletAlias, TabletInfo};

/// In-process tablets of one shard with replication wired up
pub struct LocalCluster {
    tablets: Vec<Arc<MemoryTablet>>,
}

impl LocalCluster {
    /// Create tablets for `infos`. Every replica is attached to the primary.
    pub fn new(infos: Vec<TabletInfo>) -> Self {
        let tablets: Vec<Arc<MemoryTablet>> = infos
            .into_iter()
            .map(|info| Arc::new(MemoryTablet::new(info)))
            .collect();

        if let Some(primary) = tablets.iter().find(|t| t.is_primary()) {
            for replica in tablets.iter().filter(|t| !t.is_primary()) {
                primary.attach_replica(Arc::clone(replica));
            }
        }
        Self { tablets }
    }

    /// Create a table on every tablet. The first column is the primary key.
    pub fn create_table(&self, name: &str, columns: &[&str]) -> TabletResult<()> {
        for tablet in &self.tablets {
            tablet.create_table(name, columns)?;
        }
        Ok(())
    }

    pub fn tablets(&self) -> &[Arc<MemoryTablet>] {
        &self.tablets
    }

    pub fn primary(&self) -> Option<&Arc<MemoryTablet>> {
        self.tablets.iter().find(|t| t.is_primary())
    }

    pub fn replicas(&self) -> impl Iterator<Item = &Arc<MemoryTablet>> {
        self.tablets.iter().filter(|t| !t.is_primary())
    }

    pub fn get(&self, alias: &TabletAlias) -> Option<&Arc<MemoryTablet>> {
        self.tablets.iter().find(|t| &t.info().alias == alias)
    }
}
