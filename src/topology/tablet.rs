//! Static tablet description

use serde::{Deserialize, Serialize};

use super::{TabletAlias, TabletType};

/// Where a tablet lives and what it holds.
///
/// The configured type is the role the tablet was provisioned with; the role
/// it is actually serving in comes from probes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabletInfo {
    pub alias: TabletAlias,
    pub keyspace: String,
    pub shard: String,
    pub hostname: String,
    pub port: u16,
    pub tablet_type: TabletType,
}

impl TabletInfo {
    pub fn new(
        alias: TabletAlias,
        keyspace: impl Into<String>,
        shard: impl Into<String>,
        hostname: impl Into<String>,
        port: u16,
        tablet_type: TabletType,
    ) -> Self {
        Self {
            alias,
            keyspace: keyspace.into(),
            shard: shard.into(),
            hostname: hostname.into(),
            port,
            tablet_type,
        }
    }

    /// `host:port` of the tablet
    pub fn address(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}
