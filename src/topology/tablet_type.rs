//! Tablet role
//!
//! A shard has one primary (creates history) and any number of replicas
//! (consume history, never create it). A tablet's role is reported by the
//! tablet itself on every probe; the gateway never infers it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::TopologyError;

/// Role a tablet is serving in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TabletType {
    /// Sole writable tablet of its shard
    #[serde(rename = "PRIMARY", alias = "primary", alias = "MASTER", alias = "master")]
    Primary,
    /// Read-only copy fed by replication
    #[serde(rename = "REPLICA", alias = "replica")]
    Replica,
}

impl TabletType {
    /// Name used in introspection keys and `show vitess_tablets`
    pub fn as_str(&self) -> &'static str {
        match self {
            TabletType::Primary => "PRIMARY",
            TabletType::Replica => "REPLICA",
        }
    }

    pub fn is_primary(&self) -> bool {
        matches!(self, TabletType::Primary)
    }

    /// Whether statements for this role may modify data
    pub fn accepts_writes(&self) -> bool {
        self.is_primary()
    }
}

impl fmt::Display for TabletType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TabletType {
    type Err = TopologyError;

    /// `master` is accepted as the legacy name of the primary role.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" | "master" => Ok(TabletType::Primary),
            "replica" => Ok(TabletType::Replica),
            other => Err(TopologyError::UnknownTabletType(other.to_string())),
        }
    }
}
