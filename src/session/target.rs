//! Routing target selected with `use`

use std::fmt;
use std::str::FromStr;

use crate::topology::{TabletType, TopologyError};

/// Keyspace and role statements are routed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// `None` means the gateway's default keyspace
    pub keyspace: Option<String>,
    pub role: TabletType,
}

impl Target {
    pub fn role(role: TabletType) -> Self {
        Self {
            keyspace: None,
            role,
        }
    }
}

impl Default for Target {
    fn default() -> Self {
        Self::role(TabletType::Primary)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = self.role.as_str().to_ascii_lowercase();
        match &self.keyspace {
            Some(keyspace) => write!(f, "{}@{}", keyspace, role),
            None => write!(f, "@{}", role),
        }
    }
}

impl FromStr for Target {
    type Err = TopologyError;

    /// Accepts `@replica`, `@primary`, `@master`, `ks@replica` and `ks`.
    /// Backquotes around the keyspace are stripped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().trim_matches('`');
        let (keyspace, role) = match s.split_once('@') {
            Some((keyspace, role)) => (keyspace.trim_matches('`'), role.parse()?),
            None => (s, TabletType::Primary),
        };
        Ok(Self {
            keyspace: (!keyspace.is_empty()).then(|| keyspace.to_string()),
            role,
        })
    }
}
