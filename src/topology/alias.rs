//! Tablet identity

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::TopologyError;

/// Stable identity of a tablet: the cell it lives in plus a numeric uid.
///
/// Rendered as `<cell>-<uid padded to 10 digits>`, e.g. `zone1-0000000100`.
/// Ordering is by cell then uid, which is also the order tablets are listed in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TabletAlias {
    pub cell: String,
    pub uid: u32,
}

impl TabletAlias {
    pub fn new(cell: impl Into<String>, uid: u32) -> Self {
        Self {
            cell: cell.into(),
            uid,
        }
    }
}

impl fmt::Display for TabletAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:010}", self.cell, self.uid)
    }
}

impl FromStr for TabletAlias {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (cell, uid) = s
            .rsplit_once('-')
            .ok_or_else(|| TopologyError::InvalidAlias(s.to_string()))?;
        if cell.is_empty() {
            return Err(TopologyError::InvalidAlias(s.to_string()));
        }
        let uid = uid
            .parse::<u32>()
            .map_err(|_| TopologyError::InvalidAlias(s.to_string()))?;
        Ok(Self::new(cell, uid))
    }
}
