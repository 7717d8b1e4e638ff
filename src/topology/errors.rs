//! Topology errors

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// Alias not of the form `<cell>-<uid>`
    #[error("invalid tablet alias: {0}")]
    InvalidAlias(String),

    /// Role string the gateway does not route to
    #[error("unknown tablet type: {0}")]
    UnknownTabletType(String),
}
