//! Gateway errors
//!
//! Every error carries a stable code so clients can tell routing failures
//! apart from statement failures without parsing messages.

use thiserror::Error;

use crate::healthcheck::HealthCheckError;
use crate::tablet::TabletError;
use crate::topology::{TabletAlias, TopologyError};

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    // ==================
    // Routing
    // ==================
    #[error("no serving primary tablet available")]
    NoPrimaryAvailable,

    #[error("no serving replica tablet available")]
    NoReplicaAvailable,

    /// Write statement sent to a replica target
    #[error("write statements are not allowed on target {0}")]
    ReadOnlyTarget(String),

    /// The tablet holding the open transaction is no longer known
    #[error("tablet {0} holding the open transaction is gone; rollback to continue")]
    PinnedTabletGone(TabletAlias),

    #[error("unknown tablet {0}")]
    UnknownTablet(TabletAlias),

    #[error("unknown keyspace '{0}'")]
    UnknownKeyspace(String),

    // ==================
    // Statements
    // ==================
    #[error("unsupported statement: {0}")]
    UnsupportedStatement(String),

    #[error("invalid target: {0}")]
    InvalidTarget(#[from] TopologyError),

    #[error(transparent)]
    Tablet(#[from] TabletError),

    #[error(transparent)]
    HealthCheck(#[from] HealthCheckError),
}

impl GatewayError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::NoPrimaryAvailable => "GATEWAY_NO_PRIMARY",
            GatewayError::NoReplicaAvailable => "GATEWAY_NO_REPLICA",
            GatewayError::ReadOnlyTarget(_) => "GATEWAY_READ_ONLY_TARGET",
            GatewayError::PinnedTabletGone(_) => "GATEWAY_PINNED_TABLET_GONE",
            GatewayError::UnknownTablet(_) => "GATEWAY_UNKNOWN_TABLET",
            GatewayError::UnknownKeyspace(_) => "GATEWAY_UNKNOWN_KEYSPACE",
            GatewayError::UnsupportedStatement(_) => "GATEWAY_UNSUPPORTED_STATEMENT",
            GatewayError::InvalidTarget(_) => "GATEWAY_INVALID_TARGET",
            GatewayError::Tablet(_) => "GATEWAY_TABLET_ERROR",
            GatewayError::HealthCheck(_) => "GATEWAY_HEALTHCHECK_ERROR",
        }
    }

    /// Whether retrying the same statement later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::NoPrimaryAvailable | GatewayError::NoReplicaAvailable => true,
            GatewayError::Tablet(e) => e.is_health_failure(),
            _ => false,
        }
    }
}
