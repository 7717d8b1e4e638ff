//! Health check errors

use thiserror::Error;

use crate::topology::TabletAlias;

/// Result type for health check operations
pub type HealthCheckResult<T> = Result<T, HealthCheckError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HealthCheckError {
    /// A monitor for this tablet is already running
    #[error("tablet {0} is already monitored")]
    DuplicateTablet(TabletAlias),

    #[error("tablet {0} is not monitored")]
    UnknownTablet(TabletAlias),

    /// The health check has been shut down and accepts no new tablets
    #[error("health check is shut down")]
    ShutDown,
}
