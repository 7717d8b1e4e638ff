//! Tablet backend errors

use thiserror::Error;

use super::TransactionId;

/// Result type for tablet operations
pub type TabletResult<T> = Result<T, TabletError>;

/// Errors returned by a tablet backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TabletError {
    // ==================
    // Reachability
    // ==================
    /// The tablet could not be contacted
    #[error("tablet {0} unreachable")]
    Unreachable(String),

    /// The probe did not answer within the health-check timeout
    #[error("probe of tablet {0} timed out")]
    ProbeTimeout(String),

    /// The tablet answered but is not serving queries
    #[error("tablet {0} is not serving")]
    NotServing(String),

    // ==================
    // Statements
    // ==================
    /// Statement the tablet cannot parse
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("table '{0}' doesn't exist")]
    UnknownTable(String),

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("duplicate entry '{0}' for primary key")]
    DuplicateKey(String),

    /// Write attempted on a tablet that is not the primary
    #[error("tablet {0} is read-only")]
    ReadOnly(String),

    // ==================
    // Transactions
    // ==================
    #[error("transaction {0} not found")]
    UnknownTransaction(TransactionId),
}

impl TabletError {
    /// Errors that mean the tablet itself is unhealthy, as opposed to a bad statement
    pub fn is_health_failure(&self) -> bool {
        matches!(
            self,
            TabletError::Unreachable(_) | TabletError::ProbeTimeout(_) | TabletError::NotServing(_)
        )
    }
}
