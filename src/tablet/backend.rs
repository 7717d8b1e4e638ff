//! Tablet backend contract
//!
//! The gateway talks to every tablet through [`TabletBackend`]. Backends own
//! snapshot isolation: a transaction returned by [`TabletBackend::begin`] must
//! keep reading the snapshot taken at begin until it is committed or rolled
//! back, no matter what replication applies underneath it.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::errors::TabletResult;
use crate::query::QueryResult;
use crate::topology::{TabletInfo, TabletType};

/// Backend-assigned transaction handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TransactionId(u64);

impl TransactionId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a tablet reports about itself on a health probe
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResponse {
    /// Role the tablet is currently serving in
    pub tablet_type: TabletType,
    /// Whether the tablet accepts queries
    pub serving: bool,
    /// Seconds the tablet is behind its primary (0 for the primary)
    pub replication_lag_seconds: f64,
    /// When the tablet became primary, if it is one
    pub primary_term_start: Option<DateTime<Utc>>,
}

/// A backend storage tablet.
#[async_trait]
pub trait TabletBackend: Send + Sync {
    /// Static description of the tablet
    fn info(&self) -> &TabletInfo;

    /// Lightweight liveness / role / lag probe
    async fn probe(&self) -> TabletResult<ProbeResponse>;

    /// Start a transaction bound to the tablet's current snapshot
    async fn begin(&self) -> TabletResult<TransactionId>;

    /// Execute one statement, inside `tx` when given, autocommit otherwise
    async fn execute(&self, tx: Option<TransactionId>, sql: &str) -> TabletResult<QueryResult>;

    async fn commit(&self, tx: TransactionId) -> TabletResult<()>;

    async fn rollback(&self, tx: TransactionId) -> TabletResult<()>;
}
