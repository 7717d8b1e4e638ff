//! Version - Immutable row version
//!
//! Updates append a new version, deletes append an explicit tombstone.

use super::CommitId;
use crate::query::{Row, Value};

/// The payload of a version: a full row or a tombstone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VersionPayload {
    Row(Row),
    Tombstone,
}

impl VersionPayload {
    #[inline]
    pub fn is_tombstone(&self) -> bool {
        matches!(self, VersionPayload::Tombstone)
    }
}

/// A single immutable row version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Version {
    /// Primary key of the row
    key: Value,
    payload: VersionPayload,
    commit_id: CommitId,
}

impl Version {
    pub fn new(key: Value, payload: VersionPayload, commit_id: CommitId) -> Self {
        Self {
            key,
            payload,
            commit_id,
        }
    }

    pub fn with_row(key: Value, row: Row, commit_id: CommitId) -> Self {
        Self::new(key, VersionPayload::Row(row), commit_id)
    }

    pub fn with_tombstone(key: Value, commit_id: CommitId) -> Self {
        Self::new(key, VersionPayload::Tombstone, commit_id)
    }

    #[inline]
    pub fn key(&self) -> &Value {
        &self.key
    }

    #[inline]
    pub fn payload(&self) -> &VersionPayload {
        &self.payload
    }

    /// The row, unless this is a tombstone.
    #[inline]
    pub fn row(&self) -> Option<&Row> {
        match &self.payload {
            VersionPayload::Row(row) => Some(row),
            VersionPayload::Tombstone => None,
        }
    }

    #[inline]
    pub fn commit_id(&self) -> CommitId {
        self.commit_id
    }

    #[inline]
    pub fn is_tombstone(&self) -> bool {
        self.payload.is_tombstone()
    }
}
