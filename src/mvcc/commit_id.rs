//! CommitId - Totally ordered commit identity
//!
//! Assigned by the primary at commit, carried unchanged through replication.
//! Replicas apply commits in strictly increasing order, so a replica's
//! applied boundary is a single CommitId.

use std::fmt;

/// A totally ordered commit identity.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct CommitId(u64);

impl CommitId {
    /// The boundary before any commit.
    pub const ZERO: CommitId = CommitId(0);

    #[inline]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }

    /// The identity following this one.
    #[inline]
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
