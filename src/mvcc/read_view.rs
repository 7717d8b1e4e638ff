//! ReadView - Stable snapshot boundary
//!
//! A read view is fixed when a transaction begins and never moves while the
//! transaction is open. Every version committed after the boundary stays
//! invisible to it, even once it has been applied locally.

use super::CommitId;

/// A stable snapshot boundary for reads.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ReadView {
    read_upper_bound: CommitId,
}

impl ReadView {
    /// Creates a read view that sees every commit up to and including `upper_bound`.
    #[inline]
    pub fn new(upper_bound: CommitId) -> Self {
        Self {
            read_upper_bound: upper_bound,
        }
    }

    #[inline]
    pub fn upper_bound(&self) -> CommitId {
        self.read_upper_bound
    }
}
