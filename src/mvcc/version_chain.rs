//! VersionChain - Version history of one row
//!
//! Versions are appended in commit order; the chain itself makes no
//! visibility decisions.

use super::{ReadView, Version, Visibility, VisibilityResult};
use crate::query::Value;

/// The complete version history of a single row.
#[derive(Clone, Debug)]
pub struct VersionChain {
    key: Value,
    versions: Vec<Version>,
}

impl VersionChain {
    pub fn new(key: Value) -> Self {
        Self {
            key,
            versions: Vec::new(),
        }
    }

    #[inline]
    pub fn key(&self) -> &Value {
        &self.key
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    #[inline]
    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    /// Appends a version. Callers append in commit order.
    pub fn push(&mut self, version: Version) {
        self.versions.push(version);
    }

    /// The newest version regardless of any read view.
    pub fn latest(&self) -> Option<&Version> {
        self.versions.last()
    }

    pub fn visible_version(&self, view: ReadView) -> VisibilityResult<'_> {
        Visibility::visible_version(self, view)
    }
}
