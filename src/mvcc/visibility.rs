//! Visibility - Snapshot isolation rule
//!
//! Given a read view `R` and a chain `V₀ … Vₙ`:
//! 1. Consider only versions with `V.commit_id ≤ R.read_upper_bound`
//! 2. Of those, take the one with the largest commit_id
//! 3. If it is a tombstone the row is invisible
//!
//! Visibility depends on nothing else: not on wall-clock time, not on which
//! thread asks, not on how far replication has progressed.

use super::{ReadView, Version, VersionChain};

/// Result of visibility evaluation for one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibilityResult<'a> {
    Visible(&'a Version),
    Invisible,
}

impl<'a> VisibilityResult<'a> {
    pub fn version(&self) -> Option<&'a Version> {
        match self {
            VisibilityResult::Visible(v) => Some(v),
            VisibilityResult::Invisible => None,
        }
    }

    pub fn is_visible(&self) -> bool {
        matches!(self, VisibilityResult::Visible(_))
    }
}

/// Stateless visibility resolver.
pub struct Visibility;

impl Visibility {
    pub fn visible_version<'a>(chain: &'a VersionChain, view: ReadView) -> VisibilityResult<'a> {
        let upper_bound = view.upper_bound();

        let visible = chain
            .versions()
            .iter()
            .filter(|v| v.commit_id() <= upper_bound)
            .max_by_key(|v| v.commit_id());

        match visible {
            Some(version) if !version.is_tombstone() => VisibilityResult::Visible(version),
            _ => VisibilityResult::Invisible,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mvcc::CommitId;
    use crate::query::{Row, Value};

    fn make_version(id: i64, email: &str, commit: u64) -> Version {
        Version::with_row(
            Value::Int64(id),
            Row::new(vec![Value::Int64(id), Value::from(email)]),
            CommitId::new(commit),
        )
    }

    fn make_tombstone(id: i64, commit: u64) -> Version {
        Version::with_tombstone(Value::Int64(id), CommitId::new(commit))
    }

    fn chain_of(versions: Vec<Version>) -> VersionChain {
        let mut chain = VersionChain::new(versions[0].key().clone());
        for v in versions {
            chain.push(v);
        }
        chain
    }

    #[test]
    fn test_selects_largest_commit_within_bound() {
        let chain = chain_of(vec![
            make_version(1, "v1", 10),
            make_version(1, "v2", 20),
            make_version(1, "v3", 30),
        ]);

        let result = Visibility::visible_version(&chain, ReadView::new(CommitId::new(25)));
        assert_eq!(result.version().unwrap().commit_id(), CommitId::new(20));
    }

    #[test]
    fn test_excludes_commits_after_view() {
        let chain = chain_of(vec![make_version(1, "v1", 50)]);
        let result = Visibility::visible_version(&chain, ReadView::new(CommitId::new(30)));
        assert!(!result.is_visible());
    }

    #[test]
    fn test_empty_chain_invisible() {
        let chain = VersionChain::new(Value::Int64(1));
        let result = Visibility::visible_version(&chain, ReadView::new(CommitId::new(100)));
        assert_eq!(result, VisibilityResult::Invisible);
    }

    #[test]
    fn test_tombstone_hides_row() {
        let chain = chain_of(vec![make_version(1, "v1", 10), make_tombstone(1, 20)]);
        assert!(!Visibility::visible_version(&chain, ReadView::new(CommitId::new(25))).is_visible());
    }

    #[test]
    fn test_tombstone_after_view_keeps_older_row() {
        let chain = chain_of(vec![make_version(1, "v1", 10), make_tombstone(1, 30)]);
        let result = Visibility::visible_version(&chain, ReadView::new(CommitId::new(25)));
        assert_eq!(result.version().unwrap().commit_id(), CommitId::new(10));
    }

    #[test]
    fn test_same_view_same_result() {
        let chain = chain_of(vec![make_version(1, "v1", 10), make_version(1, "v2", 20)]);
        let view = ReadView::new(CommitId::new(15));
        assert_eq!(
            Visibility::visible_version(&chain, view),
            Visibility::visible_version(&chain, view)
        );
    }
}
