//! Multi-version row storage primitives
//!
//! - `CommitId` - total order of commits, assigned by the primary
//! - `Version` / `VersionChain` - immutable row history
//! - `ReadView` - snapshot boundary fixed at transaction begin
//! - `Visibility` - the snapshot isolation rule
//!
//! Tablets use these to give each transaction a stable snapshot while
//! replicated commits keep arriving underneath it.

mod commit_id;
mod read_view;
mod version;
mod version_chain;
mod visibility;

pub use commit_id::CommitId;
pub use read_view::ReadView;
pub use version::{Version, VersionPayload};
pub use version_chain::VersionChain;
pub use visibility::{Visibility, VisibilityResult};
