//! Role resolution and topology reload accounting

mod counters;
mod resolver;

pub use counters::{ReloadCounters, ReloadCountersSnapshot};
pub use resolver::{ResolverHandle, RoleResolver};
