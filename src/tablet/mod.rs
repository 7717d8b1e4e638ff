//! Tablet backends
//!
//! - [`TabletBackend`] - the contract the gateway routes through
//! - [`MemoryTablet`] - in-process MVCC tablet with replication
//! - [`LocalCluster`] - a primary and its replicas wired together

mod backend;
mod cluster;
mod errors;
mod memory;
pub mod sql;

pub use backend::{ProbeResponse, TabletBackend, TransactionId};
pub use cluster::LocalCluster;
pub use errors::{TabletError, TabletResult};
pub use memory::MemoryTablet;
