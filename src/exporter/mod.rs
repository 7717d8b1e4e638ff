//! Metrics exporter
//!
//! Typed introspection output built from registry snapshots and counters.
//! Serialized as JSON by the HTTP introspection routes.

mod debug_vars;
mod tablets;

pub use debug_vars::{ConnectionDescriptor, DebugVars, ServingCounts};
pub use tablets::TabletRow;
