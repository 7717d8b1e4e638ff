//! Tablet health checking
//!
//! - [`monitor`] - one probing task per tablet
//! - [`HealthRegistry`] - latest status of every tablet
//! - [`HealthCheck`] - tablet lifecycle: add, remove, shutdown
//!
//! Monitors never talk to each other; everything flows through the registry.

mod check;
mod errors;
pub mod monitor;
mod registry;
mod status;

pub use check::HealthCheck;
pub use errors::{HealthCheckError, HealthCheckResult};
pub use monitor::MonitorConfig;
pub use registry::{HealthRegistry, RegistrySnapshot};
pub use status::TabletHealth;
