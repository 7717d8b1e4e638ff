//! Topology vocabulary: tablet identity, role, and placement

mod alias;
mod errors;
mod tablet;
mod tablet_type;

pub use alias::TabletAlias;
pub use errors::TopologyError;
pub use tablet::TabletInfo;
pub use tablet_type::TabletType;
