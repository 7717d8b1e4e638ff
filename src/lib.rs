//! tabletgate - tablet health checking and routing gateway
//!
//! Continuously probes the tablets of a shard, keeps a registry of which
//! tablet serves in which role, exposes that view for routing and
//! introspection, and pins transactions to a tablet snapshot so replica
//! reads stay consistent until commit.
//!
//! Data flow: monitors -> registry -> resolver -> exporter / sessions.

pub mod cli;
pub mod config;
pub mod exporter;
pub mod gateway;
pub mod healthcheck;
pub mod http_server;
pub mod mvcc;
pub mod observability;
pub mod query;
pub mod resolver;
pub mod session;
pub mod tablet;
pub mod topology;
