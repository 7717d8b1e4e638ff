//! HTTP introspection server
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `/debug/vars` - Health-check connections, reload and gateway counters
//! - `/debug/tablets` - Known tablets and their state

pub mod config;
pub mod introspection_routes;
pub mod server;

pub use config::HttpServerConfig;
pub use server::HttpServer;
