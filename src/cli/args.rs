//! CLI argument definitions using clap
//!
//! Commands:
//! - tabletgate start --config <path>
//! - tabletgate check --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// tabletgate - tablet health checking and routing gateway
#[derive(Parser, Debug)]
#[command(name = "tabletgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Boot the local cluster, health checking, HTTP introspection and a SQL console on stdin
    Start {
        /// Path to configuration file
        #[arg(long, default_value = "./tabletgate.json")]
        config: PathBuf,
    },

    /// Validate a configuration file and print a summary
    Check {
        /// Path to configuration file
        #[arg(long, default_value = "./tabletgate.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
