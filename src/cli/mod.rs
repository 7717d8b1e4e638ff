//! CLI module for tabletgate
//!
//! Provides command-line interface for:
//! - start: Boot the gateway over a local cluster and serve
//! - check: Validate a configuration file

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{boot, check, run_command, start, ConfigSummary, TabletSummary};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    run_command(Cli::parse_args().command)
}
