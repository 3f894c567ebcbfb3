//! CLI module for snapvault
//!
//! Provides command-line interface for:
//! - init: validate config, create local directories
//! - run: scheduler loop (backups, sweeps, volume snapshots)
//! - backup: one-shot run of a named job
//! - sweep: one retention sweep over every job prefix
//! - volume-snapshot: execute every volume plan once
//! - restore: operator-driven restore, optionally point-in-time

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{backup, init, restore, run, run_command, sweep, volume_snapshot, RestoreArgs};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};
