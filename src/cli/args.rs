//! CLI argument definitions using clap
//!
//! Commands:
//! - snapvault init --config <path>
//! - snapvault run --config <path>
//! - snapvault backup --config <path> --job <name>
//! - snapvault sweep --config <path>
//! - snapvault volume-snapshot --config <path>
//! - snapvault restore --config <path> --job <name> [--key K | --before T]
//!   [--recover-to T --changelog-dir D --apply-command C] --data-dir D
//!   --stop-command C --start-command C [--health-command C] [--load-command C]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// snapvault - scheduled backups, immutable archives, operator-driven restore
#[derive(Parser, Debug)]
#[command(name = "snapvault")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate configuration and create the local directories
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./snapvault.json")]
        config: PathBuf,
    },

    /// Run the scheduler loop (backups, sweeps, volume snapshots)
    Run {
        /// Path to configuration file
        #[arg(long, default_value = "./snapvault.json")]
        config: PathBuf,
    },

    /// Execute one backup run of a named job and exit
    Backup {
        /// Path to configuration file
        #[arg(long, default_value = "./snapvault.json")]
        config: PathBuf,

        /// Job name from the configuration
        #[arg(long)]
        job: String,
    },

    /// Run one retention sweep over every job's prefix and exit
    Sweep {
        /// Path to configuration file
        #[arg(long, default_value = "./snapvault.json")]
        config: PathBuf,
    },

    /// Execute every volume snapshot plan once and exit
    VolumeSnapshot {
        /// Path to configuration file
        #[arg(long, default_value = "./snapvault.json")]
        config: PathBuf,
    },

    /// Restore a logical store from an artifact (operator-driven)
    Restore {
        /// Path to configuration file
        #[arg(long, default_value = "./snapvault.json")]
        config: PathBuf,

        /// Job name from the configuration
        #[arg(long)]
        job: String,

        /// Exact artifact key to restore from
        #[arg(long, conflicts_with = "before")]
        key: Option<String>,

        /// Restore from the latest artifact at or before this RFC3339 time
        #[arg(long)]
        before: Option<String>,

        /// Point-in-time recovery target (RFC3339)
        #[arg(long)]
        recover_to: Option<String>,

        /// Directory of retained change-log segments (PITR only)
        #[arg(long)]
        changelog_dir: Option<PathBuf>,

        /// Engine data directory (swapped for native snapshots)
        #[arg(long)]
        data_dir: PathBuf,

        /// Shell command that stops the engine
        #[arg(long)]
        stop_command: String,

        /// Shell command that starts the engine
        #[arg(long)]
        start_command: String,

        /// Shell command whose exit status is the engine health check
        #[arg(long)]
        health_command: Option<String>,

        /// Shell command that loads a logical dump from stdin (sql engines)
        #[arg(long)]
        load_command: Option<String>,

        /// Shell command that applies one change-log entry from stdin (PITR)
        #[arg(long)]
        apply_command: Option<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
