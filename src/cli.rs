//! Command-line interface for Vigil
//!
//! Uses clap with derive for type-safe CLI parsing

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Vigil - heartbeat-based process supervisor
#[derive(Parser)]
#[command(name = "vigil")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "vigil.toml")]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run one check cycle over all enabled processes (cron mode)
    Check,

    /// Start a process
    On {
        /// Process key
        process: String,
    },

    /// Stop a process (killed via its heartbeat PID)
    Off {
        /// Process key
        process: String,
    },

    /// Run the configured recovery actions for a process
    Restart {
        /// Process key
        process: String,
    },

    /// Start all enabled processes
    StartAll,

    /// Stop all enabled processes
    StopAll,

    /// Show current health of all enabled processes
    Status {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Open the interactive dashboard
    Menu,

    /// Show or manage the crontab entry
    Cron {
        #[command(subcommand)]
        action: Option<CronAction>,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Actions for the cron command
#[derive(Subcommand)]
pub enum CronAction {
    /// Print the crontab line (default)
    Show,

    /// Add the entry to the current user's crontab
    Install,

    /// Remove the entry from the current user's crontab
    Remove,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Generate shell completion scripts
    pub fn generate_completion(shell: Shell) {
        let mut cmd = Self::command();
        clap_complete::generate(shell, &mut cmd, "vigil", &mut std::io::stdout());
    }
}
