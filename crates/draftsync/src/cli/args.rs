//! Command-line argument structures and enums

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "draftsync")]
#[command(version)]
#[command(about = "Keep a locally edited draft in step with its remote copy", long_about = None)]
pub struct Cli {
    /// Use a config file other than the default one
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize draftsync configuration
    Init {
        /// URL of the remote copy (must support ETag validators)
        #[arg(short, long)]
        remote: Option<String>,

        /// File holding the local draft (default: ~/draftsync/draft.html)
        #[arg(short, long)]
        document: Option<PathBuf>,

        /// Bearer token sent with every request
        #[arg(long)]
        token: Option<String>,
    },

    /// Show local and remote state of the draft
    Status {
        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },

    /// Save the draft locally and reconcile it with the remote copy
    Sync {
        /// Overwrite the remote copy with the local draft
        #[arg(long, conflicts_with = "force_remote")]
        force_local: bool,

        /// Replace the local draft with the remote copy
        #[arg(long)]
        force_remote: bool,
    },

    /// Show what differs between the local draft and the remote copy
    Diff {
        /// Write the marked-up review to a file instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Resolve a conflict between the local draft and the remote copy
    Resolve {
        /// Which version to keep
        choice: ResolveChoice,

        /// Merged content (a review written by `diff --output`, possibly edited)
        #[arg(short, long, required_if_eq("choice", "merged"))]
        file: Option<PathBuf>,
    },

    /// Watch the draft: autosave, periodic reconcile, offline handling
    Watch {
        /// Seconds between reconcile checks while idle
        #[arg(long, default_value_t = 30)]
        interval: u64,

        /// Only save locally, never contact the remote
        #[arg(long)]
        offline: bool,
    },

    /// Show or change configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the current configuration
    Show,

    /// Set the remote URL
    Remote {
        /// URL of the remote copy
        url: String,
    },

    /// Set the autosave debounce interval
    Autosave {
        /// Interval in milliseconds
        interval_ms: u64,

        /// Disable saving to the remote during autosave
        #[arg(long)]
        local_only: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ResolveChoice {
    /// Keep the local draft and overwrite the remote copy
    Local,
    /// Keep the remote copy and replace the local draft
    Remote,
    /// Save merged content and push it
    Merged,
}
