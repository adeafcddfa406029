//! Command dispatch for the `draftsync` binary.

/// Clap argument definitions
mod args;

/// Config command handlers
mod config;

/// `status`, `sync`, `diff` and `resolve` commands
mod sync;

/// Shared CLI utilities
mod util;

/// `watch` command: autosave and background reconcile
mod watch;

use clap::Parser;
use std::path::PathBuf;

use draftsync_core::config::Config;

pub use args::Cli;
use args::Commands;
use util::ConfigLocation;

/// Main entry point for the CLI
pub fn run_cli() {
    let cli = Cli::parse();
    let location = ConfigLocation::new(cli.config);

    let success = match cli.command {
        Commands::Init {
            remote,
            document,
            token,
        } => handle_init(&location, remote, document, token),

        command => match location.load() {
            Ok(config) => dispatch(command, config, &location),
            Err(e) => {
                eprintln!("✗ Error loading config: {}", e);
                false
            }
        },
    };

    if !success {
        std::process::exit(1);
    }
}

fn dispatch(command: Commands, config: Config, location: &ConfigLocation) -> bool {
    match command {
        Commands::Status { json } => sync::handle_status(&config, json),
        Commands::Sync {
            force_local,
            force_remote,
        } => sync::handle_sync(&config, force_local, force_remote),
        Commands::Diff { output } => sync::handle_diff(&config, output),
        Commands::Resolve { choice, file } => sync::handle_resolve(&config, choice, file),
        Commands::Watch { interval, offline } => watch::handle_watch(&config, interval, offline),
        Commands::Config { command } => config::handle_config_command(command, config, location),
        Commands::Init {
            remote,
            document,
            token,
        } => handle_init(location, remote, document, token),
    }
}

/// Handle the init command
/// Returns true on success, false on error
fn handle_init(
    location: &ConfigLocation,
    remote: Option<String>,
    document: Option<PathBuf>,
    token: Option<String>,
) -> bool {
    let config = match location.init(remote, document, token) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Error initializing config: {}", e);
            return false;
        }
    };

    println!("✓ Initialized draftsync configuration");
    println!("  Draft file: {}", config.document_path.display());
    println!("  Item store: {}", config.store_dir.display());
    match &config.remote_url {
        Some(url) => println!("  Remote: {}", url),
        None => {
            println!("  Remote: (not set)");
            println!();
            println!("Set one before syncing:");
            println!("  draftsync config remote <url>");
        }
    }
    println!("  Config file: {}", location.display());
    true
}
