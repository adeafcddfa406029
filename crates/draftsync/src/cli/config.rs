//! Config command handlers

use draftsync_core::config::Config;

use super::args::ConfigCommands;
use super::util::ConfigLocation;

pub fn handle_config_command(
    command: Option<ConfigCommands>,
    config: Config,
    location: &ConfigLocation,
) -> bool {
    match command {
        None | Some(ConfigCommands::Show) => {
            show_config(&config, location);
            true
        }
        Some(ConfigCommands::Remote { url }) => {
            let mut config = config;
            config.remote_url = Some(url.clone());
            save(&config, location, &format!("Remote URL: {}", url))
        }
        Some(ConfigCommands::Autosave {
            interval_ms,
            local_only,
        }) => {
            let mut config = config;
            config.autosave_interval_ms = interval_ms;
            config.remote_autosave = !local_only;
            save(
                &config,
                location,
                &format!(
                    "Autosave: every {} ms{}",
                    interval_ms,
                    if local_only { " (local only)" } else { "" }
                ),
            )
        }
    }
}

/// Show the draftsync configuration
fn show_config(config: &Config, location: &ConfigLocation) {
    println!("Draftsync Configuration");
    println!("=======================");
    println!(
        "Remote URL: {}",
        config.remote_url.as_deref().unwrap_or("(not set)")
    );
    println!("Document key: {}", config.document_key);
    println!("Draft file: {}", config.document_path.display());
    println!("Item store: {}", config.store_dir.display());
    println!(
        "Autosave: every {} ms ({})",
        config.autosave_interval_ms,
        if config.remote_autosave {
            "local and remote"
        } else {
            "local only"
        }
    );
    println!("Media type: {}", config.media_type);
    println!(
        "Session: {}",
        if config.session_token.is_some() {
            "token set"
        } else {
            "(anonymous)"
        }
    );
    println!("Config file: {}", location.display());
}

fn save(config: &Config, location: &ConfigLocation, change: &str) -> bool {
    match location.save(config) {
        Ok(()) => {
            println!("✓ Updated configuration");
            println!("  {}", change);
            true
        }
        Err(e) => {
            eprintln!("✗ Error saving config: {}", e);
            false
        }
    }
}
