//! Watch command handler.
//!
//! Polls the draft file for edits and feeds them to the autosave scheduler.
//! A periodic check reconciles with the remote; a transient failure takes the
//! watcher offline (local autosave only) until a later check gets through.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use draftsync_core::config::Config;
use draftsync_core::events::SyncEvent;
use draftsync_core::{
    AutosaveScheduler, NetworkMonitor, PersistMethod, ReconcileOptions, Result, Snapshot,
    SyncOrchestrator,
};

use super::util::{open_orchestrator, report_error, runtime, short};

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Handle the watch command - run until Ctrl+C.
pub fn handle_watch(config: &Config, interval_secs: u64, offline: bool) -> bool {
    let Some(runtime) = runtime() else {
        return false;
    };
    match runtime.block_on(watch(config, Duration::from_secs(interval_secs.max(1)), offline)) {
        Ok(()) => true,
        Err(e) => {
            report_error(&e);
            false
        }
    }
}

async fn watch(config: &Config, check_interval: Duration, offline: bool) -> Result<()> {
    let key = config.document_key.as_str();
    let orchestrator = open_orchestrator(config)?;
    orchestrator.events().subscribe(Arc::new(print_event));

    let scheduler = Arc::new(AutosaveScheduler::new(Arc::clone(&orchestrator)));
    scheduler.enable(key, PersistMethod::Local, config.autosave_interval());

    let use_remote = !offline && config.remote_autosave && config.remote_url().is_ok();
    let monitor = NetworkMonitor::new(Arc::clone(&orchestrator), Arc::clone(&scheduler), false);
    if use_remote {
        monitor.track(key, config.autosave_interval());
    }

    println!("Watching {}", config.document_path.display());
    match config.remote_url.as_deref() {
        Some(url) if use_remote => println!("  Remote: {}", url),
        _ => println!("  Remote: (local only)"),
    }
    println!("  Press Ctrl+C to stop");
    println!();

    let mut last_digest = draft_digest(&config.document_path);
    let mut poll = tokio::time::interval(POLL_INTERVAL);
    let mut check = tokio::time::interval(check_interval);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                println!("\nStopping watch...");
                break;
            }
            _ = poll.tick() => {
                let digest = draft_digest(&config.document_path);
                if digest != last_digest {
                    log::debug!("[watch] Draft changed");
                    last_digest = digest;
                    scheduler.notify_edit(key);
                }
            }
            _ = check.tick(), if use_remote => {
                check_remote(&orchestrator, &monitor, key).await;
            }
        }
    }

    // Keep whatever was typed since the last debounce.
    scheduler.disable(key, PersistMethod::Local, true).await?;
    if use_remote && monitor.is_online() {
        scheduler.disable(key, PersistMethod::Remote, true).await?;
    }
    Ok(())
}

/// Reconcile once, moving between online and offline as the result says.
async fn check_remote(orchestrator: &SyncOrchestrator, monitor: &NetworkMonitor, key: &str) {
    if monitor.is_online() {
        if let Err(e) = orchestrator.reconcile(key, ReconcileOptions::default()).await
            && e.is_transient()
        {
            monitor.on_transition(false).await;
        }
        return;
    }

    // Offline: try a pass first so a still-unreachable remote stays quiet.
    match orchestrator.reconcile(key, ReconcileOptions::default()).await {
        Err(e) if e.is_transient() => {
            log::debug!("[watch] Still offline: {}", e);
        }
        _ => {
            for (key, result) in monitor.on_transition(true).await {
                if let Err(e) = result {
                    log::warn!("[watch] Reconcile of {} after reconnect failed: {}", key, e);
                }
            }
        }
    }
}

fn draft_digest(path: &Path) -> Option<String> {
    std::fs::read_to_string(path)
        .ok()
        .map(|content| Snapshot::from_content(&content).digest)
}

fn print_event(event: &SyncEvent) {
    match event {
        SyncEvent::LocalSaved { digest, method, .. } => {
            println!("  Saved {} ({})", short(digest), method)
        }
        SyncEvent::Pushed { .. } => println!("✓ Pushed local changes"),
        SyncEvent::Pulled { digest, .. } => println!("✓ Pulled remote changes ({})", short(digest)),
        SyncEvent::ReviewRequired {
            added,
            removed,
            message,
            ..
        } => {
            println!("! Both copies changed (+{} -{})", added, removed);
            if let Some(message) = message {
                println!("  {}", message);
            }
            println!("  Remote saving is paused. Resolve with: draftsync resolve local|remote");
        }
        SyncEvent::ReviewResolved { resolution, .. } => {
            println!("✓ Conflict resolved ({})", resolution)
        }
        SyncEvent::SyncFailed { message, .. } => eprintln!("✗ {}", message),
        SyncEvent::ConnectivityChanged { online } => {
            if *online {
                println!("✓ Back online");
            } else {
                println!("! Offline, saving locally only");
            }
        }
        SyncEvent::StateChanged { .. } => {}
    }
}
