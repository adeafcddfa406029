//! Status, sync, diff and resolve command handlers.
//!
//! Every command runs in its own process, so a paused review does not survive
//! between invocations. `resolve` therefore runs a fresh reconcile pass first;
//! if the copies still conflict, the review it opens is resolved right away.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use draftsync_core::config::Config;
use draftsync_core::credentials::{CredentialProvider, StaticCredentials};
use draftsync_core::decision::pending_digest;
use draftsync_core::diff::render::accept_edited;
use draftsync_core::remote::{ConditionalClient, FetchStatus, HttpTransport};
use draftsync_core::{
    DiffToken, PersistMethod, ReconcileOptions, ReconcileOutcome, Resolution, Result,
    ReviewSession, Snapshot, SyncError, SyncOrchestrator,
};

use super::args::ResolveChoice;
use super::util::{open_orchestrator, print_outcome, report_error, runtime, short};

/// Handle the status command - show local and remote state without contacting the remote.
pub fn handle_status(config: &Config, json: bool) -> bool {
    let Some(runtime) = runtime() else {
        return false;
    };

    let result = runtime.block_on(async {
        let orchestrator = open_orchestrator(config)?;
        let key = &config.document_key;
        let latest = orchestrator.store().latest_item(key).await?;
        let state = orchestrator.store().sync_state(key).await?;
        let draft = read_draft(&config.document_path)?;
        Ok::<_, SyncError>((latest, state, draft))
    });

    let (latest, state, draft) = match result {
        Ok(parts) => parts,
        Err(e) => {
            report_error(&e);
            return false;
        }
    };

    let common = state.as_ref().and_then(|s| s.common_digest.as_deref());
    let pending = pending_digest(latest.as_ref(), common).is_some();
    let unsaved = latest
        .as_ref()
        .map_or(!draft.content.is_empty(), |item| item.digest != draft.digest);

    if json {
        let status = serde_json::json!({
            "document": config.document_path,
            "remote": config.remote_url.as_deref(),
            "latest": latest.as_ref().map(|item| serde_json::json!({
                "digest": item.digest,
                "saved": item.created_at,
                "published": item.published_at,
            })),
            "sync": state,
            "pending": pending,
            "unsaved": unsaved,
        });
        match serde_json::to_string_pretty(&status) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("✗ Could not serialize status: {}", e);
                return false;
            }
        }
        return true;
    }

    println!("Draft Status");
    println!("============");
    println!();
    println!("Draft: {}", config.document_path.display());
    println!(
        "Remote: {}",
        config.remote_url.as_deref().unwrap_or("(not configured)")
    );

    match &latest {
        Some(item) => println!(
            "Latest snapshot: {} saved {} ({})",
            short(&item.digest),
            item.created_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S"),
            if item.is_published() { "published" } else { "local only" }
        ),
        None => println!("Latest snapshot: (none)"),
    }

    match &state {
        Some(state) if state.has_common_state() => {
            println!(
                "Last sync: {}",
                state
                    .synced_at
                    .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "(unknown)".to_string())
            );
            println!("  ETag: {}", state.etag.as_deref().unwrap_or("(none)"));
            if let Some(digest) = &state.common_digest {
                println!("  Shared content: {}", short(digest));
            }
        }
        _ => println!("Last sync: (never)"),
    }

    println!();
    if unsaved {
        println!("The draft has edits that are not saved yet. Save and sync with:");
        println!("  draftsync sync");
    } else if pending {
        println!("Local changes are waiting to be pushed:");
        println!("  draftsync sync");
    } else {
        println!("Nothing pending locally.");
    }
    true
}

/// Handle the sync command - save the draft and reconcile it.
pub fn handle_sync(config: &Config, force_local: bool, force_remote: bool) -> bool {
    let options = if force_local {
        ReconcileOptions::force_local()
    } else if force_remote {
        ReconcileOptions::force_remote()
    } else {
        ReconcileOptions::default()
    };

    let Some(runtime) = runtime() else {
        return false;
    };
    let result = runtime.block_on(async {
        let orchestrator = open_orchestrator(config)?;
        save_draft(&orchestrator, config).await?;
        orchestrator.reconcile(&config.document_key, options).await
    });

    match result {
        Ok(outcome) => print_outcome(&outcome),
        Err(e) => {
            report_error(&e);
            false
        }
    }
}

/// Handle the diff command - compare the draft with the remote copy.
///
/// Only reads: nothing is saved, pushed or pulled.
pub fn handle_diff(config: &Config, output: Option<PathBuf>) -> bool {
    let Some(runtime) = runtime() else {
        return false;
    };
    let review = match runtime.block_on(fetch_review(config)) {
        Ok(Some(review)) => review,
        Ok(None) => {
            println!("The remote copy does not exist yet. Create it with:");
            println!("  draftsync sync");
            return true;
        }
        Err(e) => {
            report_error(&e);
            return false;
        }
    };

    if !review.has_changes() {
        println!("✓ The draft matches the remote copy");
        return true;
    }

    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, review.render_html()) {
                eprintln!("✗ Could not write {}: {}", path.display(), e);
                return false;
            }
            println!("✓ Wrote review ({}) to {}", review.stats(), path.display());
            println!();
            println!("Edit it, then keep the result with:");
            println!("  draftsync resolve merged --file {}", path.display());
        }
        None => {
            println!("{}", format_tokens(&review.tokens));
            println!();
            println!("{} (+ local only, - remote only)", review.stats());
        }
    }
    true
}

/// Handle the resolve command - end a conflict with the chosen resolution.
pub fn handle_resolve(config: &Config, choice: ResolveChoice, file: Option<PathBuf>) -> bool {
    let resolution = match (choice, file) {
        (ResolveChoice::Local, _) => Resolution::KeepLocal,
        (ResolveChoice::Remote, _) => Resolution::KeepRemote,
        (ResolveChoice::Merged, Some(path)) => match std::fs::read_to_string(&path) {
            Ok(rendered) => Resolution::AcceptMerged {
                content: accept_edited(&rendered),
            },
            Err(e) => {
                eprintln!("✗ Could not read {}: {}", path.display(), e);
                return false;
            }
        },
        (ResolveChoice::Merged, None) => {
            eprintln!("✗ A merged resolution needs --file <review.html>");
            return false;
        }
    };

    let Some(runtime) = runtime() else {
        return false;
    };
    match runtime.block_on(resolve(config, resolution)) {
        Ok(Some(outcome)) => print_outcome(&outcome),
        Ok(None) => {
            println!("  No conflict to resolve");
            true
        }
        Err(e) => {
            report_error(&e);
            false
        }
    }
}

/// Fetch the remote copy and diff the draft against it.
async fn fetch_review(config: &Config) -> Result<Option<ReviewSession>> {
    let url = config.remote_url()?;
    let draft = read_draft(&config.document_path)?;
    let fetched = open_client(config).fetch_with_validator(url, None).await?;
    if fetched.status == FetchStatus::NotFound {
        return Ok(None);
    }
    Ok(Some(ReviewSession::open(
        &config.document_key,
        &draft.content,
        fetched.body.as_deref().unwrap_or_default(),
        fetched.etag,
    )))
}

/// Reopen the review with a fresh pass, then resolve it.
///
/// Returns `None` when the copies no longer conflict.
async fn resolve(config: &Config, resolution: Resolution) -> Result<Option<ReconcileOutcome>> {
    let orchestrator = open_orchestrator(config)?;
    save_draft(&orchestrator, config).await?;

    let key = &config.document_key;
    match orchestrator.reconcile(key, ReconcileOptions::default()).await? {
        ReconcileOutcome::NeedsReview(_) => {
            let outcome = orchestrator.resolve_review(key, resolution).await?;
            Ok(Some(outcome))
        }
        outcome => {
            print_outcome(&outcome);
            Ok(None)
        }
    }
}

async fn save_draft(orchestrator: &SyncOrchestrator, config: &Config) -> Result<()> {
    if let Some(item) = orchestrator
        .save_local_snapshot(&config.document_key, PersistMethod::Local)
        .await?
    {
        log::debug!("[cli] Saved draft snapshot {}", short(&item.digest));
    }
    Ok(())
}

fn open_client(config: &Config) -> ConditionalClient {
    let credentials: Arc<dyn CredentialProvider> = match &config.session_token {
        Some(token) => Arc::new(StaticCredentials::bearer(token)),
        None => Arc::new(StaticCredentials::anonymous()),
    };
    ConditionalClient::new(Arc::new(HttpTransport::new()), credentials)
}

fn read_draft(path: &Path) -> Result<Snapshot> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Snapshot::from_content(&content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Snapshot::from_content("")),
        Err(e) => Err(SyncError::FileRead {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Inline diff for the terminal: `[+added+]` and `[-removed-]`.
fn format_tokens(tokens: &[DiffToken]) -> String {
    let mut out = String::new();
    for token in tokens {
        if token.added {
            out.push_str("[+");
            out.push_str(&token.text);
            out.push_str("+]");
        } else if token.removed {
            out.push_str("[-");
            out.push_str(&token.text);
            out.push_str("-]");
        } else {
            out.push_str(&token.text);
        }
    }
    out
}
