//! Shared CLI utilities

use std::path::PathBuf;
use std::sync::Arc;

use draftsync_core::config::Config;
use draftsync_core::credentials::{CredentialProvider, StaticCredentials};
use draftsync_core::editor::FileEditor;
use draftsync_core::remote::{ConditionalClient, HttpTransport};
use draftsync_core::store::DirItemStore;
use draftsync_core::{ReconcileOutcome, Result, SyncError, SyncOrchestrator};

/// Where the config lives: the default location or a `--config` override.
#[derive(Debug, Clone)]
pub struct ConfigLocation {
    path: Option<PathBuf>,
}

impl ConfigLocation {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// Load the config, falling back to defaults when no file exists yet.
    pub fn load(&self) -> Result<Config> {
        match &self.path {
            Some(path) if path.exists() => Config::load_from(path),
            Some(_) => Ok(Config::default()),
            None => Config::load(),
        }
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        match &self.path {
            Some(path) => config.save_to(path),
            None => config.save(),
        }
    }

    /// Write a config with the given values, keeping the rest of an existing one.
    pub fn init(
        &self,
        remote_url: Option<String>,
        document_path: Option<PathBuf>,
        token: Option<String>,
    ) -> Result<Config> {
        let mut config = match &self.path {
            Some(_) => self.load()?,
            None => Config::init(remote_url.clone(), document_path.clone())?,
        };
        if remote_url.is_some() {
            config.remote_url = remote_url;
        }
        if let Some(path) = document_path {
            config.document_path = path;
        }
        if token.is_some() {
            config.session_token = token;
        }
        self.save(&config)?;
        Ok(config)
    }

    /// Path shown to the user.
    pub fn display(&self) -> String {
        self.path
            .clone()
            .or_else(Config::config_path)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(no config directory)".to_string())
    }
}

/// Wire the orchestrator to the draft file, the item store and the remote.
///
/// The document is registered only when a remote URL is configured, so
/// local-only commands keep working without one.
pub fn open_orchestrator(config: &Config) -> Result<Arc<SyncOrchestrator>> {
    let items = Arc::new(DirItemStore::open(&config.store_dir)?);
    let editor = Arc::new(FileEditor::new(&config.document_path));
    let credentials: Arc<dyn CredentialProvider> = match &config.session_token {
        Some(token) => Arc::new(StaticCredentials::bearer(token)),
        None => Arc::new(StaticCredentials::anonymous()),
    };
    let client = ConditionalClient::new(Arc::new(HttpTransport::new()), credentials);

    let orchestrator =
        SyncOrchestrator::new(editor, items, client).with_media_type(&config.media_type);
    if let Ok(url) = config.remote_url() {
        orchestrator.register(&config.document_key, url);
    }
    Ok(Arc::new(orchestrator))
}

/// Create the runtime every async command runs on.
pub fn runtime() -> Option<tokio::runtime::Runtime> {
    match tokio::runtime::Runtime::new() {
        Ok(runtime) => Some(runtime),
        Err(e) => {
            eprintln!("✗ Failed to start async runtime: {}", e);
            None
        }
    }
}

/// Print an error with its suggested next step.
pub fn report_error(err: &SyncError) {
    eprintln!("✗ {}", err.user_message());
    match err {
        SyncError::Unauthenticated { .. } | SyncError::Unauthorized { .. } => {
            eprintln!("  Set a token with: draftsync init --token <token>");
        }
        SyncError::RemoteDeleted { .. } => {
            eprintln!("  Recreate it from your draft with: draftsync sync --force-local");
        }
        SyncError::PreconditionFailed { .. } | SyncError::TransientNetworkFailure { .. } => {
            eprintln!("  Try again with: draftsync sync");
        }
        _ => {}
    }
}

/// Print what a reconcile pass did. Returns false if it needs attention.
pub fn print_outcome(outcome: &ReconcileOutcome) -> bool {
    match outcome {
        ReconcileOutcome::NoOp => println!("✓ Already up to date"),
        ReconcileOutcome::Pulled { digest } => {
            println!("✓ Pulled remote changes ({})", short(digest))
        }
        ReconcileOutcome::Pushed { etag } => match etag {
            Some(etag) => println!("✓ Pushed local changes (ETag {})", etag),
            None => println!("✓ Pushed local changes"),
        },
        ReconcileOutcome::NeedsReview(review) => {
            println!("! Both copies changed ({})", review.stats());
            if let Some(message) = &review.message {
                println!("  {}", message);
            }
            println!();
            println!("Review the differences with:");
            println!("  draftsync diff");
            println!("Then keep one side:");
            println!("  draftsync resolve local | draftsync resolve remote");
            return false;
        }
        ReconcileOutcome::Superseded => println!("  Another sync took over"),
    }
    true
}

/// First characters of a digest, enough to tell versions apart.
pub fn short(digest: &str) -> &str {
    digest.get(..12).unwrap_or(digest)
}
