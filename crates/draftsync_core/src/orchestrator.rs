//! Keeps a locally edited draft and its remote copy in agreement.
//!
//! A reconcile pass reads the latest local snapshot and the known-common
//! state, issues a conditional GET, and lets [`decide`] pick one of
//! pull / push / review / nothing. Passes for the same document are
//! serialized; a newer pass cancels the GET of an older one.
//!
//! ```text
//! Idle -> Checking -> NoOp | Pulling | Pushing | Reviewing -> Idle
//!                  \-> Error
//! ```
//!
//! The local draft is never discarded without the user asking for it: every
//! pass first saves editor content that is newer than the latest item, a
//! failed push leaves the pending item in place, and a conflict pauses until
//! [`SyncOrchestrator::resolve_review`] is called.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::decision::{
    DecisionInput, PushPrecondition, RemoteObservation, SyncDecision, decide, pending_digest,
};
use crate::editor::EditorSurface;
use crate::error::{Result, SyncError};
use crate::events::{EventRegistry, SyncEvent};
use crate::item::{AutoSaveState, DEFAULT_MEDIA_TYPE, LocalDocumentItem, PersistMethod};
use crate::remote::{ConditionalClient, FetchResponse, FetchStatus, Precondition};
use crate::review::{Resolution, ReviewSession};
use crate::session::{DocumentStatus, SyncSession, SyncState};
use crate::snapshot::{Snapshot, Snapshotter};
use crate::store::{DocumentStore, ItemStore};
use crate::sync_state::{DocumentSyncState, RemoteResourceInfo, RemoteStatus};

const STALE_REVIEW_MESSAGE: &str =
    "The remote copy changed again while the conflict was open. Review the new changes.";

/// Options for a reconcile pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Push the local draft without comparing
    pub force_local: bool,
    /// Take the remote copy without comparing
    pub force_remote: bool,
}

impl ReconcileOptions {
    /// Keep the local draft.
    pub fn force_local() -> Self {
        Self {
            force_local: true,
            force_remote: false,
        }
    }

    /// Keep the remote copy.
    pub fn force_remote() -> Self {
        Self {
            force_local: false,
            force_remote: true,
        }
    }
}

/// What a reconcile pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Both sides already agreed
    NoOp,
    /// The remote copy replaced the local draft
    Pulled {
        /// Digest of the pulled content
        digest: String,
    },
    /// The local draft was written to the remote
    Pushed {
        /// Validator returned by the remote
        etag: Option<String>,
    },
    /// Both sides changed; paused until resolved
    NeedsReview(Box<ReviewSession>),
    /// A newer pass for the same document took over
    Superseded,
}

impl ReconcileOutcome {
    /// Short label for logs and CLI output.
    pub fn label(&self) -> &'static str {
        match self {
            ReconcileOutcome::NoOp => "up to date",
            ReconcileOutcome::Pulled { .. } => "pulled",
            ReconcileOutcome::Pushed { .. } => "pushed",
            ReconcileOutcome::NeedsReview(_) => "needs review",
            ReconcileOutcome::Superseded => "superseded",
        }
    }
}

/// Coordinates snapshots, the item store and the remote for a set of documents.
pub struct SyncOrchestrator {
    editor: Arc<dyn EditorSurface>,
    snapshotter: Snapshotter<dyn EditorSurface>,
    store: DocumentStore,
    client: ConditionalClient,
    session: SyncSession,
    events: Arc<EventRegistry>,
    media_type: String,
    remotes: RwLock<HashMap<String, String>>,
}

impl SyncOrchestrator {
    /// Create an orchestrator over the given collaborators.
    pub fn new(
        editor: Arc<dyn EditorSurface>,
        items: Arc<dyn ItemStore>,
        client: ConditionalClient,
    ) -> Self {
        Self {
            snapshotter: Snapshotter::new(Arc::clone(&editor)),
            editor,
            store: DocumentStore::new(items),
            client,
            session: SyncSession::new(),
            events: Arc::new(EventRegistry::new()),
            media_type: DEFAULT_MEDIA_TYPE.to_string(),
            remotes: RwLock::new(HashMap::new()),
        }
    }

    /// Share an event registry with other components.
    pub fn with_events(mut self, events: Arc<EventRegistry>) -> Self {
        self.events = events;
        self
    }

    /// Media type of pushed content.
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = media_type.into();
        self
    }

    /// Associate a document with its remote URL.
    pub fn register(&self, document_key: impl Into<String>, url: impl Into<String>) {
        self.remotes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(document_key.into(), url.into());
    }

    /// Remote URL of a registered document.
    pub fn remote_url(&self, document_key: &str) -> Result<String> {
        self.remotes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(document_key)
            .cloned()
            .ok_or(SyncError::RemoteNotConfigured)
    }

    /// Event registry sync events are emitted on.
    pub fn events(&self) -> &Arc<EventRegistry> {
        &self.events
    }

    /// Typed access to the local item store.
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// In-memory sync context.
    pub fn session(&self) -> &SyncSession {
        &self.session
    }

    /// Current state, cached remote info and review presence.
    pub fn status(&self, document_key: &str) -> DocumentStatus {
        self.session.status(document_key)
    }

    /// The paused review for a document, if any.
    pub fn pending_review(&self, document_key: &str) -> Option<ReviewSession> {
        self.session.review(document_key)
    }

    /// Whether the latest local snapshot has not reached the remote yet.
    pub async fn has_pending_change(&self, document_key: &str) -> Result<bool> {
        let url = self.remote_url(document_key)?;
        let latest = self.store.latest_item(document_key).await?;
        let known = self.known_remote(document_key, &url).await?;
        Ok(pending_digest(latest.as_ref(), known.digest.as_deref()).is_some())
    }

    /// Snapshot the editor and persist it if it changed since the last write
    /// through `method`.
    ///
    /// Returns the latest item when a write was recorded, `None` when
    /// suppressed.
    pub async fn save_local_snapshot(
        &self,
        document_key: &str,
        method: PersistMethod,
    ) -> Result<Option<LocalDocumentItem>> {
        let guard = self.session.guard(document_key);
        let _lock = guard.lock().await;

        let snapshot = self.snapshotter.snapshot(document_key).await?;
        let recorded = self.store.autosave_state(document_key, method).await?;
        if recorded.is_some_and(|state| state.digest == snapshot.digest) {
            log::debug!(
                "[SyncOrchestrator] {} unchanged since last {} save",
                document_key,
                method
            );
            return Ok(None);
        }

        let item = match self.store.latest_item(document_key).await? {
            Some(latest) if latest.digest == snapshot.digest => latest,
            _ => {
                let item = self.new_item(document_key, snapshot);
                self.store.put_item(&item).await?;
                log::info!(
                    "[SyncOrchestrator] Saved {} locally ({})",
                    document_key,
                    short(&item.digest)
                );
                self.events.emit(&SyncEvent::LocalSaved {
                    document_key: document_key.to_string(),
                    digest: item.digest.clone(),
                    method: method.to_string(),
                });
                item
            }
        };

        self.store
            .set_autosave_state(document_key, method, &AutoSaveState::new(&item.digest))
            .await?;
        Ok(Some(item))
    }

    /// Bring the local draft and the remote copy into agreement.
    pub async fn reconcile(
        &self,
        document_key: &str,
        options: ReconcileOptions,
    ) -> Result<ReconcileOutcome> {
        let (generation, cancel) = self.session.begin_pass(document_key);
        let guard = self.session.guard(document_key);
        let _lock = guard.lock().await;

        let result = if cancel.is_cancelled() {
            Ok(ReconcileOutcome::Superseded)
        } else {
            self.run_pass(document_key, options, &cancel).await
        };
        self.session.end_pass(document_key, generation);
        self.settle(document_key, result)
    }

    /// End a paused review with one of the three resolutions.
    pub async fn resolve_review(
        &self,
        document_key: &str,
        resolution: Resolution,
    ) -> Result<ReconcileOutcome> {
        let guard = self.session.guard(document_key);
        let _lock = guard.lock().await;

        if self.session.review(document_key).is_none() {
            return Err(SyncError::NoPendingReview(document_key.to_string()));
        }

        let label = match &resolution {
            Resolution::KeepLocal => "local",
            Resolution::KeepRemote => "remote",
            Resolution::AcceptMerged { .. } => "merged",
        };
        log::info!(
            "[SyncOrchestrator] Resolving review of {} with {}",
            document_key,
            label
        );

        let options = match resolution {
            Resolution::KeepLocal => ReconcileOptions::force_local(),
            Resolution::KeepRemote => ReconcileOptions::force_remote(),
            Resolution::AcceptMerged { content } => {
                let snapshot = Snapshot::from_content(&content);
                self.editor
                    .replace_content(document_key, &snapshot.content)
                    .await?;
                let item = self.new_item(document_key, snapshot);
                self.store.put_item(&item).await?;
                self.events.emit(&SyncEvent::LocalSaved {
                    document_key: document_key.to_string(),
                    digest: item.digest,
                    method: label.to_string(),
                });
                ReconcileOptions::force_local()
            }
        };

        // Resolutions are never superseded by background passes.
        let cancel = CancellationToken::new();
        let result = self.run_pass(document_key, options, &cancel).await;
        let outcome = self.settle(document_key, result)?;

        if matches!(
            outcome,
            ReconcileOutcome::Pushed { .. } | ReconcileOutcome::Pulled { .. }
        ) {
            self.events.emit(&SyncEvent::ReviewResolved {
                document_key: document_key.to_string(),
                resolution: label.to_string(),
            });
        }
        Ok(outcome)
    }

    fn settle(
        &self,
        document_key: &str,
        result: Result<ReconcileOutcome>,
    ) -> Result<ReconcileOutcome> {
        match &result {
            Ok(ReconcileOutcome::Superseded) => {
                log::debug!("[SyncOrchestrator] Pass for {} superseded", document_key);
            }
            Ok(outcome) => {
                log::info!("[SyncOrchestrator] {}: {}", document_key, outcome.label());
                self.session.set_last_error(document_key, None);
            }
            Err(err) => {
                log::warn!("[SyncOrchestrator] {} failed: {}", document_key, err);
                self.transition(document_key, SyncState::Error);
                self.session
                    .set_last_error(document_key, Some(err.user_message()));
                self.events.emit(&SyncEvent::SyncFailed {
                    document_key: document_key.to_string(),
                    message: err.user_message(),
                    action: err.user_action(),
                });
            }
        }
        result
    }

    async fn run_pass(
        &self,
        document_key: &str,
        options: ReconcileOptions,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome> {
        let url = self.remote_url(document_key)?;

        if options.force_local {
            return self.force_local(document_key, &url).await;
        }
        if options.force_remote {
            return self.force_remote(document_key, &url, cancel).await;
        }

        match self.reconcile_once(document_key, &url, cancel).await {
            Err(SyncError::PreconditionFailed { .. }) => {
                log::info!(
                    "[SyncOrchestrator] {} changed remotely during push, checking again",
                    document_key
                );
                self.reconcile_once(document_key, &url, cancel).await
            }
            other => other,
        }
    }

    async fn reconcile_once(
        &self,
        document_key: &str,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome> {
        let latest = self.capture_editor(document_key).await?;
        let known = self.known_remote(document_key, url).await?;
        let common = known.digest.as_deref();
        let pending = pending_digest(latest.as_ref(), common);

        self.transition(document_key, SyncState::Checking);
        let Some(fetched) = self
            .fetch(url, known.etag.as_deref(), cancel)
            .await?
        else {
            return Ok(ReconcileOutcome::Superseded);
        };

        let remote_snapshot = fetched.body.as_deref().map(Snapshot::from_content);
        let observation = match (fetched.status, &remote_snapshot) {
            (FetchStatus::Modified, Some(snapshot)) => RemoteObservation::Fetched {
                digest: &snapshot.digest,
                etag: fetched.etag.as_deref(),
            },
            (FetchStatus::NotModified, _) => RemoteObservation::NotModified,
            _ => RemoteObservation::NotFound,
        };

        let decision = decide(&DecisionInput {
            pending_digest: pending,
            local_digest: latest.as_ref().map(|item| item.digest.as_str()),
            common_digest: common,
            known_etag: known.etag.as_deref(),
            remote: observation,
        });

        let decision = match decision {
            Ok(decision) => decision,
            Err(_) => {
                self.session.set_remote_info(
                    document_key,
                    RemoteResourceInfo {
                        etag: None,
                        date: fetched.date,
                        status: RemoteStatus::Missing,
                        ..known
                    },
                );
                return Err(SyncError::RemoteDeleted {
                    url: url.to_string(),
                });
            }
        };
        log::debug!("[SyncOrchestrator] {}: {:?}", document_key, decision);

        match decision {
            SyncDecision::NoOp => {
                let info = match remote_snapshot {
                    Some(snapshot) => RemoteResourceInfo {
                        url: url.to_string(),
                        etag: fetched.etag,
                        last_modified: fetched.last_modified,
                        date: fetched.date,
                        digest: Some(snapshot.digest),
                        status: RemoteStatus::Fetched,
                    },
                    None => RemoteResourceInfo {
                        date: fetched.date.or(known.date),
                        status: RemoteStatus::NotModified,
                        ..known
                    },
                };
                self.session.set_remote_info(document_key, info);
                self.session.clear_review(document_key);
                self.finish_noop(document_key)
            }
            SyncDecision::PullRemote => {
                let snapshot = remote_snapshot.ok_or_else(|| SyncError::UnhandledStatus {
                    url: url.to_string(),
                    status: 304,
                })?;
                self.pull(document_key, url, snapshot, &fetched).await
            }
            SyncDecision::PushLocal { precondition } => {
                let item = latest.ok_or_else(|| {
                    SyncError::Storage(format!("no local snapshot of '{}'", document_key))
                })?;
                self.push(document_key, url, &item, precondition).await
            }
            SyncDecision::NeedsReview => {
                let local = latest.map(|item| item.content).unwrap_or_default();
                let remote = fetched.body.unwrap_or_default();
                self.open_review(document_key, &local, &remote, fetched.etag, None)
            }
        }
    }

    async fn force_local(&self, document_key: &str, url: &str) -> Result<ReconcileOutcome> {
        let item = self.latest_or_snapshot(document_key).await?;
        let validator = match self.session.review(document_key) {
            Some(review) => review.remote_etag,
            None => self.known_remote(document_key, url).await?.etag,
        };

        match self
            .push(document_key, url, &item, PushPrecondition::if_match(validator.as_deref()))
            .await
        {
            Err(SyncError::PreconditionFailed { .. }) => {
                log::info!(
                    "[SyncOrchestrator] Validator for {} is stale, reopening review",
                    document_key
                );
                let fetched = self.fetch_required(url, None).await?;
                match fetched.status {
                    FetchStatus::Modified => self.open_review(
                        document_key,
                        &item.content,
                        fetched.body.as_deref().unwrap_or_default(),
                        fetched.etag,
                        Some(STALE_REVIEW_MESSAGE.to_string()),
                    ),
                    FetchStatus::NotFound => {
                        self.push(document_key, url, &item, PushPrecondition::IfNoneMatchAny)
                            .await
                    }
                    FetchStatus::NotModified => Err(SyncError::PreconditionFailed {
                        url: url.to_string(),
                    }),
                }
            }
            other => other,
        }
    }

    async fn force_remote(
        &self,
        document_key: &str,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome> {
        let review = self.session.review(document_key);
        let validator = review.as_ref().and_then(|r| r.remote_etag.clone());

        self.transition(document_key, SyncState::Checking);
        let Some(fetched) = self.fetch(url, validator.as_deref(), cancel).await? else {
            return Ok(ReconcileOutcome::Superseded);
        };

        match fetched.status {
            FetchStatus::NotModified => {
                let review = review.ok_or_else(|| SyncError::UnhandledStatus {
                    url: url.to_string(),
                    status: 304,
                })?;
                let snapshot = Snapshot {
                    content: review.remote_content,
                    digest: review.remote_digest,
                };
                let fetched = FetchResponse {
                    etag: review.remote_etag,
                    ..fetched
                };
                self.pull(document_key, url, snapshot, &fetched).await
            }
            FetchStatus::Modified => {
                let body = fetched.body.clone().unwrap_or_default();
                let snapshot = Snapshot::from_content(&body);
                match review {
                    Some(review) if review.remote_digest != snapshot.digest => {
                        log::info!(
                            "[SyncOrchestrator] Remote copy of {} moved on since review",
                            document_key
                        );
                        self.open_review(
                            document_key,
                            &review.local_content,
                            &body,
                            fetched.etag,
                            Some(STALE_REVIEW_MESSAGE.to_string()),
                        )
                    }
                    _ => self.pull(document_key, url, snapshot, &fetched).await,
                }
            }
            FetchStatus::NotFound => Err(SyncError::RemoteDeleted {
                url: url.to_string(),
            }),
        }
    }

    async fn pull(
        &self,
        document_key: &str,
        url: &str,
        snapshot: Snapshot,
        fetched: &FetchResponse,
    ) -> Result<ReconcileOutcome> {
        self.transition(document_key, SyncState::Pulling);

        self.editor
            .replace_content(document_key, &snapshot.content)
            .await?;
        let item = self.new_item(document_key, snapshot).published();
        self.store.put_item(&item).await?;

        // The editor now shows the pulled content; don't save it back as an edit.
        for method in [PersistMethod::Local, PersistMethod::Remote] {
            if self
                .store
                .autosave_state(document_key, method)
                .await?
                .is_some()
            {
                self.store
                    .set_autosave_state(document_key, method, &AutoSaveState::new(&item.digest))
                    .await?;
            }
        }

        self.confirm_common(
            document_key,
            url,
            &item.digest,
            fetched.etag.clone(),
            fetched.last_modified,
        )
        .await?;
        self.session.set_remote_info(
            document_key,
            RemoteResourceInfo {
                url: url.to_string(),
                etag: fetched.etag.clone(),
                last_modified: fetched.last_modified,
                date: fetched.date,
                digest: Some(item.digest.clone()),
                status: RemoteStatus::Fetched,
            },
        );
        self.session.clear_review(document_key);

        log::info!(
            "[SyncOrchestrator] Pulled {} ({})",
            document_key,
            short(&item.digest)
        );
        self.events.emit(&SyncEvent::Pulled {
            document_key: document_key.to_string(),
            digest: item.digest.clone(),
        });
        self.transition(document_key, SyncState::Idle);
        Ok(ReconcileOutcome::Pulled {
            digest: item.digest,
        })
    }

    async fn push(
        &self,
        document_key: &str,
        url: &str,
        item: &LocalDocumentItem,
        precondition: PushPrecondition,
    ) -> Result<ReconcileOutcome> {
        self.transition(document_key, SyncState::Pushing);
        log::info!(
            "[SyncOrchestrator] Pushing {} ({}) with {:?}",
            document_key,
            short(&item.digest),
            precondition
        );

        let precondition: Precondition = precondition.into();
        let response = self
            .with_refresh(|| {
                self.client.put_with_precondition(
                    url,
                    &item.content,
                    &item.media_type,
                    precondition.clone(),
                )
            })
            .await?;

        if !self.store.mark_published(document_key, &item.digest).await? {
            log::debug!(
                "[SyncOrchestrator] {} was edited again during push",
                document_key
            );
        }
        self.confirm_common(
            document_key,
            url,
            &item.digest,
            response.etag.clone(),
            response.last_modified,
        )
        .await?;
        self.session.set_remote_info(
            document_key,
            RemoteResourceInfo {
                url: url.to_string(),
                etag: response.etag.clone(),
                last_modified: response.last_modified,
                date: response.date,
                digest: Some(item.digest.clone()),
                status: RemoteStatus::Saved,
            },
        );
        self.session.clear_review(document_key);

        self.events.emit(&SyncEvent::Pushed {
            document_key: document_key.to_string(),
            etag: response.etag.clone(),
        });
        self.transition(document_key, SyncState::Idle);
        Ok(ReconcileOutcome::Pushed {
            etag: response.etag,
        })
    }

    fn open_review(
        &self,
        document_key: &str,
        local: &str,
        remote: &str,
        remote_etag: Option<String>,
        message: Option<String>,
    ) -> Result<ReconcileOutcome> {
        let mut review = ReviewSession::open(document_key, local, remote, remote_etag);
        if !review.has_changes() {
            self.session.clear_review(document_key);
            return self.finish_noop(document_key);
        }
        if let Some(message) = message {
            review = review.with_message(message);
        }

        let stats = review.stats();
        let unchanged = self.session.review(document_key).is_some_and(|open| {
            open.local_content == review.local_content
                && open.remote_digest == review.remote_digest
                && open.message == review.message
        });
        self.session.set_review(document_key, review.clone());
        self.transition(document_key, SyncState::Reviewing);
        if unchanged {
            log::debug!(
                "[SyncOrchestrator] Conflict on {} unchanged, still waiting for review",
                document_key
            );
            return Ok(ReconcileOutcome::NeedsReview(Box::new(review)));
        }

        log::info!(
            "[SyncOrchestrator] Conflict on {} ({}), waiting for review",
            document_key,
            stats
        );
        self.events.emit(&SyncEvent::ReviewRequired {
            document_key: document_key.to_string(),
            added: stats.added,
            removed: stats.removed,
            message: review.message.clone(),
        });
        Ok(ReconcileOutcome::NeedsReview(Box::new(review)))
    }

    fn finish_noop(&self, document_key: &str) -> Result<ReconcileOutcome> {
        self.transition(document_key, SyncState::NoOp);
        self.transition(document_key, SyncState::Idle);
        Ok(ReconcileOutcome::NoOp)
    }

    /// Conditional GET that yields `None` when a newer pass cancels it.
    async fn fetch(
        &self,
        url: &str,
        known_etag: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Option<FetchResponse>> {
        tokio::select! {
            _ = cancel.cancelled() => Ok(None),
            result = self.fetch_required(url, known_etag) => result.map(Some),
        }
    }

    async fn fetch_required(&self, url: &str, known_etag: Option<&str>) -> Result<FetchResponse> {
        self.with_refresh(|| self.client.fetch_with_validator(url, known_etag))
            .await
    }

    /// Run `op`, retrying once after a 401 if credentials could be refreshed.
    async fn with_refresh<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match op().await {
            Err(
                err @ (SyncError::Unauthenticated { .. }
                | SyncError::Unauthorized { status: 401, .. }),
            ) => match self.client.credentials().refresh().await {
                Ok(true) => {
                    log::info!("[SyncOrchestrator] Credentials refreshed, retrying");
                    op().await
                }
                Ok(false) => Err(err),
                Err(refresh_err) => {
                    log::warn!(
                        "[SyncOrchestrator] Credential refresh failed: {}",
                        refresh_err
                    );
                    Err(err)
                }
            },
            other => other,
        }
    }

    async fn known_remote(&self, document_key: &str, url: &str) -> Result<RemoteResourceInfo> {
        if let Some(info) = self.session.remote_info(document_key)
            && info.url == url
        {
            return Ok(info);
        }
        let info = match self.store.sync_state(document_key).await? {
            Some(state) if state.url == url => RemoteResourceInfo::from_sync_state(&state),
            _ => RemoteResourceInfo::unknown(url),
        };
        self.session.set_remote_info(document_key, info.clone());
        Ok(info)
    }

    async fn confirm_common(
        &self,
        document_key: &str,
        url: &str,
        digest: &str,
        etag: Option<String>,
        last_modified: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut state = match self.store.sync_state(document_key).await? {
            Some(state) if state.url == url => state,
            _ => DocumentSyncState::new(url),
        };
        state.confirm(digest, etag, last_modified);
        self.store.set_sync_state(document_key, &state).await
    }

    async fn latest_or_snapshot(&self, document_key: &str) -> Result<LocalDocumentItem> {
        if let Some(item) = self.capture_editor(document_key).await? {
            return Ok(item);
        }
        let item = self.new_item(document_key, Snapshot::from_content(""));
        self.store.put_item(&item).await?;
        Ok(item)
    }

    /// Latest item, after persisting editor content that no save has caught
    /// yet (an autosave debounce may still be running).
    ///
    /// An empty editor has nothing loaded and is not captured.
    async fn capture_editor(&self, document_key: &str) -> Result<Option<LocalDocumentItem>> {
        let latest = self.store.latest_item(document_key).await?;
        let snapshot = self.snapshotter.snapshot(document_key).await?;
        if snapshot.content.is_empty()
            || latest
                .as_ref()
                .is_some_and(|item| item.digest == snapshot.digest)
        {
            return Ok(latest);
        }

        let item = self.new_item(document_key, snapshot);
        self.store.put_item(&item).await?;
        log::info!(
            "[SyncOrchestrator] Saved unsaved edits of {} before syncing ({})",
            document_key,
            short(&item.digest)
        );
        self.events.emit(&SyncEvent::LocalSaved {
            document_key: document_key.to_string(),
            digest: item.digest.clone(),
            method: "sync".to_string(),
        });
        Ok(Some(item))
    }

    fn new_item(&self, document_key: &str, snapshot: Snapshot) -> LocalDocumentItem {
        LocalDocumentItem::new(document_key, self.media_type.clone(), snapshot)
    }

    fn transition(&self, document_key: &str, state: SyncState) {
        let previous = self.session.set_state(document_key, state);
        if previous != state {
            log::debug!(
                "[SyncOrchestrator] {}: {:?} -> {:?}",
                document_key,
                previous,
                state
            );
            self.events.emit(&SyncEvent::StateChanged {
                document_key: document_key.to_string(),
                state,
            });
        }
    }
}

impl std::fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("media_type", &self.media_type)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

fn short(digest: &str) -> &str {
    &digest[..digest.len().min(12)]
}
