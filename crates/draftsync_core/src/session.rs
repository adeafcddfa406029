//! Per-document sync context owned by the orchestrator.
//!
//! Holds everything that lives only in memory between reconcile passes: the
//! observable state, the cached remote info, a paused review, the cancellation
//! token of the newest pass, and the per-key guard that serializes passes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use ts_rs::TS;

use crate::review::ReviewSession;
use crate::sync_state::RemoteResourceInfo;

/// Observable sync state of one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum SyncState {
    /// Nothing in progress
    #[default]
    Idle,
    /// Conditional GET in flight
    Checking,
    /// The last pass found nothing to do
    NoOp,
    /// Paused on a conflict until the user resolves it
    Reviewing,
    /// Writing the local draft to the remote
    Pushing,
    /// Replacing the local draft with the remote copy
    Pulling,
    /// The last pass failed
    Error,
}

/// Snapshot of a document's sync context, for status reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentStatus {
    /// Current state
    pub state: SyncState,
    /// Cached result of the latest request, if any was made
    pub remote: Option<RemoteResourceInfo>,
    /// Whether a conflict awaits resolution
    pub review_pending: bool,
    /// Message of the last failure, cleared by the next successful pass
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct DocumentContext {
    state: SyncState,
    remote: Option<RemoteResourceInfo>,
    review: Option<ReviewSession>,
    last_error: Option<String>,
    generation: u64,
    cancel: Option<CancellationToken>,
}

/// In-memory sync context for every document the orchestrator has seen.
#[derive(Debug, Default)]
pub struct SyncSession {
    documents: Mutex<HashMap<String, DocumentContext>>,
    guards: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SyncSession {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_doc<R>(&self, document_key: &str, f: impl FnOnce(&mut DocumentContext) -> R) -> R {
        let mut documents = self.documents.lock().unwrap_or_else(|e| e.into_inner());
        f(documents.entry(document_key.to_string()).or_default())
    }

    /// The guard serializing all work on `document_key`.
    pub fn guard(&self, document_key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut guards = self.guards.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(guards.entry(document_key.to_string()).or_default())
    }

    /// Register a new pass, cancelling the one before it.
    ///
    /// Returns the pass generation and its cancellation token.
    pub fn begin_pass(&self, document_key: &str) -> (u64, CancellationToken) {
        self.with_doc(document_key, |doc| {
            if let Some(previous) = doc.cancel.take() {
                previous.cancel();
            }
            doc.generation += 1;
            let token = CancellationToken::new();
            doc.cancel = Some(token.clone());
            (doc.generation, token)
        })
    }

    /// Forget the token of pass `generation` if it is still the newest.
    pub fn end_pass(&self, document_key: &str, generation: u64) {
        self.with_doc(document_key, |doc| {
            if doc.generation == generation {
                doc.cancel = None;
            }
        })
    }

    /// Current state.
    pub fn state(&self, document_key: &str) -> SyncState {
        self.with_doc(document_key, |doc| doc.state)
    }

    /// Set the state, returning the previous one.
    pub fn set_state(&self, document_key: &str, state: SyncState) -> SyncState {
        self.with_doc(document_key, |doc| std::mem::replace(&mut doc.state, state))
    }

    /// Cached remote info.
    pub fn remote_info(&self, document_key: &str) -> Option<RemoteResourceInfo> {
        self.with_doc(document_key, |doc| doc.remote.clone())
    }

    /// Replace the cached remote info.
    pub fn set_remote_info(&self, document_key: &str, info: RemoteResourceInfo) {
        self.with_doc(document_key, |doc| doc.remote = Some(info))
    }

    /// The paused review, if any.
    pub fn review(&self, document_key: &str) -> Option<ReviewSession> {
        self.with_doc(document_key, |doc| doc.review.clone())
    }

    /// Park a review.
    pub fn set_review(&self, document_key: &str, review: ReviewSession) {
        self.with_doc(document_key, |doc| doc.review = Some(review))
    }

    /// Drop the paused review.
    pub fn clear_review(&self, document_key: &str) -> Option<ReviewSession> {
        self.with_doc(document_key, |doc| doc.review.take())
    }

    /// Record or clear the last failure message.
    pub fn set_last_error(&self, document_key: &str, message: Option<String>) {
        self.with_doc(document_key, |doc| doc.last_error = message)
    }

    /// Status snapshot.
    pub fn status(&self, document_key: &str) -> DocumentStatus {
        self.with_doc(document_key, |doc| DocumentStatus {
            state: doc.state,
            remote: doc.remote.clone(),
            review_pending: doc.review.is_some(),
            last_error: doc.last_error.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_pass_cancels_previous() {
        let session = SyncSession::new();
        let (first, first_token) = session.begin_pass("doc");
        let (second, second_token) = session.begin_pass("doc");

        assert!(second > first);
        assert!(first_token.is_cancelled());
        assert!(!second_token.is_cancelled());

        // Other documents are independent
        let (_, other) = session.begin_pass("other");
        assert!(!second_token.is_cancelled());
        assert!(!other.is_cancelled());
    }

    #[test]
    fn test_end_pass_only_clears_newest() {
        let session = SyncSession::new();
        let (first, _) = session.begin_pass("doc");
        let (_, second_token) = session.begin_pass("doc");
        session.end_pass("doc", first);

        // The newest pass is still cancellable by the next one
        session.begin_pass("doc");
        assert!(second_token.is_cancelled());
    }

    #[test]
    fn test_guard_is_shared_per_key() {
        let session = SyncSession::new();
        assert!(Arc::ptr_eq(&session.guard("a"), &session.guard("a")));
        assert!(!Arc::ptr_eq(&session.guard("a"), &session.guard("b")));
    }

    #[test]
    fn test_status() {
        let session = SyncSession::new();
        assert_eq!(session.status("doc"), DocumentStatus::default());

        assert_eq!(session.set_state("doc", SyncState::Reviewing), SyncState::Idle);
        session.set_review("doc", ReviewSession::open("doc", "a", "b", None));
        session.set_last_error("doc", Some("offline".into()));

        let status = session.status("doc");
        assert_eq!(status.state, SyncState::Reviewing);
        assert!(status.review_pending);
        assert_eq!(status.last_error.as_deref(), Some("offline"));

        assert!(session.clear_review("doc").is_some());
        assert!(!session.status("doc").review_pending);
    }
}
