#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Configuration options
pub mod config;

/// Error (common error types)
pub mod error;

/// Boxed futures for the collaborator traits
pub mod future;

/// Editor surface (read and replace the editable content)
pub mod editor;

/// Credentials for the remote
pub mod credentials;

/// Content snapshots and digests
pub mod snapshot;

/// Records kept in the local item store
pub mod item;

/// Known-common state and cached remote info
pub mod sync_state;

/// Local item store
pub mod store;

/// Conditional HTTP requests against the remote
pub mod remote;

/// Token diff for conflict review
pub mod diff;

/// Paused conflicts and their resolutions
pub mod review;

/// The reconcile transition function
pub mod decision;

/// Per-document in-memory sync context
pub mod session;

/// Sync events and subscribers
pub mod events;

/// Reconcile orchestration
pub mod orchestrator;

/// Debounced autosave
pub mod autosave;

/// Connectivity transitions
pub mod network;

#[cfg(test)]
pub(crate) mod testing;

pub use autosave::AutosaveScheduler;
pub use config::Config;
pub use decision::{SyncDecision, decide};
pub use diff::{DiffToken, build_review};
pub use error::{Result, SyncError};
pub use item::{LocalDocumentItem, PersistMethod};
pub use network::NetworkMonitor;
pub use orchestrator::{ReconcileOptions, ReconcileOutcome, SyncOrchestrator};
pub use review::{Resolution, ReviewSession};
pub use session::SyncState;
pub use snapshot::{Snapshot, digest_of, normalize};
