//! User-visible sync events and their subscriber registry.
//!
//! The orchestrator, autosave scheduler and network monitor report what they
//! do as [`SyncEvent`]s. Front ends subscribe to turn them into notifications,
//! status indicators or a review dialog.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::UserAction;
use crate::session::SyncState;

/// Events emitted while keeping a document in sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type")]
pub enum SyncEvent {
    /// The sync state of a document changed.
    StateChanged {
        /// Document key.
        document_key: String,
        /// New state.
        state: SyncState,
    },

    /// A new local snapshot was written.
    LocalSaved {
        /// Document key.
        document_key: String,
        /// Digest of the snapshot.
        digest: String,
        /// Persistence method that triggered the write.
        method: String,
    },

    /// The local draft was written to the remote.
    Pushed {
        /// Document key.
        document_key: String,
        /// Validator returned by the remote, if any.
        #[serde(default)]
        etag: Option<String>,
    },

    /// The remote copy replaced the local draft.
    Pulled {
        /// Document key.
        document_key: String,
        /// Digest of the pulled content.
        digest: String,
    },

    /// Both sides changed; the user has to pick a resolution.
    ReviewRequired {
        /// Document key.
        document_key: String,
        /// Runs only in the local draft.
        added: usize,
        /// Runs only in the remote copy.
        removed: usize,
        /// Extra explanation, e.g. when a forced resolution went stale.
        #[serde(default)]
        message: Option<String>,
    },

    /// A pending review was closed.
    ReviewResolved {
        /// Document key.
        document_key: String,
        /// `local`, `remote` or `merged`.
        resolution: String,
    },

    /// A reconcile pass failed.
    SyncFailed {
        /// Document key.
        document_key: String,
        /// Human-readable message.
        message: String,
        /// What the user can do about it.
        action: UserAction,
    },

    /// Connectivity changed.
    ConnectivityChanged {
        /// Whether the remote is reachable.
        online: bool,
    },
}

impl SyncEvent {
    /// Document the event concerns, if any.
    pub fn document_key(&self) -> Option<&str> {
        match self {
            SyncEvent::StateChanged { document_key, .. }
            | SyncEvent::LocalSaved { document_key, .. }
            | SyncEvent::Pushed { document_key, .. }
            | SyncEvent::Pulled { document_key, .. }
            | SyncEvent::ReviewRequired { document_key, .. }
            | SyncEvent::ReviewResolved { document_key, .. }
            | SyncEvent::SyncFailed { document_key, .. } => Some(document_key),
            SyncEvent::ConnectivityChanged { .. } => None,
        }
    }
}

/// A unique identifier for a subscription.
pub type SubscriptionId = u64;

/// Callback function type for sync events.
///
/// Callbacks run synchronously on the emitting task and should return quickly.
pub type EventCallback = Arc<dyn Fn(&SyncEvent) + Send + Sync>;

/// Thread-safe registry of event subscribers.
pub struct EventRegistry {
    callbacks: RwLock<HashMap<SubscriptionId, EventCallback>>,
    next_id: AtomicU64,
}

impl EventRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            callbacks: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribe to sync events.
    ///
    /// Returns a subscription ID that can be used to unsubscribe later.
    pub fn subscribe(&self, callback: EventCallback) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.callbacks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, callback);
        id
    }

    /// Unsubscribe.
    ///
    /// Returns `true` if the subscription was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.callbacks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id)
            .is_some()
    }

    /// Emit an event to all subscribers.
    ///
    /// A panicking callback does not prevent the others from running.
    pub fn emit(&self, event: &SyncEvent) {
        let callbacks = self.callbacks.read().unwrap_or_else(|e| e.into_inner());
        for callback in callbacks.values() {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                callback(event);
            }));
        }
    }

    /// Get the number of active subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.callbacks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRegistry")
            .field("subscriber_count", &self.subscriber_count())
            .field("next_id", &self.next_id.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    fn pulled() -> SyncEvent {
        SyncEvent::Pulled {
            document_key: "doc".into(),
            digest: "d1".into(),
        }
    }

    #[test]
    fn test_subscribe_and_emit() {
        let registry = EventRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = Arc::clone(&seen);
        registry.subscribe(Arc::new(move |event| {
            seen_clone.lock().unwrap().push(event.clone());
        }));

        registry.emit(&pulled());
        assert_eq!(*seen.lock().unwrap(), vec![pulled()]);
    }

    #[test]
    fn test_unsubscribe() {
        let registry = EventRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let counter_clone = Arc::clone(&counter);
        let id = registry.subscribe(Arc::new(move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));

        registry.emit(&pulled());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(registry.subscriber_count(), 0);
    }

    #[test]
    fn test_callback_panic_isolation() {
        let registry = EventRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));

        registry.subscribe(Arc::new(|_| panic!("subscriber failed")));
        let counter_clone = Arc::clone(&counter);
        registry.subscribe(Arc::new(move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        }));

        registry.emit(&pulled());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_event_serialization() {
        let event = SyncEvent::ReviewRequired {
            document_key: "doc".into(),
            added: 1,
            removed: 2,
            message: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ReviewRequired");
        assert_eq!(json["removed"], 2);
        assert_eq!(event.document_key(), Some("doc"));
        assert_eq!(
            SyncEvent::ConnectivityChanged { online: true }.document_key(),
            None
        );
    }
}
