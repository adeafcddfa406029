//! Online/offline transitions.
//!
//! While offline only local autosave runs; edits pile up as local items.
//! Coming back online re-enables remote autosave for every tracked document
//! and reconciles each one right away, which pushes whatever is pending.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::autosave::AutosaveScheduler;
use crate::error::Result;
use crate::events::SyncEvent;
use crate::item::PersistMethod;
use crate::orchestrator::{ReconcileOptions, ReconcileOutcome, SyncOrchestrator};

/// Reacts to connectivity changes for a set of tracked documents.
pub struct NetworkMonitor {
    orchestrator: Arc<SyncOrchestrator>,
    scheduler: Arc<AutosaveScheduler>,
    online: AtomicBool,
    tracked: Mutex<HashMap<String, Duration>>,
}

impl NetworkMonitor {
    /// Create a monitor starting in the given connectivity state.
    pub fn new(
        orchestrator: Arc<SyncOrchestrator>,
        scheduler: Arc<AutosaveScheduler>,
        online: bool,
    ) -> Self {
        Self {
            orchestrator,
            scheduler,
            online: AtomicBool::new(online),
            tracked: Mutex::new(HashMap::new()),
        }
    }

    /// Whether the remote is currently considered reachable.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Keep remote autosave of `document_key` running at `interval` while online.
    pub fn track(&self, document_key: &str, interval: Duration) {
        self.tracked
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(document_key.to_string(), interval);
        if self.is_online() {
            self.scheduler
                .enable(document_key, PersistMethod::Remote, interval);
        }
    }

    /// Stop managing `document_key`.
    pub fn untrack(&self, document_key: &str) -> bool {
        self.tracked
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(document_key)
            .is_some()
    }

    fn tracked(&self) -> Vec<(String, Duration)> {
        let tracked = self.tracked.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries: Vec<_> = tracked.iter().map(|(k, v)| (k.clone(), *v)).collect();
        entries.sort();
        entries
    }

    /// Apply a connectivity change.
    ///
    /// Returns the reconcile results of tracked documents when coming online;
    /// a repeated transition to the current state is ignored.
    pub async fn on_transition(
        &self,
        online: bool,
    ) -> Vec<(String, Result<ReconcileOutcome>)> {
        if self.online.swap(online, Ordering::SeqCst) == online {
            log::debug!("[NetworkMonitor] Already {}, ignoring", label(online));
            return Vec::new();
        }
        log::info!("[NetworkMonitor] Now {}", label(online));
        self.orchestrator
            .events()
            .emit(&SyncEvent::ConnectivityChanged { online });

        let mut results = Vec::new();
        for (key, interval) in self.tracked() {
            if online {
                self.scheduler.enable(&key, PersistMethod::Remote, interval);
                let result = self
                    .orchestrator
                    .reconcile(&key, ReconcileOptions::default())
                    .await;
                results.push((key, result));
            } else if let Err(e) = self
                .scheduler
                .disable(&key, PersistMethod::Remote, false)
                .await
            {
                log::warn!(
                    "[NetworkMonitor] Could not disable remote autosave of {}: {}",
                    key,
                    e
                );
            }
        }
        results
    }
}

fn label(online: bool) -> &'static str {
    if online { "online" } else { "offline" }
}

impl std::fmt::Debug for NetworkMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkMonitor")
            .field("online", &self.is_online())
            .field("tracked", &self.tracked().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{Precondition, RawResponse};
    use crate::testing::{Harness, KEY};

    const INTERVAL: Duration = Duration::from_millis(500);

    fn monitor(h: &Harness, online: bool) -> (NetworkMonitor, Arc<AutosaveScheduler>) {
        let scheduler = Arc::new(AutosaveScheduler::new(Arc::clone(&h.orchestrator)));
        (
            NetworkMonitor::new(Arc::clone(&h.orchestrator), Arc::clone(&scheduler), online),
            scheduler,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_disables_remote_autosave_only() {
        let h = Harness::new(vec![]);
        let (monitor, scheduler) = monitor(&h, true);
        scheduler.enable(KEY, PersistMethod::Local, INTERVAL);
        monitor.track(KEY, INTERVAL);
        assert!(scheduler.is_enabled(KEY, PersistMethod::Remote));

        let results = monitor.on_transition(false).await;
        assert!(results.is_empty());
        assert!(!monitor.is_online());
        assert!(!scheduler.is_enabled(KEY, PersistMethod::Remote));
        assert!(scheduler.is_enabled(KEY, PersistMethod::Local));
    }

    #[tokio::test(start_paused = true)]
    async fn test_online_pushes_offline_edits() {
        let h = Harness::new(vec![
            RawResponse::status(404),
            RawResponse::status(201).with_etag("\"r1\""),
        ]);
        let (monitor, scheduler) = monitor(&h, false);
        monitor.track(KEY, INTERVAL);
        assert!(!scheduler.is_enabled(KEY, PersistMethod::Remote));

        h.editor.set(KEY, "<p>written on a plane</p>");
        h.orchestrator
            .save_local_snapshot(KEY, PersistMethod::Local)
            .await
            .unwrap();

        let results = monitor.on_transition(true).await;
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0].1,
            Ok(ReconcileOutcome::Pushed { .. })
        ));
        assert_eq!(scheduler.interval_of(KEY, PersistMethod::Remote), Some(INTERVAL));

        let seen = h.transport.seen();
        assert_eq!(seen[1].request.precondition, Precondition::IfNoneMatchAny);
        assert_eq!(seen[1].body.as_deref(), Some("<p>written on a plane</p>"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_transitions_are_ignored() {
        let h = Harness::new(vec![RawResponse::status(304)]);
        let (monitor, _) = monitor(&h, true);
        monitor.track(KEY, INTERVAL);

        assert!(monitor.on_transition(true).await.is_empty());
        assert!(h.transport.seen().is_empty());

        monitor.on_transition(false).await;
        monitor.on_transition(false).await;
        let connectivity = h.count_events(|e| matches!(e, SyncEvent::ConnectivityChanged { .. }));
        assert_eq!(connectivity, 1);
    }
}
