//! Debounced autosave.
//!
//! Each enabled (document, method) pair owns one timer. An edit restarts the
//! timers of every method enabled for that document; when a timer expires the
//! orchestrator snapshots the editor and writes it, unless the digest matches
//! what that method wrote last. For [`PersistMethod::Remote`] a write (or a
//! pending change left over from an earlier failure) is followed by a
//! reconcile pass, except while a conflict review is open.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::error::Result;
use crate::item::PersistMethod;
use crate::orchestrator::{ReconcileOptions, SyncOrchestrator};

struct Entry {
    interval: Duration,
    timer: Option<JoinHandle<()>>,
}

impl Entry {
    fn cancel(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// Debounces edits into local saves and remote reconciles.
pub struct AutosaveScheduler {
    orchestrator: Arc<SyncOrchestrator>,
    entries: Mutex<HashMap<(String, PersistMethod), Entry>>,
}

impl AutosaveScheduler {
    /// Create a scheduler driving `orchestrator`.
    pub fn new(orchestrator: Arc<SyncOrchestrator>) -> Self {
        Self {
            orchestrator,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<(String, PersistMethod), Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Enable autosave of `document_key` through `method`.
    ///
    /// Re-enabling replaces the interval and cancels a running timer.
    pub fn enable(&self, document_key: &str, method: PersistMethod, interval: Duration) {
        let previous = self.entries().insert(
            (document_key.to_string(), method),
            Entry {
                interval,
                timer: None,
            },
        );
        if let Some(mut previous) = previous {
            previous.cancel();
        }
        log::debug!(
            "[AutosaveScheduler] {} autosave enabled for {} every {:?}",
            method,
            document_key,
            interval
        );
    }

    /// Disable autosave through `method`, optionally saving once more first.
    ///
    /// The method's bookkeeping is removed from the item store.
    pub async fn disable(
        &self,
        document_key: &str,
        method: PersistMethod,
        flush: bool,
    ) -> Result<()> {
        let removed = self.entries().remove(&(document_key.to_string(), method));
        let Some(mut entry) = removed else {
            return Ok(());
        };
        entry.cancel();
        log::debug!(
            "[AutosaveScheduler] {} autosave disabled for {} (flush: {})",
            method,
            document_key,
            flush
        );

        if flush {
            save_through(&self.orchestrator, document_key, method).await?;
        }
        self.orchestrator
            .store()
            .remove_autosave_state(document_key, method)
            .await
    }

    /// Record an edit: restart the debounce timer of every enabled method.
    ///
    /// Must be called from within a tokio runtime.
    pub fn notify_edit(&self, document_key: &str) {
        let mut entries = self.entries();
        for ((key, method), entry) in entries.iter_mut() {
            if key != document_key {
                continue;
            }
            entry.cancel();

            let orchestrator = Arc::clone(&self.orchestrator);
            let key = key.clone();
            let method = *method;
            let interval = entry.interval;
            entry.timer = Some(tokio::spawn(async move {
                tokio::time::sleep(interval).await;
                if let Err(e) = save_through(&orchestrator, &key, method).await {
                    log::warn!("[AutosaveScheduler] {} save of {} failed: {}", method, key, e);
                }
            }));
        }
    }

    /// Whether autosave through `method` is enabled.
    pub fn is_enabled(&self, document_key: &str, method: PersistMethod) -> bool {
        self.entries()
            .contains_key(&(document_key.to_string(), method))
    }

    /// Debounce interval of an enabled method.
    pub fn interval_of(&self, document_key: &str, method: PersistMethod) -> Option<Duration> {
        self.entries()
            .get(&(document_key.to_string(), method))
            .map(|entry| entry.interval)
    }

    /// Whether a debounce timer is running.
    pub fn is_pending(&self, document_key: &str, method: PersistMethod) -> bool {
        self.entries()
            .get(&(document_key.to_string(), method))
            .and_then(|entry| entry.timer.as_ref())
            .is_some_and(|timer| !timer.is_finished())
    }
}

impl Drop for AutosaveScheduler {
    fn drop(&mut self) {
        for entry in self.entries().values_mut() {
            entry.cancel();
        }
    }
}

impl std::fmt::Debug for AutosaveScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutosaveScheduler")
            .field("enabled", &self.entries().len())
            .finish()
    }
}

async fn save_through(
    orchestrator: &SyncOrchestrator,
    document_key: &str,
    method: PersistMethod,
) -> Result<()> {
    let written = orchestrator
        .save_local_snapshot(document_key, method)
        .await?;
    if method != PersistMethod::Remote {
        return Ok(());
    }

    if orchestrator.pending_review(document_key).is_some() {
        log::debug!(
            "[AutosaveScheduler] {} has an open review, not reconciling",
            document_key
        );
        return Ok(());
    }
    if written.is_some() || orchestrator.has_pending_change(document_key).await? {
        orchestrator
            .reconcile(document_key, ReconcileOptions::default())
            .await?;
    }
    Ok(())
}
