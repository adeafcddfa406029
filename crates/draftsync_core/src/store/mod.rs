//! Local item store.
//!
//! The item store is a flat key-value store of strings (browser
//! `localStorage`, a directory of JSON files, an in-memory map). The engine
//! persists three kinds of records in it:
//!
//! - `doc:<key>`: the latest [`LocalDocumentItem`] envelope
//! - `autosave:<key>:<method>`: [`AutoSaveState`] per persistence method
//! - `sync:<key>`: the known-common [`DocumentSyncState`]
//!
//! [`ItemStore`] is the raw seam; [`DocumentStore`] layers the typed records
//! on top of it.

mod memory;
#[cfg(not(target_arch = "wasm32"))]
mod dir;

pub use memory::MemoryItemStore;
#[cfg(not(target_arch = "wasm32"))]
pub use dir::DirItemStore;

use std::sync::Arc;

use crate::error::Result;
use crate::future::BoxFuture;
use crate::item::{
    AutoSaveState, LocalDocumentItem, PersistMethod, autosave_key, document_item_key,
    sync_state_key,
};
use crate::sync_state::DocumentSyncState;

/// Async key-value store of string items.
pub trait ItemStore: Send + Sync {
    /// Read an item. Returns `None` if the key doesn't exist.
    fn get_item<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>>;

    /// Write an item, replacing any previous value.
    fn set_item<'a>(&'a self, key: &'a str, value: &'a str) -> BoxFuture<'a, Result<()>>;

    /// Remove an item. Removing a missing key is not an error.
    fn remove_item<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<()>>;
}

impl<T: ItemStore + ?Sized> ItemStore for Arc<T> {
    fn get_item<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        (**self).get_item(key)
    }

    fn set_item<'a>(&'a self, key: &'a str, value: &'a str) -> BoxFuture<'a, Result<()>> {
        (**self).set_item(key, value)
    }

    fn remove_item<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<()>> {
        (**self).remove_item(key)
    }
}

/// Typed access to the records the engine keeps in an [`ItemStore`].
#[derive(Clone)]
pub struct DocumentStore {
    items: Arc<dyn ItemStore>,
}

impl DocumentStore {
    /// Wrap a raw item store.
    pub fn new(items: Arc<dyn ItemStore>) -> Self {
        Self { items }
    }

    /// The raw store underneath.
    pub fn items(&self) -> &Arc<dyn ItemStore> {
        &self.items
    }

    /// Latest snapshot of a document, published or not.
    pub async fn latest_item(&self, document_key: &str) -> Result<Option<LocalDocumentItem>> {
        let key = document_item_key(document_key);
        match self.items.get_item(&key).await? {
            Some(json) => Ok(Some(LocalDocumentItem::from_json(&json)?)),
            None => Ok(None),
        }
    }

    /// Persist a snapshot as the latest item for its document.
    pub async fn put_item(&self, item: &LocalDocumentItem) -> Result<()> {
        let key = document_item_key(&item.id);
        self.items.set_item(&key, &item.to_json()?).await
    }

    /// Mark the latest item as published if it still has `digest`.
    ///
    /// Returns `false` when a newer snapshot replaced it in the meantime.
    pub async fn mark_published(&self, document_key: &str, digest: &str) -> Result<bool> {
        match self.latest_item(document_key).await? {
            Some(item) if item.digest == digest => {
                if !item.is_published() {
                    self.put_item(&item.published()).await?;
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Autosave bookkeeping for one method.
    pub async fn autosave_state(
        &self,
        document_key: &str,
        method: PersistMethod,
    ) -> Result<Option<AutoSaveState>> {
        let key = autosave_key(document_key, method);
        match self.items.get_item(&key).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Record that `state.digest` was written through `method`.
    pub async fn set_autosave_state(
        &self,
        document_key: &str,
        method: PersistMethod,
        state: &AutoSaveState,
    ) -> Result<()> {
        let key = autosave_key(document_key, method);
        self.items
            .set_item(&key, &serde_json::to_string(state)?)
            .await
    }

    /// Forget the autosave bookkeeping for one method.
    pub async fn remove_autosave_state(
        &self,
        document_key: &str,
        method: PersistMethod,
    ) -> Result<()> {
        self.items
            .remove_item(&autosave_key(document_key, method))
            .await
    }

    /// Known-common state for a document.
    pub async fn sync_state(&self, document_key: &str) -> Result<Option<DocumentSyncState>> {
        match self.items.get_item(&sync_state_key(document_key)).await? {
            Some(json) => Ok(Some(DocumentSyncState::from_json(&json)?)),
            None => Ok(None),
        }
    }

    /// Persist known-common state for a document.
    pub async fn set_sync_state(&self, document_key: &str, state: &DocumentSyncState) -> Result<()> {
        self.items
            .set_item(&sync_state_key(document_key), &state.to_json()?)
            .await
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore").finish_non_exhaustive()
    }
}
