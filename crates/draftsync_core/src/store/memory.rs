//! In-memory item store.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::ItemStore;
use crate::error::Result;
use crate::future::BoxFuture;

/// In-memory item store for tests and embedding.
///
/// Thread-safe via `RwLock`; data is lost when dropped. Clones share the
/// same underlying map.
#[derive(Debug, Default, Clone)]
pub struct MemoryItemStore {
    items: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryItemStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A copy of every stored item, for assertions.
    pub fn dump(&self) -> HashMap<String, String> {
        self.items.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl ItemStore for MemoryItemStore {
    fn get_item<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(async move {
            let items = self.items.read().unwrap_or_else(|e| e.into_inner());
            Ok(items.get(key).cloned())
        })
    }

    fn set_item<'a>(&'a self, key: &'a str, value: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
            items.insert(key.to_string(), value.to_string());
            Ok(())
        })
    }

    fn remove_item<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
            items.remove(key);
            Ok(())
        })
    }
}
