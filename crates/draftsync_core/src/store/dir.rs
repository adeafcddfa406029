//! Directory-backed item store (native only).

use std::path::{Path, PathBuf};

use super::ItemStore;
use crate::error::{Result, SyncError};
use crate::future::BoxFuture;

/// Stores each item as a file `<dir>/<percent-encoded key>.json`.
///
/// Writes go to a temporary file first and are renamed into place, so a
/// crash never leaves a half-written envelope behind.
#[derive(Debug, Clone)]
pub struct DirItemStore {
    root: PathBuf,
}

impl DirItemStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Directory holding the items.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", urlencoding::encode(key)))
    }
}

impl ItemStore for DirItemStore {
    fn get_item<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(async move {
            let path = self.path_for(key);
            match std::fs::read_to_string(&path) {
                Ok(content) => Ok(Some(content)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(SyncError::FileRead { path, source: e }),
            }
        })
    }

    fn set_item<'a>(&'a self, key: &'a str, value: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let path = self.path_for(key);
            let tmp = path.with_extension("json.tmp");
            std::fs::write(&tmp, value)?;
            std::fs::rename(&tmp, &path)?;
            Ok(())
        })
    }

    fn remove_item<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            match std::fs::remove_file(self.path_for(key)) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::future::block_on_test;

    #[test]
    fn test_dir_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();

        let store = DirItemStore::open(dir.path().join("items")).unwrap();
        block_on_test(store.set_item("doc:https://example.org/a b", "{\"x\":1}")).unwrap();

        let reopened = DirItemStore::open(dir.path().join("items")).unwrap();
        assert_eq!(
            block_on_test(reopened.get_item("doc:https://example.org/a b"))
                .unwrap()
                .as_deref(),
            Some("{\"x\":1}")
        );

        // Keys with path separators stay inside the root
        let entries: Vec<_> = std::fs::read_dir(reopened.root()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_dir_store_remove_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirItemStore::open(dir.path()).unwrap();
        block_on_test(store.remove_item("nothing")).unwrap();
        assert!(block_on_test(store.get_item("nothing")).unwrap().is_none());
    }
}
