//! The editing surface the engine reads from and writes to.
//!
//! The rich-text editor itself lives outside this crate. The engine only needs
//! to read the current serialized content of a document and, when pulling a
//! remote revision, replace what the editor displays.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::error::{Result, SyncError};
use crate::future::BoxFuture;

/// Narrow interface to the editable document.
pub trait EditorSurface: Send + Sync {
    /// Serialized content currently shown for `document_key`.
    ///
    /// An editor with nothing loaded for the key returns an empty string.
    fn read_content<'a>(&'a self, document_key: &'a str) -> BoxFuture<'a, Result<String>>;

    /// Replace the displayed content for `document_key`.
    fn replace_content<'a>(
        &'a self,
        document_key: &'a str,
        content: &'a str,
    ) -> BoxFuture<'a, Result<()>>;
}

impl<T: EditorSurface + ?Sized> EditorSurface for Arc<T> {
    fn read_content<'a>(&'a self, document_key: &'a str) -> BoxFuture<'a, Result<String>> {
        (**self).read_content(document_key)
    }

    fn replace_content<'a>(
        &'a self,
        document_key: &'a str,
        content: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        (**self).replace_content(document_key, content)
    }
}

/// In-memory editor, used by tests and by embedders that keep the document
/// in a buffer they own.
#[derive(Debug, Default, Clone)]
pub struct MemoryEditor {
    documents: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryEditor {
    /// Create an empty editor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the content as if the user typed it.
    pub fn set(&self, document_key: &str, content: impl Into<String>) {
        let mut docs = self.documents.write().unwrap_or_else(|e| e.into_inner());
        docs.insert(document_key.to_string(), content.into());
    }

    /// Current content, if any.
    pub fn get(&self, document_key: &str) -> Option<String> {
        let docs = self.documents.read().unwrap_or_else(|e| e.into_inner());
        docs.get(document_key).cloned()
    }
}

impl EditorSurface for MemoryEditor {
    fn read_content<'a>(&'a self, document_key: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move { Ok(self.get(document_key).unwrap_or_default()) })
    }

    fn replace_content<'a>(
        &'a self,
        document_key: &'a str,
        content: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.set(document_key, content);
            Ok(())
        })
    }
}

/// Treats a file on disk as the editable document.
///
/// Every document key maps to the same file; the command-line tool edits one
/// document at a time.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct FileEditor {
    path: PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileEditor {
    /// Create an editor backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl EditorSurface for FileEditor {
    fn read_content<'a>(&'a self, _document_key: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            match std::fs::read_to_string(&self.path) {
                Ok(content) => Ok(content),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
                Err(e) => Err(SyncError::FileRead {
                    path: self.path.clone(),
                    source: e,
                }),
            }
        })
    }

    fn replace_content<'a>(
        &'a self,
        _document_key: &'a str,
        content: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if let Some(parent) = self.path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&self.path, content)?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::future::block_on_test;

    #[test]
    fn test_memory_editor() {
        let editor = MemoryEditor::new();
        assert_eq!(block_on_test(editor.read_content("doc")).unwrap(), "");

        block_on_test(editor.replace_content("doc", "<p>x</p>")).unwrap();
        assert_eq!(editor.get("doc").as_deref(), Some("<p>x</p>"));
    }

    #[test]
    fn test_file_editor_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let editor = FileEditor::new(dir.path().join("nested").join("article.html"));

        assert_eq!(block_on_test(editor.read_content("any")).unwrap(), "");
        block_on_test(editor.replace_content("any", "<h1>Hi</h1>")).unwrap();
        assert_eq!(block_on_test(editor.read_content("any")).unwrap(), "<h1>Hi</h1>");
    }
}
