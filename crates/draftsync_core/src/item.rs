//! Records persisted in the local item store.
//!
//! A [`LocalDocumentItem`] is one saved snapshot of the editable document,
//! written as a small JSON envelope. [`AutoSaveState`] is per-method
//! bookkeeping the autosave scheduler uses to suppress redundant writes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::snapshot::Snapshot;

/// Default media type of serialized documents.
pub const DEFAULT_MEDIA_TYPE: &str = "text/html";

/// One locally persisted snapshot of the editable document.
///
/// Content is never changed after creation; a newer edit produces a new item.
/// Only the publication timestamp is filled in once this exact snapshot has
/// reached the remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalDocumentItem {
    /// Document key
    pub id: String,

    /// Envelope type, always `"Document"`
    #[serde(rename = "type", default = "document_type")]
    pub kind: String,

    /// Media type of `content`
    pub media_type: String,

    /// Normalized serialized content
    pub content: String,

    /// SHA-256 of `content`
    pub digest: String,

    /// When the snapshot was taken
    #[serde(rename = "updated")]
    pub created_at: DateTime<Utc>,

    /// When the snapshot was pushed (or pulled), if it has been
    #[serde(rename = "published", default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

fn document_type() -> String {
    "Document".to_string()
}

impl LocalDocumentItem {
    /// Create an unpublished item from a snapshot.
    pub fn new(id: impl Into<String>, media_type: impl Into<String>, snapshot: Snapshot) -> Self {
        Self {
            id: id.into(),
            kind: document_type(),
            media_type: media_type.into(),
            content: snapshot.content,
            digest: snapshot.digest,
            created_at: Utc::now(),
            published_at: None,
        }
    }

    /// Mark the item as published now.
    pub fn published(mut self) -> Self {
        self.published_at = Some(Utc::now());
        self
    }

    /// Whether this snapshot has reached the remote.
    pub fn is_published(&self) -> bool {
        self.published_at.is_some()
    }

    /// Load from the JSON envelope.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to the JSON envelope.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// How an autosave writes the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistMethod {
    /// Write to the local item store only
    Local,
    /// Write locally, then reconcile with the remote
    Remote,
}

impl PersistMethod {
    /// Stable name used in storage keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            PersistMethod::Local => "local",
            PersistMethod::Remote => "remote",
        }
    }
}

impl fmt::Display for PersistMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PersistMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "localstorage" => Ok(PersistMethod::Local),
            "remote" | "http" => Ok(PersistMethod::Remote),
            _ => Err(()),
        }
    }
}

/// Last digest written through a given persistence method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoSaveState {
    /// Digest of the last written snapshot
    pub digest: String,
    /// When it was written
    pub updated_at: DateTime<Utc>,
}

impl AutoSaveState {
    /// Record a write of `digest` now.
    pub fn new(digest: impl Into<String>) -> Self {
        Self {
            digest: digest.into(),
            updated_at: Utc::now(),
        }
    }
}

/// Storage key of the latest document snapshot.
pub fn document_item_key(document_key: &str) -> String {
    format!("doc:{}", document_key)
}

/// Storage key of the autosave bookkeeping for one method.
pub fn autosave_key(document_key: &str, method: PersistMethod) -> String {
    format!("autosave:{}:{}", document_key, method.as_str())
}

/// Storage key of the known-common sync state.
pub fn sync_state_key(document_key: &str) -> String {
    format!("sync:{}", document_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let item = LocalDocumentItem::new(
            "article",
            DEFAULT_MEDIA_TYPE,
            Snapshot::from_content("<p>x</p>"),
        );
        let value: serde_json::Value = serde_json::from_str(&item.to_json().unwrap()).unwrap();

        assert_eq!(value["id"], "article");
        assert_eq!(value["type"], "Document");
        assert_eq!(value["mediaType"], "text/html");
        assert_eq!(value["content"], "<p>x</p>");
        assert!(value.get("updated").is_some());
        assert!(value.get("published").is_none());

        let published = item.published();
        let value: serde_json::Value =
            serde_json::from_str(&published.to_json().unwrap()).unwrap();
        assert!(value.get("published").is_some());
    }

    #[test]
    fn test_envelope_parse() {
        let json = r#"{
            "id": "a",
            "type": "Document",
            "mediaType": "text/html",
            "content": "<p>x</p>",
            "digest": "abc",
            "updated": "2024-03-01T10:00:00Z",
            "published": "2024-03-01T10:05:00Z"
        }"#;
        let item = LocalDocumentItem::from_json(json).unwrap();
        assert_eq!(item.id, "a");
        assert!(item.is_published());
    }

    #[test]
    fn test_persist_method_from_str() {
        assert_eq!(PersistMethod::from_str("local"), Ok(PersistMethod::Local));
        assert_eq!(PersistMethod::from_str("HTTP"), Ok(PersistMethod::Remote));
        assert!(PersistMethod::from_str("ftp").is_err());
    }

    #[test]
    fn test_keys() {
        assert_eq!(document_item_key("a"), "doc:a");
        assert_eq!(autosave_key("a", PersistMethod::Remote), "autosave:a:remote");
        assert_eq!(sync_state_key("a"), "sync:a");
    }
}
