//! Known-common state between the local draft and the remote resource.
//!
//! The sync state records the last digest and validator both sides were
//! confirmed to share, so the orchestrator can tell which side diverged.
//! It is written only after a successful push or pull.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted known-common state for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSyncState {
    /// Version of the record format for future compatibility
    pub version: u32,

    /// Remote resource URL
    pub url: String,

    /// Validator of the representation both sides share
    #[serde(default)]
    pub etag: Option<String>,

    /// Digest of the normalized content both sides share
    #[serde(default)]
    pub common_digest: Option<String>,

    /// `Last-Modified` of the shared representation
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,

    /// When the shared state was last confirmed
    #[serde(default)]
    pub synced_at: Option<DateTime<Utc>>,
}

impl DocumentSyncState {
    /// Current record format version
    pub const CURRENT_VERSION: u32 = 1;

    /// A state for `url` with nothing known in common yet.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            url: url.into(),
            etag: None,
            common_digest: None,
            last_modified: None,
            synced_at: None,
        }
    }

    /// Record that both sides now share `digest` under `etag`.
    pub fn confirm(
        &mut self,
        digest: impl Into<String>,
        etag: Option<String>,
        last_modified: Option<DateTime<Utc>>,
    ) {
        self.common_digest = Some(digest.into());
        self.etag = etag;
        self.last_modified = last_modified;
        self.synced_at = Some(Utc::now());
    }

    /// Whether anything has ever been confirmed in common.
    pub fn has_common_state(&self) -> bool {
        self.common_digest.is_some()
    }

    /// Load from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Outcome class of the most recent request against the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteStatus {
    /// Not contacted yet
    Unknown,
    /// 200 with a body
    Fetched,
    /// 304
    NotModified,
    /// 404
    Missing,
    /// 2xx on PUT
    Saved,
}

/// Cached result of the most recent reconciliation against the remote.
///
/// Replaced wholesale after each successful GET or PUT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteResourceInfo {
    /// Remote resource URL
    pub url: String,
    /// `ETag` of the last seen representation
    pub etag: Option<String>,
    /// `Last-Modified` of the last seen representation
    pub last_modified: Option<DateTime<Utc>>,
    /// `Date` header of the last response
    pub date: Option<DateTime<Utc>>,
    /// Digest of the last seen normalized body
    pub digest: Option<String>,
    /// Outcome class of the last request
    pub status: RemoteStatus,
}

impl RemoteResourceInfo {
    /// Nothing known about `url` yet.
    pub fn unknown(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            etag: None,
            last_modified: None,
            date: None,
            digest: None,
            status: RemoteStatus::Unknown,
        }
    }

    /// Seed from persisted known-common state.
    pub fn from_sync_state(state: &DocumentSyncState) -> Self {
        Self {
            url: state.url.clone(),
            etag: state.etag.clone(),
            last_modified: state.last_modified,
            date: None,
            digest: state.common_digest.clone(),
            status: RemoteStatus::Unknown,
        }
    }
}
