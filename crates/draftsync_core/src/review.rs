//! Paused conflicts awaiting a user decision.
//!
//! When both the local draft and the remote copy changed since they were last
//! known to agree, reconciliation stops and records a [`ReviewSession`]. It
//! holds both sides, the diff between them and the remote validator seen at
//! that moment. The session ends with one of three [`Resolution`]s.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::diff::{DiffStats, DiffToken, build_review, has_changes, render::render_html};
use crate::error::SyncError;
use crate::snapshot::digest_of;

/// A conflict between the local draft and the remote copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSession {
    /// Document key
    pub document_key: String,

    /// Normalized local draft
    pub local_content: String,

    /// Normalized remote body
    pub remote_content: String,

    /// Validator of the remote representation the diff was computed against
    pub remote_etag: Option<String>,

    /// Digest of `remote_content`
    pub remote_digest: String,

    /// Diff with the remote as base
    pub tokens: Vec<DiffToken>,

    /// Why the review was opened, when not a plain conflict
    pub message: Option<String>,

    /// When the conflict was detected
    pub opened_at: DateTime<Utc>,
}

impl ReviewSession {
    /// Open a review of `local` against `remote`.
    pub fn open(
        document_key: impl Into<String>,
        local: &str,
        remote: &str,
        remote_etag: Option<String>,
    ) -> Self {
        let tokens = build_review(local, remote);
        let local_content = crate::snapshot::normalize(local);
        let remote_content = crate::snapshot::normalize(remote);
        Self {
            document_key: document_key.into(),
            remote_digest: digest_of(&remote_content),
            local_content,
            remote_content,
            remote_etag,
            tokens,
            message: None,
            opened_at: Utc::now(),
        }
    }

    /// Attach an explanatory message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Whether the two sides actually differ.
    ///
    /// A review without changes is resolved as a no-op.
    pub fn has_changes(&self) -> bool {
        has_changes(&self.tokens)
    }

    /// Counts of changed runs.
    pub fn stats(&self) -> DiffStats {
        DiffStats::from_tokens(&self.tokens)
    }

    /// The diff rendered as HTML.
    pub fn render_html(&self) -> String {
        render_html(&self.tokens)
    }
}

/// How to end a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// Keep the local draft, overwrite the remote
    KeepLocal,

    /// Keep the remote copy, replace the local draft
    KeepRemote,

    /// Save the (possibly edited) merged content and push it
    AcceptMerged {
        /// The merged content
        content: String,
    },
}

impl FromStr for Resolution {
    type Err = SyncError;

    /// Parses the content-free resolutions; `merged` needs its content
    /// supplied separately.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "keep_local" | "keep-local" => Ok(Resolution::KeepLocal),
            "remote" | "keep_remote" | "keep-remote" => Ok(Resolution::KeepRemote),
            other => Err(SyncError::InvalidResolution(other.to_string())),
        }
    }
}

impl Resolution {
    /// Check if this resolution pushes a local version
    pub fn keeps_local(&self) -> bool {
        matches!(
            self,
            Resolution::KeepLocal | Resolution::AcceptMerged { .. }
        )
    }

    /// Check if this resolution takes the remote version
    pub fn keeps_remote(&self) -> bool {
        matches!(self, Resolution::KeepRemote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_review() {
        let review = ReviewSession::open(
            "doc",
            "<p>Hello brave world</p>",
            "<p contenteditable=\"true\">Hello cruel world</p>",
            Some("\"r2\"".to_string()),
        );
        assert!(review.has_changes());
        assert_eq!(review.remote_content, "<p>Hello cruel world</p>");
        assert_eq!(review.remote_digest, digest_of("<p>Hello cruel world</p>"));
        assert_eq!(review.stats().added, 1);
        assert!(review.render_html().contains("diff-added"));
        assert!(review.message.is_none());
    }

    #[test]
    fn test_review_without_changes() {
        let review = ReviewSession::open("doc", "<p>x</p>\r\n", "<p>x</p>\n", None);
        assert!(!review.has_changes());
    }

    #[test]
    fn test_resolution_from_str() {
        assert_eq!(Resolution::from_str("local").ok(), Some(Resolution::KeepLocal));
        assert_eq!(
            Resolution::from_str("Keep-Remote").ok(),
            Some(Resolution::KeepRemote)
        );
        assert!(matches!(
            Resolution::from_str("merged"),
            Err(SyncError::InvalidResolution(s)) if s == "merged"
        ));
        assert!(Resolution::from_str("both").is_err());
    }

    #[test]
    fn test_resolution_keeps_versions() {
        assert!(Resolution::KeepLocal.keeps_local());
        assert!(!Resolution::KeepLocal.keeps_remote());
        assert!(Resolution::KeepRemote.keeps_remote());

        let merged = Resolution::AcceptMerged {
            content: "merged".to_string(),
        };
        assert!(merged.keeps_local());
        assert!(!merged.keeps_remote());
    }
}
