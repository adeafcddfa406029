//! Content snapshots and digests.
//!
//! A snapshot is the normalized serialization of the editable document plus a
//! SHA-256 digest of it. Normalization strips artifacts the editor adds while
//! the document is open (line-ending differences, zero-width cursor anchors,
//! `contenteditable`/`spellcheck`/`data-editor-*` attributes, `<!--editor:...-->`
//! marker comments) so that re-rendering the same logical content always
//! yields the same digest. Text, links and structure are never touched.

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::editor::EditorSurface;
use crate::error::Result;

static EDITOR_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--\s*editor:.*?-->").expect("valid regex"));

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"<([A-Za-z][A-Za-z0-9:-]*)((?:\s+[^\s"'=<>/]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'=<>`]+))?)*)(\s*/?)>"#,
    )
    .expect("valid regex")
});

static ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\s+([^\s"'=<>/]+)(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'=<>`]+))?"#)
        .expect("valid regex")
});

const ZERO_WIDTH: [char; 2] = ['\u{200B}', '\u{FEFF}'];

/// A normalized serialization of the document and its digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Normalized content
    pub content: String,
    /// Lowercase hex SHA-256 of `content`
    pub digest: String,
}

impl Snapshot {
    /// Build a snapshot from raw (not yet normalized) content.
    pub fn from_content(raw: &str) -> Self {
        let content = normalize(raw);
        let digest = digest_of(&content);
        Self { content, digest }
    }
}

/// Strip editor-volatile artifacts from serialized content.
///
/// `normalize(normalize(x)) == normalize(x)` for every input: every pass only
/// removes characters, so it is repeated until nothing changes.
pub fn normalize(content: &str) -> String {
    let mut current = normalize_pass(content);
    loop {
        let next = normalize_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_pass(content: &str) -> String {
    let content = content.replace("\r\n", "\n").replace('\r', "\n");
    let content: String = content.chars().filter(|c| !ZERO_WIDTH.contains(c)).collect();
    let content = EDITOR_COMMENT.replace_all(&content, "");

    TAG.replace_all(&content, |caps: &regex::Captures<'_>| {
        let kept: String = ATTR
            .captures_iter(&caps[2])
            .filter(|attr| !is_volatile_attribute(&attr[1]))
            .map(|attr| attr[0].to_string())
            .collect();
        format!("<{}{}{}>", &caps[1], kept, &caps[3])
    })
    .into_owned()
}

fn is_volatile_attribute(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name == "contenteditable" || name == "spellcheck" || name.starts_with("data-editor-")
}

/// SHA-256 over the UTF-8 bytes of `content`, hex-encoded.
pub fn digest_of(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Produces snapshots of whatever the editor currently shows.
#[derive(Clone)]
pub struct Snapshotter<E: ?Sized> {
    editor: std::sync::Arc<E>,
}

impl<E: EditorSurface + ?Sized> Snapshotter<E> {
    /// Create a snapshotter reading from `editor`.
    pub fn new(editor: std::sync::Arc<E>) -> Self {
        Self { editor }
    }

    /// Read the current editable content for `document_key` and snapshot it.
    pub async fn snapshot(&self, document_key: &str) -> Result<Snapshot> {
        let raw = self.editor.read_content(document_key).await?;
        Ok(Snapshot::from_content(&raw))
    }
}
