//! The reconcile transition function.
//!
//! [`decide`] looks at what the conditional GET observed and what is known
//! locally and returns what to do next. It performs no I/O, so every branch
//! is tested here with plain values.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::item::LocalDocumentItem;
use crate::remote::{Precondition, is_weak_etag};

/// Precondition a push is sent under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "kind")]
pub enum PushPrecondition {
    /// `If-Match: <etag>`, overwrite only the representation we saw
    IfMatch {
        /// Validator of that representation
        etag: String,
    },
    /// `If-None-Match: *`, create only if still missing
    IfNoneMatchAny,
    /// The remote returned no validator to condition on
    Unconditional,
}

impl PushPrecondition {
    /// `If-Match` on `etag` if one is known and strong.
    ///
    /// `If-Match` compares strongly, so a weak validator could never match;
    /// the digest comparison that led to the push stands in for it.
    pub fn if_match(etag: Option<&str>) -> Self {
        match etag.filter(|etag| !is_weak_etag(etag)) {
            Some(etag) => PushPrecondition::IfMatch {
                etag: etag.to_string(),
            },
            None => PushPrecondition::Unconditional,
        }
    }
}

impl From<PushPrecondition> for Precondition {
    fn from(value: PushPrecondition) -> Self {
        match value {
            PushPrecondition::IfMatch { etag } => Precondition::IfMatch(etag),
            PushPrecondition::IfNoneMatchAny => Precondition::IfNoneMatchAny,
            PushPrecondition::Unconditional => Precondition::None,
        }
    }
}

/// What a reconcile pass should do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type")]
pub enum SyncDecision {
    /// Both sides already agree
    NoOp,
    /// Replace the local draft with the remote copy
    PullRemote,
    /// Write the local draft to the remote
    PushLocal {
        /// Precondition the PUT is sent under
        precondition: PushPrecondition,
    },
    /// Both sides changed; ask the user
    NeedsReview,
}

/// What the conditional GET observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteObservation<'a> {
    /// 200 with a body whose normalized digest is `digest`
    Fetched {
        /// Digest of the normalized body
        digest: &'a str,
        /// Validator of the representation
        etag: Option<&'a str>,
    },
    /// 304 on the known validator
    NotModified,
    /// 404
    NotFound,
}

/// Everything [`decide`] looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionInput<'a> {
    /// Digest of the pending local item, if there is one
    pub pending_digest: Option<&'a str>,
    /// Digest of the latest local item, pending or not
    pub local_digest: Option<&'a str>,
    /// Digest both sides were last known to share
    pub common_digest: Option<&'a str>,
    /// Validator the GET was conditioned on
    pub known_etag: Option<&'a str>,
    /// What the GET observed
    pub remote: RemoteObservation<'a>,
}

/// The remote is gone and there is nothing local to recreate it from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteGone;

/// Digest of the latest item if it is a pending local edit.
///
/// An item is pending when it exists, has not been published, and differs
/// from the known-common content.
pub fn pending_digest<'a>(
    latest: Option<&'a LocalDocumentItem>,
    common_digest: Option<&str>,
) -> Option<&'a str> {
    latest
        .filter(|item| !item.is_published())
        .filter(|item| common_digest != Some(item.digest.as_str()))
        .map(|item| item.digest.as_str())
}

/// Decide the next step of a reconcile pass.
pub fn decide(input: &DecisionInput<'_>) -> Result<SyncDecision, RemoteGone> {
    let pending = input.pending_digest.is_some();

    match input.remote {
        RemoteObservation::Fetched { digest, etag } => {
            if input.local_digest == Some(digest) {
                return Ok(SyncDecision::NoOp);
            }
            let remote_changed = input.common_digest != Some(digest);
            Ok(match (pending, remote_changed) {
                (true, false) => SyncDecision::PushLocal {
                    precondition: PushPrecondition::if_match(etag),
                },
                (true, true) => SyncDecision::NeedsReview,
                (false, true) => SyncDecision::PullRemote,
                (false, false) => SyncDecision::NoOp,
            })
        }
        RemoteObservation::NotModified if pending => Ok(SyncDecision::PushLocal {
            precondition: PushPrecondition::if_match(input.known_etag),
        }),
        RemoteObservation::NotModified => Ok(SyncDecision::NoOp),
        RemoteObservation::NotFound if pending => Ok(SyncDecision::PushLocal {
            precondition: PushPrecondition::IfNoneMatchAny,
        }),
        RemoteObservation::NotFound => Err(RemoteGone),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Snapshot;

    fn input<'a>(
        pending: Option<&'a str>,
        common: Option<&'a str>,
        remote: RemoteObservation<'a>,
    ) -> DecisionInput<'a> {
        DecisionInput {
            pending_digest: pending,
            local_digest: pending.or(common),
            common_digest: common,
            known_etag: Some("\"r1\""),
            remote,
        }
    }

    fn fetched(digest: &str) -> RemoteObservation<'_> {
        RemoteObservation::Fetched {
            digest,
            etag: Some("\"r2\""),
        }
    }

    #[test]
    fn test_fetched_equal_digests_is_noop() {
        assert_eq!(
            decide(&input(Some("L"), Some("C"), fetched("L"))),
            Ok(SyncDecision::NoOp)
        );
        assert_eq!(
            decide(&input(None, Some("C"), fetched("C"))),
            Ok(SyncDecision::NoOp)
        );
    }

    #[test]
    fn test_fetched_only_local_changed_pushes_with_observed_etag() {
        assert_eq!(
            decide(&input(Some("L"), Some("C"), fetched("C"))),
            Ok(SyncDecision::PushLocal {
                precondition: PushPrecondition::IfMatch {
                    etag: "\"r2\"".into()
                }
            })
        );
    }

    #[test]
    fn test_fetched_only_remote_changed_pulls() {
        assert_eq!(
            decide(&input(None, Some("C"), fetched("R"))),
            Ok(SyncDecision::PullRemote)
        );
    }

    #[test]
    fn test_fetched_both_changed_needs_review() {
        assert_eq!(
            decide(&input(Some("L"), Some("C"), fetched("R"))),
            Ok(SyncDecision::NeedsReview)
        );
    }

    #[test]
    fn test_first_contact() {
        assert_eq!(
            decide(&input(Some("L"), None, fetched("R"))),
            Ok(SyncDecision::NeedsReview)
        );
        assert_eq!(
            decide(&input(Some("L"), None, fetched("L"))),
            Ok(SyncDecision::NoOp)
        );
        assert_eq!(
            decide(&input(None, None, fetched("R"))),
            Ok(SyncDecision::PullRemote)
        );
    }

    #[test]
    fn test_fetched_without_etag_pushes_unconditionally() {
        let remote = RemoteObservation::Fetched {
            digest: "C",
            etag: None,
        };
        assert_eq!(
            decide(&input(Some("L"), Some("C"), remote)),
            Ok(SyncDecision::PushLocal {
                precondition: PushPrecondition::Unconditional
            })
        );
    }

    #[test]
    fn test_weak_validator_is_not_used_for_if_match() {
        let remote = RemoteObservation::Fetched {
            digest: "C",
            etag: Some("W/\"r1\""),
        };
        assert_eq!(
            decide(&input(Some("L"), Some("C"), remote)),
            Ok(SyncDecision::PushLocal {
                precondition: PushPrecondition::Unconditional
            })
        );
        assert_eq!(
            PushPrecondition::if_match(Some("\"r1\"")),
            PushPrecondition::IfMatch {
                etag: "\"r1\"".into()
            }
        );
    }

    #[test]
    fn test_not_modified() {
        assert_eq!(
            decide(&input(Some("L"), Some("C"), RemoteObservation::NotModified)),
            Ok(SyncDecision::PushLocal {
                precondition: PushPrecondition::IfMatch {
                    etag: "\"r1\"".into()
                }
            })
        );
        assert_eq!(
            decide(&input(None, Some("C"), RemoteObservation::NotModified)),
            Ok(SyncDecision::NoOp)
        );
    }

    #[test]
    fn test_not_found() {
        assert_eq!(
            decide(&input(Some("L"), None, RemoteObservation::NotFound)),
            Ok(SyncDecision::PushLocal {
                precondition: PushPrecondition::IfNoneMatchAny
            })
        );
        assert_eq!(
            decide(&input(None, Some("C"), RemoteObservation::NotFound)),
            Err(RemoteGone)
        );
    }

    #[test]
    fn test_pending_digest() {
        let item = LocalDocumentItem::new("doc", "text/html", Snapshot::from_content("x"));
        let digest = item.digest.clone();

        assert_eq!(pending_digest(Some(&item), None), Some(digest.as_str()));
        assert_eq!(pending_digest(Some(&item), Some("other")), Some(digest.as_str()));
        assert_eq!(pending_digest(Some(&item), Some(&digest)), None);
        assert_eq!(pending_digest(None, None), None);

        let published = item.clone().published();
        assert_eq!(pending_digest(Some(&published), None), None);
    }

    #[test]
    fn test_push_precondition_into_wire() {
        assert_eq!(
            Precondition::from(PushPrecondition::IfMatch { etag: "r1".into() }),
            Precondition::IfMatch("r1".into())
        );
        assert_eq!(
            Precondition::from(PushPrecondition::Unconditional),
            Precondition::None
        );
    }
}
