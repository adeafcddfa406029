//! Token-level diff between the local draft and the remote copy.
//!
//! Both sides are normalized, split into markup (`<...>`), whitespace and word
//! units, and compared with a Myers diff. The remote copy is the base and the
//! local draft the target, so `added` marks what the local edit introduced and
//! `removed` what it would drop from the remote.
//!
//! Rendering for display lives in [`render`]; this module is pure.

pub mod render;

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use similar::{Algorithm, DiffOp, DiffTag};
use ts_rs::TS;

use crate::snapshot::normalize;

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>|\s+|[^<\s]+|<").expect("valid regex"));

/// A run of text that is unchanged, added, or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DiffToken {
    /// The text of the run
    pub text: String,
    /// Present only in the local draft
    pub added: bool,
    /// Present only in the remote copy
    pub removed: bool,
}

impl DiffToken {
    fn unchanged(text: &str) -> Self {
        Self {
            text: text.to_string(),
            added: false,
            removed: false,
        }
    }

    fn added(text: &str) -> Self {
        Self {
            added: true,
            ..Self::unchanged(text)
        }
    }

    fn removed(text: &str) -> Self {
        Self {
            removed: true,
            ..Self::unchanged(text)
        }
    }

    /// Whether this run differs between the two sides.
    pub fn is_change(&self) -> bool {
        self.added || self.removed
    }

    fn same_kind(&self, other: &DiffToken) -> bool {
        self.added == other.added && self.removed == other.removed
    }
}

/// Split content into markup, whitespace and word units.
///
/// Concatenating the units yields the input again.
pub fn tokenize(content: &str) -> Vec<&str> {
    TOKEN.find_iter(content).map(|m| m.as_str()).collect()
}

/// Diff `local` against `remote` for review.
pub fn build_review(local: &str, remote: &str) -> Vec<DiffToken> {
    let local = normalize(local);
    let remote = normalize(remote);
    diff_tokens(&tokenize(&remote), &tokenize(&local))
}

/// Whether any run was added or removed.
pub fn has_changes(tokens: &[DiffToken]) -> bool {
    tokens.iter().any(DiffToken::is_change)
}

/// Myers diff of `target` against `base`, coalesced into runs.
///
/// At a point where both sides changed, removals are emitted before additions.
/// Memory stays linear in the input; past [`DIFF_DEADLINE`] the remaining
/// region is reported as a plain replacement.
pub fn diff_tokens(base: &[&str], target: &[&str]) -> Vec<DiffToken> {
    let mut runs: Vec<DiffToken> = Vec::new();
    for op in capture_diff(base, target) {
        let (tag, old, new) = op.as_tag_tuple();
        let removed = || base[old.clone()].iter().map(|t| DiffToken::removed(t));
        let added = || target[new.clone()].iter().map(|t| DiffToken::added(t));
        match tag {
            DiffTag::Equal => {
                for token in &base[old.clone()] {
                    push_run(&mut runs, DiffToken::unchanged(token));
                }
            }
            DiffTag::Delete => removed().for_each(|t| push_run(&mut runs, t)),
            DiffTag::Insert => added().for_each(|t| push_run(&mut runs, t)),
            DiffTag::Replace => {
                removed().for_each(|t| push_run(&mut runs, t));
                added().for_each(|t| push_run(&mut runs, t));
            }
        }
    }
    runs
}

/// Upper bound on time spent looking for a minimal diff.
pub const DIFF_DEADLINE: Duration = Duration::from_secs(2);

#[cfg(not(target_arch = "wasm32"))]
fn capture_diff(base: &[&str], target: &[&str]) -> Vec<DiffOp> {
    let deadline = std::time::Instant::now() + DIFF_DEADLINE;
    similar::capture_diff_slices_deadline(Algorithm::Myers, base, target, Some(deadline))
}

#[cfg(target_arch = "wasm32")]
fn capture_diff(base: &[&str], target: &[&str]) -> Vec<DiffOp> {
    similar::capture_diff_slices(Algorithm::Myers, base, target)
}

fn push_run(runs: &mut Vec<DiffToken>, token: DiffToken) {
    match runs.last_mut() {
        Some(last) if last.same_kind(&token) => last.text.push_str(&token.text),
        _ => runs.push(token),
    }
}

/// Counts of changed runs, for status output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffStats {
    /// Runs only in the local draft
    pub added: usize,
    /// Runs only in the remote copy
    pub removed: usize,
    /// Runs on both sides
    pub unchanged: usize,
}

impl DiffStats {
    /// Tally a diff.
    pub fn from_tokens(tokens: &[DiffToken]) -> Self {
        tokens.iter().fold(Self::default(), |mut stats, token| {
            if token.added {
                stats.added += 1;
            } else if token.removed {
                stats.removed += 1;
            } else {
                stats.unchanged += 1;
            }
            stats
        })
    }
}

impl std::fmt::Display for DiffStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "+{} -{}", self.added, self.removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_tokenize_covers_input() {
        let inputs = [
            "<p class=\"a\">Hello  world</p>\n",
            "a < b and c>d",
            "",
            "trailing <",
        ];
        for input in inputs {
            assert_eq!(tokenize(input).concat(), input);
        }
        assert_eq!(
            tokenize("<b>hi</b> there"),
            vec!["<b>", "hi", "</b>", " ", "there"]
        );
    }

    #[test]
    fn test_identical_has_no_changes() {
        let tokens = build_review("<p>same</p>", "<p>same</p>");
        assert!(!has_changes(&tokens));
        assert_eq!(tokens.len(), 1);
    }

    #[test]
    fn test_volatile_differences_are_not_changes() {
        let tokens = build_review("<p contenteditable=\"true\">same</p>\r\n", "<p>same</p>\n");
        assert!(!has_changes(&tokens));
    }

    #[test]
    fn test_replacement_emits_removed_then_added() {
        let tokens = build_review("<p>Hello brave world</p>", "<p>Hello cruel world</p>");
        assert_eq!(
            tokens,
            vec![
                DiffToken::unchanged("<p>Hello "),
                DiffToken::removed("cruel"),
                DiffToken::added("brave"),
                DiffToken::unchanged(" world</p>"),
            ]
        );
    }

    #[test]
    fn test_pure_insertion_and_deletion() {
        let tokens = build_review("one two three", "one three");
        assert!(tokens.iter().any(|t| t.added && t.text.contains("two")));
        assert!(!tokens.iter().any(|t| t.removed));

        let tokens = build_review("one three", "one two three");
        assert!(tokens.iter().any(|t| t.removed && t.text.contains("two")));
        assert!(!tokens.iter().any(|t| t.added));
    }

    fn sides(tokens: &[DiffToken]) -> (String, String) {
        let local = tokens
            .iter()
            .filter(|t| !t.removed)
            .map(|t| t.text.as_str())
            .collect();
        let remote = tokens
            .iter()
            .filter(|t| !t.added)
            .map(|t| t.text.as_str())
            .collect();
        (local, remote)
    }

    #[test]
    fn test_sides_reconstruct() {
        let local = "<h1>Title</h1><p>New intro.</p><p>Body text here.</p>";
        let remote = "<h1>Title!</h1><p>Body text there.</p><p>Outro</p>";
        let tokens = build_review(local, remote);

        let (local_side, remote_side) = sides(&tokens);
        assert_eq!(local_side, local);
        assert_eq!(remote_side, remote);
    }

    #[test]
    fn test_large_diverged_documents() {
        // Every word differs; a quadratic table would need gigabytes here
        let remote: String = (0..20_000).map(|i| format!("<p>r{}</p> ", i)).collect();
        let local: String = (0..20_000).map(|i| format!("<p>l{}</p> ", i)).collect();

        let tokens = build_review(&local, &remote);
        let (local_side, remote_side) = sides(&tokens);
        assert_eq!(local_side, local);
        assert_eq!(remote_side, remote);
        assert!(has_changes(&tokens));
    }

    #[test]
    fn test_runs_are_coalesced() {
        let tokens = build_review("a b c d", "a x y d");
        for pair in tokens.windows(2) {
            assert!(!pair[0].same_kind(&pair[1]));
        }
    }

    #[test]
    fn test_diff_stats() {
        let tokens = build_review("<p>Hello brave world</p>", "<p>Hello cruel world</p>");
        let stats = DiffStats::from_tokens(&tokens);
        assert_eq!(stats.added, 1);
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.unchanged, 2);
        assert_eq!(stats.to_string(), "+1 -1");
    }

    fn html_ish() -> impl Strategy<Value = String> {
        let markup = prop::sample::select(vec![
            "<p>",
            "</p>",
            "<p contenteditable=\"true\" class=\"a\">",
            "<span data-editor-id='7' spellcheck>",
            "<!--editor:caret-->",
            "<!-- note -->",
            "\r\n",
            "\u{200B}",
            "<",
            " ",
        ]);
        let fragment = prop_oneof![
            markup.prop_map(str::to_string),
            "[a-z ]{1,6}",
            ".{0,4}",
        ];
        prop::collection::vec(fragment, 0..24).prop_map(|parts| parts.concat())
    }

    proptest! {
        #[test]
        fn sides_reconstruct_normalized_inputs(local in html_ish(), remote in html_ish()) {
            let tokens = build_review(&local, &remote);
            let (local_side, remote_side) = sides(&tokens);
            prop_assert_eq!(local_side, normalize(&local));
            prop_assert_eq!(remote_side, normalize(&remote));
        }

        #[test]
        fn identical_inputs_have_no_changes(content in html_ish()) {
            prop_assert!(!has_changes(&build_review(&content, &content)));
        }
    }
}
