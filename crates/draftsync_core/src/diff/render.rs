//! HTML display adapter for review diffs.
//!
//! Added text is wrapped in `<ins class="diff-added">`, removed text in
//! `<del class="diff-removed">`. Markup that was added is emitted as-is so the
//! rendered diff keeps the local structure; markup that was removed is left out.
//!
//! [`accept_edited`] reverses the rendering: removed runs are dropped and added
//! runs unwrapped. The user may edit the rendered diff before accepting it.

use std::sync::LazyLock;

use regex::Regex;

use super::{DiffToken, tokenize};
use crate::snapshot::normalize;

const INS_OPEN: &str = "<ins class=\"diff-added\">";
const DEL_OPEN: &str = "<del class=\"diff-removed\">";

static REMOVED_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)<del class="diff-removed">.*?</del>"#).expect("valid regex"));

static ADDED_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)<ins class="diff-added">(.*?)</ins>"#).expect("valid regex"));

/// Render diff runs as HTML for review.
pub fn render_html(tokens: &[DiffToken]) -> String {
    let mut out = String::new();
    for token in tokens {
        if !token.is_change() {
            out.push_str(&token.text);
            continue;
        }

        let (open, close) = if token.added {
            (INS_OPEN, "</ins>")
        } else {
            (DEL_OPEN, "</del>")
        };

        let mut text = String::new();
        for unit in tokenize(&token.text) {
            if is_markup(unit) {
                flush(&mut out, &mut text, open, close);
                if token.added {
                    out.push_str(unit);
                }
            } else {
                text.push_str(unit);
            }
        }
        flush(&mut out, &mut text, open, close);
    }
    out
}

fn is_markup(unit: &str) -> bool {
    unit.len() > 1 && unit.starts_with('<') && unit.ends_with('>')
}

fn flush(out: &mut String, text: &mut String, open: &str, close: &str) {
    if !text.is_empty() {
        out.push_str(open);
        out.push_str(text);
        out.push_str(close);
        text.clear();
    }
}

/// Turn a (possibly edited) rendered diff back into document content.
pub fn accept_edited(rendered: &str) -> String {
    let without_removed = REMOVED_RUN.replace_all(rendered, "");
    let unwrapped = ADDED_RUN.replace_all(&without_removed, "$1");
    normalize(&unwrapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::build_review;

    #[test]
    fn test_render_marks_changes() {
        let tokens = build_review("<p>Hello brave world</p>", "<p>Hello cruel world</p>");
        assert_eq!(
            render_html(&tokens),
            "<p>Hello <del class=\"diff-removed\">cruel</del><ins class=\"diff-added\">brave</ins> world</p>"
        );
    }

    #[test]
    fn test_added_markup_is_kept_removed_markup_dropped() {
        let tokens = build_review("<p>a</p><p>new para</p>", "<p>a</p><ul><li>gone</li></ul>");
        let html = render_html(&tokens);
        assert!(html.contains("<ins class=\"diff-added\">new para</ins>"));
        assert!(html.contains("<del class=\"diff-removed\">gone</del>"));
        assert!(!html.contains("<ul>"));
    }

    #[test]
    fn test_accept_unedited_yields_local() {
        let cases = [
            ("<p>Hello brave world</p>", "<p>Hello cruel world</p>"),
            ("<p>a</p><p>new para</p>", "<p>a</p><ul><li>gone</li></ul>"),
            ("", "<p>all gone</p>"),
            ("<h1 contenteditable=\"true\">T</h1>\r\n", "<h1>T</h1>\n<p>x</p>"),
            ("a < b", "a > b"),
        ];
        for (local, remote) in cases {
            let tokens = build_review(local, remote);
            assert_eq!(accept_edited(&render_html(&tokens)), normalize(local));
        }
    }

    #[test]
    fn test_accept_user_edit() {
        let rendered = "<p>Hello <del class=\"diff-removed\">cruel</del><ins class=\"diff-added\">brave</ins> new world</p>";
        assert_eq!(accept_edited(rendered), "<p>Hello brave new world</p>");
    }
}
