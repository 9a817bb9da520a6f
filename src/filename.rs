//! Filename pattern expansion
//!
//! Patterns contain `{{TOKEN}}` markers that are replaced with per-row values.
//! The resolver does NOT sanitize characters that are invalid in file names:
//! the rendering backend owns that step, and filenames produced here must
//! match what the backend is asked to use.
//!
//! # Examples
//!
//! ```
//! use batchdoc::filename::{insert_token, resolve};
//! use batchdoc::row::RowRecord;
//!
//! let row = RowRecord::new().with("NAME", "Alice").with("ID", 17i64);
//! let pattern = insert_token("Receipt_{{NAME}}_", "ID");
//!
//! assert_eq!(pattern, "Receipt_{{NAME}}_{{ID}}");
//! assert_eq!(resolve(&pattern, &row), "Receipt_Alice_17");
//! ```

use crate::reconcile::HeaderSet;
use crate::row::RowRecord;
use once_cell::sync::Lazy;
use regex::Regex;

static MARKER: Lazy<Regex> = Lazy::new(|| {
    // Non-greedy and non-nested: `{{A}}{{B}}` yields two markers.
    Regex::new(r"\{\{([^{}]*?)\}\}").expect("marker regex is valid")
});

/// Expand every `{{TOKEN}}` marker in `pattern` with the row's value.
///
/// Keys are matched exactly first, then ignoring case. A token with no value
/// in the row expands to the empty string.
pub fn resolve(pattern: &str, row: &RowRecord) -> String {
    MARKER
        .replace_all(pattern, |caps: &regex::Captures<'_>| {
            row.lookup(&caps[1])
                .map(|value| value.to_string())
                .unwrap_or_default()
        })
        .into_owned()
}

/// Append a `{{token}}` marker to the end of `pattern`.
///
/// Repeated calls append repeatedly.
pub fn insert_token(pattern: &str, token: &str) -> String {
    format!("{pattern}{{{{{token}}}}}")
}

/// Tokens referenced by `pattern`, in order of appearance.
pub fn pattern_tokens(pattern: &str) -> Vec<String> {
    MARKER
        .captures_iter(pattern)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Tokens in `pattern` that match no header, exactly or ignoring case.
pub fn unknown_tokens(pattern: &str, headers: &HeaderSet) -> Vec<String> {
    let mut unknown = Vec::new();
    for token in pattern_tokens(pattern) {
        let lowered = token.to_lowercase();
        let known =
            headers.contains(&token) || headers.iter().any(|h| h.to_lowercase() == lowered);
        if !known && !unknown.contains(&token) {
            unknown.push(token);
        }
    }
    unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_basic() {
        let row = RowRecord::new().with("NAME", "Alice");
        assert_eq!(resolve("Receipt_{{NAME}}", &row), "Receipt_Alice");
    }

    #[test]
    fn test_resolve_missing_token_is_empty() {
        assert_eq!(resolve("Receipt_{{NAME}}", &RowRecord::new()), "Receipt_");
    }

    #[test]
    fn test_resolve_without_markers_is_identity() {
        let row = RowRecord::new().with("NAME", "Alice");
        assert_eq!(resolve("plain_name", &row), "plain_name");
        assert_eq!(resolve("", &row), "");
        assert_eq!(resolve("{single}", &row), "{single}");
    }

    #[test]
    fn test_resolve_case_insensitive_fallback() {
        let row = RowRecord::new().with("student_name", "Bob");
        assert_eq!(resolve("{{STUDENT_NAME}}", &row), "Bob");
    }

    #[test]
    fn test_resolve_prefers_exact_key() {
        let row = RowRecord::new().with("name", "lower").with("NAME", "upper");
        assert_eq!(resolve("{{name}}-{{NAME}}", &row), "lower-upper");
    }

    #[test]
    fn test_resolve_adjacent_and_numeric() {
        let row = RowRecord::new().with("ID", 7i64).with("NAME", "Eve");
        assert_eq!(resolve("{{ID}}{{NAME}}", &row), "7Eve");
    }

    #[test]
    fn test_resolve_does_not_sanitize() {
        let row = RowRecord::new().with("PATH", "a/b:c");
        assert_eq!(resolve("doc_{{PATH}}", &row), "doc_a/b:c");
    }

    #[test]
    fn test_resolve_unclosed_marker_left_alone() {
        let row = RowRecord::new().with("NAME", "Alice");
        assert_eq!(resolve("{{NAME}}_{{NAME", &row), "Alice_{{NAME");
    }

    #[test]
    fn test_insert_token_appends() {
        assert_eq!(
            insert_token("Receipt_{{NAME}}", "ID"),
            "Receipt_{{NAME}}{{ID}}"
        );
        let twice = insert_token(&insert_token("", "ID"), "ID");
        assert_eq!(twice, "{{ID}}{{ID}}");
    }

    #[test]
    fn test_pattern_tokens() {
        assert_eq!(
            pattern_tokens("{{A}}_{{B}}-{{A}}"),
            vec!["A".to_string(), "B".to_string(), "A".to_string()]
        );
        assert!(pattern_tokens("none").is_empty());
    }

    #[test]
    fn test_unknown_tokens() {
        let headers = HeaderSet::from_names(["STUDENT_NAME", "Amount"]);
        assert_eq!(
            unknown_tokens("{{student_name}}_{{AMOUNT}}_{{DATE}}_{{DATE}}", &headers),
            vec!["DATE".to_string()]
        );
    }
}
