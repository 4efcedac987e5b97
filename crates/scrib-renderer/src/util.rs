//! Shared string helpers for markdown assembly.

use std::sync::LazyLock;

use regex::Regex;

/// Three or more consecutive newlines.
static NEWLINE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("invalid newline run regex"));

/// A newline together with surrounding whitespace.
static LINE_BREAK_WITH_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]*(?:\r?\n[ \t]*)+").expect("invalid line break regex"));

/// Collapse runs of 3+ newlines to a blank line and trim the result.
///
/// # Examples
///
/// ```
/// use scrib_renderer::collapse_newlines;
///
/// assert_eq!(collapse_newlines("\n\n# A\n\n\n\nB\n"), "# A\n\nB");
/// ```
#[must_use]
pub fn collapse_newlines(markdown: &str) -> String {
    NEWLINE_RUN.replace_all(markdown, "\n\n").trim().to_owned()
}

/// Join lines into a single line, replacing each line break with one space.
pub(crate) fn join_lines(text: &str) -> String {
    LINE_BREAK_WITH_SPACE.replace_all(text, " ").into_owned()
}

/// Prefix the first line with `first` and indent the rest with `rest`.
///
/// Blank continuation lines stay empty.
pub(crate) fn prefix_lines(content: &str, first: &str, rest: &str) -> String {
    let mut out = String::with_capacity(content.len() + first.len());
    for (index, line) in content.lines().enumerate() {
        if index == 0 {
            out.push_str(first);
            out.push_str(line);
        } else {
            out.push('\n');
            if !line.trim().is_empty() {
                out.push_str(rest);
                out.push_str(line);
            }
        }
    }
    out
}

/// Escape a table cell: literal pipes become `\|`, line breaks become spaces.
pub(crate) fn escape_table_cell(content: &str) -> String {
    join_lines(&content.replace('|', "\\|"))
}

/// Backtick run one longer than the longest run in `content`, at least `min`.
pub(crate) fn backtick_fence(content: &str, min: usize) -> String {
    let longest = content
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    "`".repeat(longest.saturating_add(1).max(min))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_newlines_is_idempotent() {
        let once = collapse_newlines("a\n\n\n\n\nb\n\n\nc");
        assert_eq!(once, "a\n\nb\n\nc");
        assert_eq!(collapse_newlines(&once), once);
    }

    #[test]
    fn test_collapse_newlines_keeps_single_and_double() {
        assert_eq!(collapse_newlines("a\nb\n\nc"), "a\nb\n\nc");
    }

    #[test]
    fn test_prefix_lines() {
        assert_eq!(prefix_lines("a\nb", "- ", "  "), "- a\n  b");
        assert_eq!(prefix_lines("a\n\nb", "10. ", "    "), "10. a\n\n    b");
    }

    #[test]
    fn test_escape_table_cell() {
        assert_eq!(escape_table_cell("a|b"), "a\\|b");
        assert_eq!(escape_table_cell("line one\n\n  line two"), "line one line two");
    }

    #[test]
    fn test_backtick_fence() {
        assert_eq!(backtick_fence("plain", 1), "`");
        assert_eq!(backtick_fence("a `b` c", 1), "``");
        assert_eq!(backtick_fence("```rust", 3), "````");
        assert_eq!(backtick_fence("no ticks", 3), "```");
    }
}
