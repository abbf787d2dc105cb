//! Turning parse nodes and regex matches into escapable snippets.

pub mod math;
pub mod svelte;
pub mod tree;
pub mod verbatim;

use std::sync::LazyLock;

use regex::Regex;

use crate::lines::LineIndex;
use crate::padding::{Pad, Padding};
use crate::snippet::Offset;

static CONTAINER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:>|- |\d+\.\s)").expect("valid regex"));
static CONTAINER_OR_BLANK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:>|- |\d+\.\s|$)").expect("valid regex"));

/// Padding for a block-level snippet (code blocks, frontmatter).
///
/// Two newlines each side unless the surroundings already isolate the block.
/// Inside a blockquote or list item the left side gets nothing, so the block
/// stays in its container.
pub(crate) fn block_padding(lines: &LineIndex, loc: Offset) -> Padding {
    let start_line = lines.position(loc.start).line;
    let end_line = lines.position(loc.end).line;

    let before = lines.before(loc.start);
    let mut left = Pad::Newlines(2);
    if before.trim().is_empty() {
        let previous_blank = start_line == 0 || lines.is_blank(start_line - 1);
        left = if previous_blank {
            Pad::from(before)
        } else {
            Pad::from(format!("\n{before}"))
        };
    }
    if CONTAINER_LINE.is_match(lines.line(start_line).unwrap_or_default()) {
        left = Pad::Newlines(0);
    }

    let mut right = Pad::Newlines(2);
    if lines.after(loc.end).trim().is_empty() {
        right = match lines.line(end_line + 1) {
            Some(next) if !CONTAINER_OR_BLANK_LINE.is_match(next) => Pad::Newlines(1),
            _ => Pad::Newlines(0),
        };
    }
    Padding::Sides(left, right)
}

/// One newline on a side whose neighbouring line has text, two where it is
/// blank.
pub(crate) fn logic_block_padding(lines: &LineIndex, loc: Offset) -> Padding {
    let start_line = lines.position(loc.start).line;
    let end_line = lines.position(loc.end).line;
    let side = |blank: bool| Pad::Newlines(if blank { 2 } else { 1 });
    let before_blank = start_line > 0 && lines.is_blank(start_line - 1);
    Padding::Sides(side(before_blank), side(lines.is_blank(end_line + 1)))
}

/// Drop one whitespace character from each end; `\r\n` counts as one.
pub(crate) fn trim_one(s: &str) -> &str {
    let s = s
        .strip_prefix("\r\n")
        .or_else(|| s.strip_prefix(char::is_whitespace))
        .unwrap_or(s);
    s.strip_suffix("\r\n")
        .or_else(|| s.strip_suffix(char::is_whitespace))
        .unwrap_or(s)
}
