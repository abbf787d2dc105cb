//! Colon handling for `svelte:*` element names.
//!
//! Markdown tag sniffing and the tag matchers both choke on a colon inside a
//! tag name, so the colon is swapped for a fixed placeholder before anything
//! else runs and swapped back as the very last step.

use std::sync::LazyLock;

use regex::Regex;

use crate::padding::Padding;
use crate::snippet::{EscapableSnippet, Offset, SnippetType};
use crate::tags::{TagMatcher, TagRegex};

/// Replaces the colon in `svelte:<name>` tags. Only tag-name characters, so the
/// escaped tag still reads as a single name.
pub const COLON_PLACEHOLDER: &str = "-weaver-colon-";

pub const COLON_ELEMENTS: [&str; 9] = [
    "self",
    "component",
    "element",
    "fragment",
    "window",
    "document",
    "body",
    "options",
    "head",
];

static COLON_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(</?svelte):({})\b", COLON_ELEMENTS.join("|"))).expect("valid regex")
});

static COLON_MATCHER: LazyLock<TagRegex> = LazyLock::new(|| {
    let names: Vec<String> = COLON_ELEMENTS
        .iter()
        .map(|name| format!("svelte:{name}"))
        .collect();
    TagRegex::self_closing_or_normal(&names)
});

/// Tag name of a colon element after [`escape_colons`].
pub fn escaped_name(name: &str) -> String {
    format!("svelte{COLON_PLACEHOLDER}{name}")
}

pub fn escape_colons(document: &str) -> String {
    COLON_TAG
        .replace_all(document, format!("${{1}}{COLON_PLACEHOLDER}${{2}}"))
        .into_owned()
}

pub fn unescape_colons(document: &str) -> String {
    document.replace(COLON_PLACEHOLDER, ":")
}

/// One-byte snippets over the tag-name colons of every colon element in a raw
/// document: the opening colon, plus the closing one for open/close pairs.
pub fn colon_snippets(document: &str) -> Vec<EscapableSnippet> {
    let mut snippets = Vec::new();
    for element in COLON_MATCHER.find(document) {
        let text = &document[element.to_range()];
        let (Some(first), Some(last)) = (text.find(':'), text.rfind(':')) else {
            continue;
        };
        let self_closing = text.ends_with("/>");
        let mut colons = vec![first];
        if !self_closing && last != first {
            colons.push(last);
        }
        snippets.extend(colons.into_iter().map(|at| {
            let at = element.start + at;
            EscapableSnippet::passthrough(
                SnippetType::Svelte,
                document,
                Offset::new(at, at + 1),
                Padding::from(false),
                false,
            )
        }));
    }
    snippets
}
