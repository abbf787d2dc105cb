use std::sync::LazyLock;

use crate::colons::escaped_name;
use crate::padding::Padding;
use crate::snippet::{EscapableSnippet, Offset, SnippetType};
use crate::tags::{TagMatcher, TagRegex};

/// Containers that always come as open/close pairs.
pub const CONTAINER_TAGS: [&str; 2] = ["script", "style"];

/// Special single-instance elements, by their name after the colon.
const SPECIAL_ELEMENTS: [&str; 4] = ["window", "document", "body", "options"];

static CONTAINERS: LazyLock<TagRegex> = LazyLock::new(|| TagRegex::normal(&CONTAINER_TAGS));

static SPECIALS: LazyLock<TagRegex> = LazyLock::new(|| {
    let names: Vec<String> = SPECIAL_ELEMENTS.iter().map(|name| escaped_name(name)).collect();
    TagRegex::self_closing_or_normal(&names)
});

/// Container and special elements in a colon-escaped document.
pub fn container_elements(document: &str) -> Vec<Offset> {
    let mut found = CONTAINERS.find(document);
    found.extend(SPECIALS.find(document));
    found.sort_by_key(|loc| loc.start);
    found
}

pub fn snippets(document: &str, elements: &[Offset]) -> Vec<EscapableSnippet> {
    elements
        .iter()
        .map(|&loc| {
            EscapableSnippet::passthrough(
                SnippetType::Svelte,
                document,
                loc,
                Padding::from(2usize),
                true,
            )
        })
        .collect()
}
