use crate::config::EscapeConfig;
use crate::padding::Padding;
use crate::snippet::{EscapableSnippet, Offset, ProcessorOptions, SnippetType, VerbatimOptions};
use crate::tags::{TagMatcher, TagRegex, parse_tag};

/// Verbatim elements in `document`; empty when no environment is configured.
pub fn verbatim_elements(document: &str, config: &EscapeConfig) -> Vec<Offset> {
    let tags = config.verbatim_tags();
    if tags.is_empty() {
        return Vec::new();
    }
    TagRegex::self_closing_or_normal(tags.as_slice()).find(document)
}

pub fn snippets(
    document: &str,
    elements: &[Offset],
    config: &EscapeConfig,
) -> Vec<EscapableSnippet> {
    elements
        .iter()
        .filter_map(|&loc| snippet(document, loc, config))
        .collect()
}

fn snippet(document: &str, loc: Offset, config: &EscapeConfig) -> Option<EscapableSnippet> {
    let outer = &document[loc.to_range()];
    let parsed = parse_tag(outer)?;
    let environment = config.verbatim.get(&parsed.tag)?;

    let inline = parsed
        .attributes
        .get("inline")
        .or_else(|| environment.default_attributes.get("inline"))
        .is_some_and(|value| value.is_true());
    let inner = if inline {
        let trimmed = parsed.inner_content.as_str();
        let trimmed = trimmed.strip_prefix([' ', '\n']).unwrap_or(trimmed);
        trimmed.strip_suffix([' ', '\n']).unwrap_or(trimmed)
    } else {
        parsed.inner_content.as_str()
    };

    let inner_at = document[..loc.end].rfind(inner).unwrap_or(loc.start);
    let line_offset = 1 + document[..inner_at].matches('\n').count();

    let mut attributes = environment.default_attributes.clone();
    attributes.extend(parsed.attributes.clone());

    let options = VerbatimOptions {
        tag: parsed.tag.clone(),
        attributes,
        self_closing: parsed.self_closing,
        outer_content: outer.to_owned(),
        line_offset,
        inline,
    };
    Some(EscapableSnippet::processable(
        SnippetType::Verbatim,
        document,
        loc,
        inner,
        ProcessorOptions::Verbatim(options),
        Padding::from(if inline { 0usize } else { 2 }),
        !inline,
    ))
}
