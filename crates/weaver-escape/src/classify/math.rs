//! `\[ ... \]` display math and `\( ... \)` inline math, found by a direct
//! scan since Markdown treats both as escaped punctuation.

use super::trim_one;
use crate::config::MathSettings;
use crate::padding::Padding;
use crate::ranges::outermost_ranges;
use crate::snippet::{EscapableSnippet, MathOptions, Offset, ProcessorOptions, SnippetType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delim {
    Brackets,
    Parens,
}

impl Delim {
    fn display(self) -> bool {
        matches!(self, Delim::Brackets)
    }
}

/// Balanced delimiter pairs, nested ones included. Closers without a matching
/// opener and openers that are never closed are dropped.
fn delimited(document: &str, settings: &MathSettings) -> Vec<(Delim, Offset)> {
    let bytes = document.as_bytes();
    let mut open: Vec<(Delim, usize)> = Vec::new();
    let mut pairs = Vec::new();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] != b'\\' {
            i += 1;
            continue;
        }
        let (delim, opening) = match bytes[i + 1] {
            b'[' => (Delim::Brackets, true),
            b']' => (Delim::Brackets, false),
            b'(' => (Delim::Parens, true),
            b')' => (Delim::Parens, false),
            _ => {
                i += 2;
                continue;
            }
        };
        let enabled = match delim {
            Delim::Brackets => settings.escaped_square_brackets,
            Delim::Parens => settings.escaped_parentheses,
        };
        if enabled {
            if opening {
                open.push((delim, i));
            } else if open.last().is_some_and(|(top, _)| *top == delim) {
                if let Some((_, start)) = open.pop() {
                    pairs.push((delim, Offset::new(start, i + 2)));
                }
            }
        }
        i += 2;
    }
    pairs
}

pub fn special_delimiter_snippets(
    document: &str,
    settings: &MathSettings,
) -> Vec<EscapableSnippet> {
    let pairs = outermost_ranges(delimited(document, settings), |(_, loc)| *loc);
    pairs
        .into_iter()
        .map(|(delim, loc)| {
            let display = delim.display();
            let inner = trim_one(&document[loc.start + 2..loc.end - 2]);
            EscapableSnippet::processable(
                SnippetType::Math,
                document,
                loc,
                inner,
                ProcessorOptions::Math(MathOptions { inline: !display }),
                Padding::from(if display { 2usize } else { 0 }),
                display,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inner(snippet: &EscapableSnippet) -> &str {
        &snippet.processable.as_ref().unwrap().inner_content
    }

    #[test]
    fn display_and_inline_delimiters() {
        let doc = "a \\( x \\) b\n\\[\ny\n\\]";
        let snippets = special_delimiter_snippets(doc, &MathSettings::default());
        assert_eq!(snippets.len(), 2);
        assert_eq!(inner(&snippets[0]), "x");
        assert!(!snippets[0].unescape_options.remove_paragraph_tag);
        assert_eq!(snippets[0].escape_options.pad, Some(Padding::from(0usize)));
        assert_eq!(inner(&snippets[1]), "y");
        assert!(snippets[1].unescape_options.remove_paragraph_tag);
        assert_eq!(snippets[1].escape_options.pad, Some(Padding::from(2usize)));
    }

    #[test]
    fn unbalanced_delimiters_are_skipped() {
        let doc = "\\) stray \\( open \\[ a \\) b \\]";
        let snippets = special_delimiter_snippets(doc, &MathSettings::default());
        assert_eq!(snippets.len(), 1);
        assert_eq!(inner(&snippets[0]), "a \\) b");
    }

    #[test]
    fn nested_pairs_resolve_to_the_outer_one() {
        let doc = "\\[ f\\(x\\) \\]";
        let snippets = special_delimiter_snippets(doc, &MathSettings::default());
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].outer_content(), doc);
    }

    #[test]
    fn escaped_backslash_is_not_a_delimiter() {
        let doc = "\\\\(not math\\\\)";
        assert!(special_delimiter_snippets(doc, &MathSettings::default()).is_empty());
    }

    #[test]
    fn each_style_can_be_disabled() {
        let doc = "\\(a\\) \\[b\\]";
        let settings = MathSettings {
            escaped_parentheses: false,
            ..Default::default()
        };
        let snippets = special_delimiter_snippets(doc, &settings);
        assert_eq!(snippets.len(), 1);
        assert_eq!(inner(&snippets[0]), "b");
    }
}
