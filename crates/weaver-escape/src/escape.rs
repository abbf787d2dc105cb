use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::{debug, error, instrument};

use crate::classify::{math, svelte, tree, verbatim};
use crate::colons::{escape_colons, unescape_colons};
use crate::config::EscapeConfig;
use crate::error::EscapeError;
use crate::lines::LineIndex;
use crate::padding::pad_string;
use crate::parse;
use crate::ranges::outermost_ranges;
use crate::rewrite::Rewriter;
use crate::snippet::{EscapableSnippet, ID_LEN, ProcessedSnippet, SnippetId};

/// A document with its snippets swapped for placeholder IDs.
#[derive(Debug, Clone)]
pub struct Escaped {
    pub document: String,
    /// In document order.
    pub snippets: Vec<(SnippetId, EscapableSnippet)>,
}

/// Replace the outermost of `snippets` with padded placeholder IDs.
pub fn escape_snippets(
    document: &str,
    snippets: Vec<EscapableSnippet>,
) -> Result<Escaped, EscapeError> {
    let candidates = snippets.len();
    let outermost = outermost_ranges(snippets, EscapableSnippet::loc);
    debug!(candidates, kept = outermost.len(), "resolved outermost snippets");

    let mut rewriter = Rewriter::new(document);
    let mut escaped = Vec::with_capacity(outermost.len());
    for snippet in outermost {
        let id = SnippetId::generate();
        let placeholder = pad_string(id.as_str(), snippet.escape_options.pad.as_ref());
        rewriter.overwrite(snippet.loc(), placeholder)?;
        escaped.push((id, snippet));
    }
    Ok(Escaped {
        document: rewriter.finish(),
        snippets: escaped,
    })
}

/// Hex runs long enough to hold a snippet ID, optionally alone in a paragraph.
static ID_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<p>\s*(?P<wrapped>[0-9a-f]{32,})\s*</p>|(?P<bare>[0-9a-f]{32,})")
        .expect("valid regex")
});

/// Splice processed snippets back over their IDs.
///
/// An ID wrapped in a `<p>` loses the paragraph when its snippet asks for
/// that; otherwise only the ID itself is replaced. IDs without an entry stay
/// in place.
#[instrument(skip_all, fields(snippets = processed.len()))]
pub fn unescape_snippets(document: &str, processed: &[(SnippetId, ProcessedSnippet)]) -> String {
    if processed.is_empty() {
        return document.to_owned();
    }
    let by_id: HashMap<&str, &ProcessedSnippet> = processed
        .iter()
        .map(|(id, snippet)| (id.as_str(), snippet))
        .collect();

    ID_RUN
        .replace_all(document, |caps: &Captures| {
            let whole = &caps[0];
            let Some(run) = caps.name("wrapped").or_else(|| caps.name("bare")) else {
                return whole.to_owned();
            };
            if caps.name("wrapped").is_some() {
                if let Some(snippet) = by_id.get(run.as_str()) {
                    if snippet.unescape_options.remove_paragraph_tag {
                        return snippet.processed.clone();
                    }
                }
            }
            let offset = run.start() - caps.get(0).map_or(0, |m| m.start());
            let mut out = String::with_capacity(whole.len());
            out.push_str(&whole[..offset]);
            replace_ids(&mut out, run.as_str(), &by_id);
            out.push_str(&whole[offset + run.len()..]);
            out
        })
        .into_owned()
}

/// Replace the known IDs in a run of hex digits, leftmost first. Adjacent
/// hex text, such as a word ending in `cafe`, stays in the run untouched.
fn replace_ids(out: &mut String, run: &str, by_id: &HashMap<&str, &ProcessedSnippet>) {
    let mut i = 0;
    while i < run.len() {
        let known = run
            .get(i..i + ID_LEN)
            .and_then(|candidate| by_id.get(candidate));
        match known {
            Some(snippet) => {
                out.push_str(&snippet.processed);
                i += ID_LEN;
            }
            None => {
                out.push_str(&run[i..i + 1]);
                i += 1;
            }
        }
    }
}

/// Escape every snippet in `document`.
///
/// Never fails: when the document cannot be parsed the error is logged and
/// the colon-escaped document comes back with no snippets.
#[instrument(skip_all, fields(len = document.len()))]
pub fn escape(document: &str, config: &EscapeConfig) -> Escaped {
    let colon_escaped = escape_colons(document);
    match collect_snippets(&colon_escaped, config)
        .and_then(|snippets| escape_snippets(&colon_escaped, snippets))
    {
        Ok(escaped) => escaped,
        Err(err) => {
            error!(error = %err, "escaping failed, passing the document through");
            Escaped {
                document: colon_escaped,
                snippets: Vec::new(),
            }
        }
    }
}

/// Final step after processing: splice snippets back and restore colons.
pub fn unescape(document: &str, processed: &[(SnippetId, ProcessedSnippet)]) -> String {
    unescape_colons(&unescape_snippets(document, processed))
}

fn collect_snippets(
    document: &str,
    config: &EscapeConfig,
) -> Result<Vec<EscapableSnippet>, EscapeError> {
    let containers = svelte::container_elements(document);
    let verbatim_elements = verbatim::verbatim_elements(document, config);
    let opaque: Vec<_> = containers.iter().chain(&verbatim_elements).copied().collect();

    let nodes = parse::parse(document, &opaque, &config.verbatim_tags())?;
    let lines = LineIndex::new(document);

    let mut snippets = tree::snippets(&nodes, document, &lines, config);
    debug!(count = snippets.len(), "tree snippets");

    let from_containers = svelte::snippets(document, &containers);
    debug!(count = from_containers.len(), "svelte container snippets");
    snippets.extend(from_containers);

    let from_math = math::special_delimiter_snippets(document, &config.math);
    debug!(count = from_math.len(), "special delimiter math snippets");
    snippets.extend(from_math);

    let from_verbatim = verbatim::snippets(document, &verbatim_elements, config);
    debug!(count = from_verbatim.len(), "verbatim snippets");
    snippets.extend(from_verbatim);

    Ok(snippets)
}
