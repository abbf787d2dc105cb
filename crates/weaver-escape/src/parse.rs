//! Structural parse of the colon-escaped document.
//!
//! Markdown structure comes from pulldown-cmark; interpolation braces come from
//! a balanced scan over whatever Markdown leaves as plain text. Opaque element
//! spans are masked out before either sees the document, and every node value
//! is read back from the unmasked document by offset.

use std::ops::Range;
use std::sync::LazyLock;

use pulldown_cmark::{CodeBlockKind, Event, MetadataBlockKind, Options, Parser, Tag, TagEnd};
use regex::Regex;

use crate::error::EscapeError;
use crate::ranges::outermost_ranges;
use crate::snippet::{FrontmatterKind, Offset};
use crate::tags::opening_tag_len;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Fenced or indented code block.
    Code {
        lang: Option<String>,
        meta: Option<String>,
    },
    InlineCode,
    Math {
        double_dollar: bool,
    },
    /// `{...}` interpolation.
    Expression,
    Frontmatter {
        kind: FrontmatterKind,
    },
    /// Raw HTML, kept only so braces inside it are left alone.
    Html,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub loc: Offset,
    /// Code and frontmatter body, math between its delimiters, expression
    /// between its braces. Empty for HTML.
    pub value: String,
}

pub fn markdown_options() -> Options {
    Options::ENABLE_FOOTNOTES
        | Options::ENABLE_TABLES
        | Options::ENABLE_GFM
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_YAML_STYLE_METADATA_BLOCKS
        | Options::ENABLE_PLUSES_DELIMITED_METADATA_BLOCKS
        | Options::ENABLE_MATH
}

/// Parse `document` into nodes sorted by start offset.
///
/// `opaque` spans are invisible to the parser. An opening tag named in
/// `verbatim_tags` that is not inside an opaque span, code, math,
/// frontmatter or an HTML comment is an [`EscapeError::UnclosedElement`].
pub fn parse(
    document: &str,
    opaque: &[Offset],
    verbatim_tags: &[&str],
) -> Result<Vec<Node>, EscapeError> {
    let mut masked = mask(document, opaque);
    let fences = math_fences(&masked);
    if !fences.is_empty() {
        masked = mask(document, &[opaque, fences.as_slice()].concat());
    }
    let mut nodes = fence_nodes(document, &fences);
    nodes.extend(markdown_nodes(document, &masked));
    check_unclosed(document, &masked, verbatim_tags, opaque, &nodes)?;

    let mut shielded: Vec<Offset> = nodes.iter().map(|node| node.loc).collect();
    shielded.sort_by_key(|loc| loc.start);
    nodes.extend(expressions(document, &masked, &shielded));
    nodes.sort_by_key(|node| node.loc.start);
    Ok(nodes)
}

/// Blank out `opaque` spans byte for byte, keeping line breaks, so offsets are
/// shared between the masked and the real document.
fn mask(document: &str, opaque: &[Offset]) -> String {
    let spans = outermost_ranges(opaque.to_vec(), |loc| *loc);
    let mut masked = String::with_capacity(document.len());
    let mut cursor = 0;
    for span in spans {
        masked.push_str(&document[cursor..span.start]);
        for c in document[span.to_range()].chars() {
            if c == '\n' {
                masked.push('\n');
            } else {
                masked.extend(std::iter::repeat_n('x', c.len_utf8()));
            }
        }
        cursor = span.end;
    }
    masked.push_str(&document[cursor..]);
    masked
}

/// Spans from a `$$` line to the next `$$` line, outside fenced code.
///
/// Inside such a span no line can interrupt the math, so the spans are found
/// before Markdown sees the document and are masked like opaque elements.
fn math_fences(masked: &str) -> Vec<Offset> {
    let mut fences = Vec::new();
    let mut code_fence: Option<(u8, usize)> = None;
    let mut math_open: Option<usize> = None;
    let mut line_start = 0;
    for line in masked.split_inclusive('\n') {
        let start = line_start;
        line_start += line.len();
        let body = line.trim_end_matches(['\n', '\r']);
        let indent = body.len() - body.trim_start_matches(' ').len();
        if indent > 3 {
            continue;
        }
        let trimmed = body[indent..].trim_end();
        if let Some(open) = math_open {
            if trimmed == "$$" {
                fences.push(Offset::new(open, start + indent + 2));
                math_open = None;
            }
            continue;
        }
        if let Some((marker, run)) = code_fence_marker(trimmed) {
            match code_fence {
                None => code_fence = Some((marker, run)),
                Some((open, len)) if open == marker && run >= len && trimmed.len() == run => {
                    code_fence = None;
                }
                Some(_) => {}
            }
            continue;
        }
        if code_fence.is_none() && trimmed == "$$" {
            math_open = Some(start + indent);
        }
    }
    fences
}

/// Marker byte and run length of a line opening or closing fenced code.
fn code_fence_marker(line: &str) -> Option<(u8, usize)> {
    let marker = *line.as_bytes().first()?;
    if marker != b'`' && marker != b'~' {
        return None;
    }
    let run = line.bytes().take_while(|&b| b == marker).count();
    (run >= 3).then_some((marker, run))
}

fn fence_nodes(document: &str, fences: &[Offset]) -> Vec<Node> {
    fences
        .iter()
        .map(|loc| Node {
            kind: NodeKind::Math {
                double_dollar: true,
            },
            loc: *loc,
            value: document[loc.start + 2..loc.end - 2].to_owned(),
        })
        .collect()
}

struct OpenBlock {
    kind: NodeKind,
    start: usize,
    end: usize,
    text: Vec<Range<usize>>,
}

fn markdown_nodes(document: &str, masked: &str) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut open: Option<OpenBlock> = None;

    for (event, range) in Parser::new_ext(masked, markdown_options()).into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let (lang, meta, start) = match kind {
                    CodeBlockKind::Fenced(info) => {
                        let (lang, meta) = split_info(&info);
                        (lang, meta, range.start)
                    }
                    CodeBlockKind::Indented => (None, None, indented_start(document, range.start)),
                };
                open = Some(OpenBlock {
                    kind: NodeKind::Code { lang, meta },
                    start,
                    end: range.end,
                    text: Vec::new(),
                });
            }
            Event::Start(Tag::MetadataBlock(kind)) => {
                let kind = match kind {
                    MetadataBlockKind::YamlStyle => FrontmatterKind::Yaml,
                    MetadataBlockKind::PlusesStyle => FrontmatterKind::Toml,
                };
                open = Some(OpenBlock {
                    kind: NodeKind::Frontmatter { kind },
                    start: range.start,
                    end: range.end,
                    text: Vec::new(),
                });
            }
            Event::Text(_) if open.is_some() => {
                if let Some(block) = open.as_mut() {
                    block.text.push(range);
                }
            }
            Event::End(TagEnd::CodeBlock | TagEnd::MetadataBlock(_)) => {
                if let Some(block) = open.take() {
                    nodes.push(close_block(document, block));
                }
            }
            Event::Code(_) => nodes.push(Node {
                kind: NodeKind::InlineCode,
                value: code_span_value(&document[range.clone()]),
                loc: range.into(),
            }),
            Event::InlineMath(_) | Event::DisplayMath(_) => {
                let double_dollar = matches!(event, Event::DisplayMath(_));
                let delim = if double_dollar { 2 } else { 1 };
                let value = document
                    .get(range.start + delim..range.end.saturating_sub(delim))
                    .unwrap_or_default()
                    .to_owned();
                nodes.push(Node {
                    kind: NodeKind::Math { double_dollar },
                    loc: range.into(),
                    value,
                });
            }
            Event::Start(Tag::HtmlBlock) | Event::InlineHtml(_) => nodes.push(Node {
                kind: NodeKind::Html,
                loc: range.into(),
                value: String::new(),
            }),
            _ => {}
        }
    }
    nodes
}

fn close_block(document: &str, block: OpenBlock) -> Node {
    let mut value: String = block.text.iter().map(|r| &document[r.clone()]).collect();
    if value.ends_with('\n') {
        value.pop();
        if value.ends_with('\r') {
            value.pop();
        }
    }
    let kind = match block.kind {
        NodeKind::Frontmatter {
            kind: FrontmatterKind::Yaml,
        } if value.trim_start().starts_with('{') => NodeKind::Frontmatter {
            kind: FrontmatterKind::Json,
        },
        kind => kind,
    };
    let end = block.start + document[block.start..block.end].trim_end_matches(['\n', '\r']).len();
    Node {
        kind,
        loc: Offset::new(block.start, end),
        value,
    }
}

fn split_info(info: &str) -> (Option<String>, Option<String>) {
    let info = info.trim();
    if info.is_empty() {
        return (None, None);
    }
    match info.split_once(char::is_whitespace) {
        Some((lang, meta)) => {
            let meta = meta.trim();
            (Some(lang.to_owned()), (!meta.is_empty()).then(|| meta.to_owned()))
        }
        None => (Some(info.to_owned()), None),
    }
}

/// Indented blocks own their indentation.
fn indented_start(document: &str, start: usize) -> usize {
    let line_start = document[..start].rfind('\n').map_or(0, |nl| nl + 1);
    if document[line_start..start].trim().is_empty() {
        line_start
    } else {
        start
    }
}

/// Content of a raw code span with CommonMark normalisation.
fn code_span_value(raw: &str) -> String {
    let ticks = raw.len() - raw.trim_start_matches('`').len();
    let inner = raw
        .get(ticks..raw.len().saturating_sub(ticks))
        .unwrap_or_default()
        .replace("\r\n", " ")
        .replace('\n', " ");
    let strip = inner.len() >= 2
        && inner.starts_with(' ')
        && inner.ends_with(' ')
        && !inner.trim_matches(' ').is_empty();
    if strip {
        inner[1..inner.len() - 1].to_owned()
    } else {
        inner
    }
}

/// Balanced `{...}` spans outside `shielded` ranges (sorted by start).
fn expressions(document: &str, masked: &str, shielded: &[Offset]) -> Vec<Node> {
    let bytes = masked.as_bytes();
    let mut shields = shielded.iter().peekable();
    let mut found = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        while shields.next_if(|s| s.end <= i).is_some() {}
        if let Some(shield) = shields.peek() {
            if shield.start <= i {
                i = shield.end;
                continue;
            }
        }
        match bytes[i] {
            b'\\' => i += 2,
            b'{' => match matching_brace(bytes, i) {
                Some(close) => {
                    found.push(Node {
                        kind: NodeKind::Expression,
                        loc: Offset::new(i, close + 1),
                        value: document[i + 1..close].to_owned(),
                    });
                    i = close + 1;
                }
                None => i += 1,
            },
            _ => i += 1,
        }
    }
    found
}

/// Index of the `}` closing the brace at `open`. Quoted strings are skipped
/// and a blank line ends the search.
fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote = None;
    let mut i = open;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(_) if b == b'\\' => i += 1,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'"' | b'\'' | b'`' => quote = Some(b),
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            },
        }
        if b == b'\n' {
            let rest = &bytes[i + 1..];
            let line_end = rest.iter().position(|&c| c == b'\n');
            if line_end.is_some_and(|end| rest[..end].iter().all(u8::is_ascii_whitespace)) {
                return None;
            }
        }
        i += 1;
    }
    None
}

static HTML_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));

/// A verbatim opening tag left without its element. Script and style tags
/// that match no element are plain text and never reach here.
fn check_unclosed(
    document: &str,
    masked: &str,
    verbatim_tags: &[&str],
    opaque: &[Offset],
    nodes: &[Node],
) -> Result<(), EscapeError> {
    if verbatim_tags.is_empty() {
        return Ok(());
    }
    let names = verbatim_tags
        .iter()
        .map(|tag| regex::escape(tag))
        .collect::<Vec<_>>()
        .join("|");
    let open_tag = Regex::new(&format!(r"<({names})[\s>/]"))
        .expect("escaped tag names form a valid pattern");
    let comments: Vec<Offset> = HTML_COMMENT
        .find_iter(masked)
        .map(|m| Offset::new(m.start(), m.end()))
        .collect();

    for caps in open_tag.captures_iter(document) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let at = whole.start();
        let enclosed = opaque
            .iter()
            .chain(&comments)
            .any(|loc| loc.contains_pos(at));
        let in_literal = nodes.iter().any(|node| {
            matches!(
                node.kind,
                NodeKind::Code { .. }
                    | NodeKind::InlineCode
                    | NodeKind::Math { .. }
                    | NodeKind::Frontmatter { .. }
            ) && node.loc.contains_pos(at)
        });
        let self_closing = opening_tag_len(&document[at..])
            .is_some_and(|len| document[at..at + len].ends_with("/>"));
        if enclosed || in_literal || self_closing {
            continue;
        }
        return Err(EscapeError::UnclosedElement {
            tag: name.as_str().to_owned(),
            offset: at,
            span: (at, name.end() - at).into(),
            src: document.to_owned(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(nodes: &[Node]) -> Vec<&NodeKind> {
        nodes.iter().map(|n| &n.kind).collect()
    }

    #[test]
    fn finds_code_math_and_expressions() {
        let doc = "a `x` b $y$ c {z}\n\n```rs meta here\nfn f() {}\n```\n";
        let nodes = parse(doc, &[], &[]).unwrap();
        assert_eq!(
            kinds(&nodes),
            vec![
                &NodeKind::InlineCode,
                &NodeKind::Math { double_dollar: false },
                &NodeKind::Expression,
                &NodeKind::Code {
                    lang: Some("rs".into()),
                    meta: Some("meta here".into())
                },
            ]
        );
        assert_eq!(nodes[0].value, "x");
        assert_eq!(nodes[1].value, "y");
        assert_eq!(nodes[2].value, "z");
        assert_eq!(nodes[3].value, "fn f() {}");
        assert_eq!(&doc[nodes[3].loc.to_range()], "```rs meta here\nfn f() {}\n```");
    }

    #[test]
    fn braces_in_code_and_escapes_are_not_expressions() {
        let doc = "`{a}` and \\{b} and { unclosed";
        let nodes = parse(doc, &[], &[]).unwrap();
        assert_eq!(kinds(&nodes), vec![&NodeKind::InlineCode]);
    }

    #[test]
    fn nested_braces_and_strings() {
        let doc = "{#each items as { id, name }} and {\"}\"}";
        let nodes = parse(doc, &[], &[]).unwrap();
        let values: Vec<_> = nodes.iter().map(|n| n.value.as_str()).collect();
        assert_eq!(values, vec!["#each items as { id, name }", "\"}\""]);
    }

    #[test]
    fn masked_spans_are_invisible_but_values_are_real() {
        let doc = "<Code>`not code`</Code> `real`";
        let nodes = parse(doc, &[Offset::new(0, 23)], &["Code"]).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].value, "real");
    }

    #[test]
    fn frontmatter_kinds() {
        let yaml = parse("---\ntitle: x\n---\n\nbody\n", &[], &[]).unwrap();
        assert_eq!(yaml[0].kind, NodeKind::Frontmatter { kind: FrontmatterKind::Yaml });
        assert_eq!(yaml[0].value, "title: x");

        let toml = parse("+++\ntitle = 1\n+++\n", &[], &[]).unwrap();
        assert_eq!(toml[0].kind, NodeKind::Frontmatter { kind: FrontmatterKind::Toml });
    }

    #[test]
    fn code_span_normalisation() {
        assert_eq!(code_span_value("`` `a` ``"), "`a`");
        assert_eq!(code_span_value("`  `"), "  ");
        assert_eq!(code_span_value("`a\nb`"), "a b");
    }

    #[test]
    fn unclosed_verbatim_is_an_error() {
        let err = parse("text\n<Tex>\n\\frac12\n", &[], &["Tex"]).unwrap_err();
        assert!(
            matches!(err, EscapeError::UnclosedElement { ref tag, offset: 5, .. } if tag == "Tex")
        );
    }

    #[test]
    fn open_tags_in_code_comments_and_frontmatter_are_fine() {
        let doc = "---\nlayout: <Tex>\n---\n\n\
                   use `<Tex>` here\n\n\
                   <!-- <Tex> -->\n\n\
                   ```\n<Tex>\n```\n";
        assert!(parse(doc, &[], &["Tex"]).is_ok());
    }

    #[test]
    fn stray_script_and_style_tags_are_text() {
        let doc = "Put CSS in a <style> element, or a <script>.\n\n{name}";
        let nodes = parse(doc, &[], &["Tex"]).unwrap();
        assert_eq!(nodes.last().map(|n| n.value.as_str()), Some("name"));
    }

    #[test]
    fn math_fences_hold_lines_that_interrupt_paragraphs() {
        let doc = "Text\n\n$$\nf = a\n  + b\n- x &= {1}\n# h\n$$\nafter {y}\n";
        let nodes = parse(doc, &[], &[]).unwrap();
        assert_eq!(
            kinds(&nodes),
            vec![&NodeKind::Math { double_dollar: true }, &NodeKind::Expression]
        );
        assert_eq!(nodes[0].value, "\nf = a\n  + b\n- x &= {1}\n# h\n");
        assert_eq!(&doc[nodes[0].loc.to_range()], "$$\nf = a\n  + b\n- x &= {1}\n# h\n$$");
        assert_eq!(nodes[1].value, "y");
    }

    #[test]
    fn math_fences_skip_fenced_code() {
        let doc = "```tex\n$$\n{a}\n$$\n```\n";
        let nodes = parse(doc, &[], &[]).unwrap();
        assert_eq!(
            kinds(&nodes),
            vec![&NodeKind::Code {
                lang: Some("tex".into()),
                meta: None
            }]
        );
        assert_eq!(math_fences("$$\nnever closed\n"), Vec::<Offset>::new());
    }
}
