//! Snippet records that flow from classification through escaping, processing
//! and unescaping.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::padding::Padding;
use crate::tags::AttributeValue;

/// Half-open byte range into the colon-escaped document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Offset {
    pub start: usize,
    pub end: usize,
}

impl Offset {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "inverted offset {start}..{end}");
        Self { start, end }
    }

    pub fn to_range(self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, other: Offset) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn contains_pos(&self, pos: usize) -> bool {
        self.start <= pos && pos < self.end
    }
}

impl From<Range<usize>> for Offset {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SnippetType {
    Code,
    Math,
    Frontmatter,
    Svelte,
    MustacheTag,
    Verbatim,
}

impl SnippetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Math => "math",
            Self::Frontmatter => "frontmatter",
            Self::Svelte => "svelte",
            Self::MustacheTag => "mustacheTag",
            Self::Verbatim => "verbatim",
        }
    }
}

impl fmt::Display for SnippetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Original {
    pub loc: Offset,
    pub outer_content: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeOptions {
    pub inline: bool,
    pub lang: Option<String>,
    pub meta: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MathOptions {
    pub inline: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FrontmatterKind {
    Yaml,
    Toml,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontmatterOptions {
    #[serde(rename = "type")]
    pub kind: FrontmatterKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerbatimOptions {
    pub tag: String,
    pub attributes: BTreeMap<String, AttributeValue>,
    pub self_closing: bool,
    pub outer_content: String,
    /// 1-based line of the element body in the source document.
    pub line_offset: usize,
    pub inline: bool,
}

/// Options handed to the external processor, one variant per processable kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ProcessorOptions {
    Code(CodeOptions),
    Math(MathOptions),
    Frontmatter(FrontmatterOptions),
    Verbatim(VerbatimOptions),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Processable {
    pub inner_content: String,
    pub options_for_processor: ProcessorOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EscapeOptions {
    pub pad: Option<Padding>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnescapeOptions {
    pub remove_paragraph_tag: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EscapableSnippet {
    #[serde(rename = "type")]
    pub kind: SnippetType,
    pub original: Original,
    pub processable: Option<Processable>,
    pub escape_options: EscapeOptions,
    pub unescape_options: UnescapeOptions,
}

impl EscapableSnippet {
    /// A region that is hidden and later restored verbatim.
    pub fn passthrough(
        kind: SnippetType,
        document: &str,
        loc: Offset,
        pad: Padding,
        remove_paragraph_tag: bool,
    ) -> Self {
        Self {
            kind,
            original: Original {
                loc,
                outer_content: document.get(loc.to_range()).map(str::to_owned),
            },
            processable: None,
            escape_options: EscapeOptions { pad: Some(pad) },
            unescape_options: UnescapeOptions {
                remove_paragraph_tag,
            },
        }
    }

    /// A region whose inner content goes to an external processor.
    pub fn processable(
        kind: SnippetType,
        document: &str,
        loc: Offset,
        inner_content: impl Into<String>,
        options_for_processor: ProcessorOptions,
        pad: Padding,
        remove_paragraph_tag: bool,
    ) -> Self {
        Self {
            processable: Some(Processable {
                inner_content: inner_content.into(),
                options_for_processor,
            }),
            ..Self::passthrough(kind, document, loc, pad, remove_paragraph_tag)
        }
    }

    pub fn loc(&self) -> Offset {
        self.original.loc
    }

    pub fn outer_content(&self) -> &str {
        self.original.outer_content.as_deref().unwrap_or_default()
    }
}

/// Length of every [`SnippetId`].
pub const ID_LEN: usize = 32;

/// Opaque placeholder token standing in for an escaped snippet.
///
/// Plain lowercase hex, so Markdown passes it through as ordinary text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SnippetId(String);

impl SnippetId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnippetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SnippetId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedSnippet {
    pub processed: String,
    pub unescape_options: UnescapeOptions,
}
