//! Regex matching for templating elements with known tag names.
//!
//! The regex engine has no backreferences, so every tag name gets its own
//! alternative whose close tag repeats the name literally. The body is matched
//! lazily, which makes the nearest close tag terminate the element.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::snippet::Offset;

/// Attribute list after a tag name: quoted values may hold `>`, braces hold
/// expressions and spreads.
const ATTRS: &str = r#"(?:\s(?:"[^"]*"|'[^']*'|\{[^}]*\}|[^"'{}>])*)?"#;
const ATTRS_LAZY: &str = r#"(?:\s(?:"[^"]*"|'[^']*'|\{[^}]*\}|[^"'{}>])*?)?"#;

/// Finds elements in a document.
///
/// Implemented with regexes today; a recursive scanner can replace it without
/// touching the classifiers.
pub trait TagMatcher {
    /// Byte ranges of every element, in document order.
    fn find(&self, text: &str) -> Vec<Offset>;
}

#[derive(Debug, Clone)]
pub struct TagRegex {
    regex: Regex,
}

impl TagRegex {
    /// Elements that only occur as open/close pairs.
    ///
    /// # Panics
    ///
    /// Panics if `tags` is empty.
    pub fn normal<S: AsRef<str>>(tags: &[S]) -> Self {
        assert!(!tags.is_empty(), "a tag matcher needs at least one tag name");
        Self::build(tags, |name| format!("<{name}{ATTRS}>(?s:.*?)</{name}\\s*>"))
    }

    /// Elements that are either self-closing or open/close pairs.
    ///
    /// # Panics
    ///
    /// Panics if `tags` is empty.
    pub fn self_closing_or_normal<S: AsRef<str>>(tags: &[S]) -> Self {
        assert!(!tags.is_empty(), "a tag matcher needs at least one tag name");
        Self::build(tags, |name| {
            format!("<{name}{ATTRS_LAZY}\\s*/>|<{name}{ATTRS}>(?s:.*?)</{name}\\s*>")
        })
    }

    fn build<S: AsRef<str>>(tags: &[S], element: impl Fn(&str) -> String) -> Self {
        let pattern = tags
            .iter()
            .map(|tag| format!("(?:{})", element(&regex::escape(tag.as_ref()))))
            .collect::<Vec<_>>()
            .join("|");
        let regex = Regex::new(&pattern).expect("escaped tag names always form a valid pattern");
        Self { regex }
    }
}

impl TagMatcher for TagRegex {
    fn find(&self, text: &str) -> Vec<Offset> {
        self.regex
            .find_iter(text)
            .map(|m| Offset::new(m.start(), m.end()))
            .collect()
    }
}

/// Value of an element attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl AttributeValue {
    pub fn is_true(&self) -> bool {
        matches!(self, AttributeValue::Bool(true))
    }

    fn parse(raw: &str) -> Self {
        match raw {
            "true" => AttributeValue::Bool(true),
            "false" => AttributeValue::Bool(false),
            _ => match raw.parse::<f64>() {
                Ok(n) if n.is_finite() && raw.bytes().any(|b| b.is_ascii_digit()) => {
                    AttributeValue::Number(n)
                }
                _ => AttributeValue::Text(raw.to_owned()),
            },
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(b) => write!(f, "{b}"),
            AttributeValue::Number(n) => write!(f, "{n}"),
            AttributeValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_owned())
    }
}

/// An element split into its parts.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTag {
    pub tag: String,
    pub attributes: BTreeMap<String, AttributeValue>,
    pub inner_content: String,
    pub self_closing: bool,
}

static TAG_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<([A-Za-z][\w:.-]*)").expect("valid regex"));

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"([^\s=/>"'{}]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|\{([^}]*)\}|([^\s"'=<>`]+)))?"#,
    )
    .expect("valid regex")
});

/// Length in bytes of the opening tag at the start of `outer`, including `>`.
pub fn opening_tag_len(outer: &str) -> Option<usize> {
    let mut quote = None;
    let mut depth = 0usize;
    for (idx, c) in outer.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '{') => depth += 1,
            (None, '}') => depth = depth.saturating_sub(1),
            (None, '>') if depth == 0 => return Some(idx + 1),
            _ => {}
        }
    }
    None
}

/// Split a matched element into tag name, attributes and body.
///
/// Returns `None` when `outer` does not start with an opening tag.
pub fn parse_tag(outer: &str) -> Option<ParsedTag> {
    let name = TAG_NAME.captures(outer)?.get(1)?;
    let open_len = opening_tag_len(outer)?;
    let opening = &outer[..open_len];
    let self_closing = open_len == outer.len() && opening[..open_len - 1].trim_end().ends_with('/');

    let attr_src = opening[name.end()..open_len - 1].trim_end_matches([' ', '/', '\t', '\n']);
    let attributes = ATTRIBUTE
        .captures_iter(attr_src)
        .filter_map(|caps| {
            let key = caps.get(1)?.as_str();
            // spread leftovers like `...rest}`
            if key.starts_with("...") {
                return None;
            }
            let key = key.to_owned();
            let value = (2..=5)
                .find_map(|group| caps.get(group))
                .map(|raw| AttributeValue::parse(raw.as_str()))
                .unwrap_or(AttributeValue::Bool(true));
            Some((key, value))
        })
        .collect();

    let inner_content = if self_closing {
        String::new()
    } else {
        let close = outer.rfind("</").filter(|&at| at >= open_len).unwrap_or(outer.len());
        outer[open_len..close].to_owned()
    };

    Some(ParsedTag {
        tag: name.as_str().to_owned(),
        attributes,
        inner_content,
        self_closing,
    })
}
