//! Caller-built settings for one escape pass.
//!
//! Every type deserializes with camelCase names and fills gaps from
//! `Default`, so settings can come from any serde format.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::snippet::Offset;
use crate::tags::AttributeValue;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EscapeConfig {
    /// Verbatim environments keyed by tag name.
    pub verbatim: BTreeMap<String, VerbatimEnvironment>,
    pub math: MathSettings,
    pub directives: DirectiveSettings,
}

impl EscapeConfig {
    pub fn with_verbatim(
        mut self,
        tag: impl Into<String>,
        environment: VerbatimEnvironment,
    ) -> Self {
        self.verbatim.insert(tag.into(), environment);
        self
    }

    pub fn verbatim_tags(&self) -> Vec<&str> {
        self.verbatim.keys().map(String::as_str).collect()
    }
}

/// What happens to the body of a verbatim element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VerbatimKind {
    /// Highlighted as code, language from the `lang` attribute.
    Code,
    /// Compiled as a LaTeX document.
    Tex,
    /// HTML-escaped and emitted as-is.
    Escape,
    #[default]
    Noop,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerbatimEnvironment {
    pub kind: VerbatimKind,
    pub default_attributes: BTreeMap<String, AttributeValue>,
}

impl VerbatimEnvironment {
    /// Built-in defaults for an environment of `kind`.
    pub fn defaults_for(kind: VerbatimKind) -> Self {
        let default_attributes = match kind {
            VerbatimKind::Code => BTreeMap::from([("inline".to_owned(), false.into())]),
            VerbatimKind::Tex => BTreeMap::from([("inline".to_owned(), false.into())]),
            VerbatimKind::Escape => BTreeMap::from([("inline".to_owned(), true.into())]),
            VerbatimKind::Noop => BTreeMap::new(),
        };
        Self {
            kind,
            default_attributes,
        }
    }

    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.default_attributes.insert(name.into(), value.into());
        self
    }
}

/// When `$$...$$` counts as display math.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DoubleDollarDisplay {
    Always,
    /// Delimiters open and close their lines.
    Newline,
    /// As `Newline`, and the content also starts and ends with a line break.
    #[default]
    Fenced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MathSettings {
    pub single_dollar: bool,
    /// `\( ... \)` inline math.
    pub escaped_parentheses: bool,
    /// `\[ ... \]` display math.
    pub escaped_square_brackets: bool,
    pub double_dollar_signs_display: DoubleDollarDisplay,
}

impl Default for MathSettings {
    fn default() -> Self {
        Self {
            single_dollar: true,
            escaped_parentheses: true,
            escaped_square_brackets: true,
            double_dollar_signs_display: DoubleDollarDisplay::default(),
        }
    }
}

/// Decides whether the brace pair at `loc` (with content `inner`) belongs to
/// a directive in `document`.
pub type BracePredicate = Arc<dyn Fn(&str, Offset, &str) -> bool + Send + Sync>;

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DirectiveSettings {
    pub enabled: bool,
    #[serde(skip)]
    pub absorbs_braces: Option<BracePredicate>,
}

impl DirectiveSettings {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            absorbs_braces: None,
        }
    }

    pub fn with_predicate(predicate: BracePredicate) -> Self {
        Self {
            enabled: true,
            absorbs_braces: Some(predicate),
        }
    }

    /// False whenever directives are disabled.
    pub fn absorbs(&self, document: &str, loc: Offset, inner: &str) -> bool {
        if !self.enabled {
            return false;
        }
        match &self.absorbs_braces {
            Some(predicate) => predicate(document, loc, inner),
            None => follows_directive_name(document, loc),
        }
    }
}

impl fmt::Debug for DirectiveSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectiveSettings")
            .field("enabled", &self.enabled)
            .field("absorbs_braces", &self.absorbs_braces.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

static DIRECTIVE_TAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^:\w]):{1,3}[A-Za-z][\w-]*(?:\[[^\]\n]*\])?$").expect("valid regex")
});

/// `:name{..}`, `::name[label]{..}` and `:::name{..}` attribute braces.
fn follows_directive_name(document: &str, loc: Offset) -> bool {
    let Some(before) = document.get(..loc.start) else {
        return false;
    };
    let line = before.rsplit('\n').next().unwrap_or_default();
    DIRECTIVE_TAIL.is_match(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = EscapeConfig::default();
        assert!(config.verbatim.is_empty());
        assert!(config.math.single_dollar);
        assert_eq!(config.math.double_dollar_signs_display, DoubleDollarDisplay::Fenced);
        assert!(!config.directives.enabled);
    }

    #[test]
    fn deserializes_partial_camel_case() {
        let config: EscapeConfig = serde_json::from_value(serde_json::json!({
            "verbatim": { "Tex": { "kind": "tex", "defaultAttributes": { "inline": true } } },
            "math": { "doubleDollarSignsDisplay": "always", "singleDollar": false },
            "directives": { "enabled": true }
        }))
        .unwrap();
        assert_eq!(config.verbatim["Tex"].kind, VerbatimKind::Tex);
        assert!(config.verbatim["Tex"].default_attributes["inline"].is_true());
        assert_eq!(config.math.double_dollar_signs_display, DoubleDollarDisplay::Always);
        assert!(!config.math.single_dollar);
        assert!(config.math.escaped_parentheses);
        assert!(config.directives.enabled);
    }

    #[test]
    fn builtin_directive_predicate() {
        let settings = DirectiveSettings::enabled();
        let doc = "see :abbr[HTML]{title=x} and {name} and ::video{src=y}";
        let at = |needle: &str| {
            let start = doc.find(needle).unwrap();
            Offset::new(start, start + needle.len())
        };
        assert!(settings.absorbs(doc, at("{title=x}"), "title=x"));
        assert!(!settings.absorbs(doc, at("{name}"), "name"));
        assert!(settings.absorbs(doc, at("{src=y}"), "src=y"));
        assert!(!DirectiveSettings::default().absorbs(doc, at("{title=x}"), "title=x"));
    }

    #[test]
    fn custom_predicate_wins() {
        let settings = DirectiveSettings::with_predicate(Arc::new(|_, _, inner| inner == "yes"));
        assert!(settings.absorbs("{yes}", Offset::new(0, 5), "yes"));
        assert!(!settings.absorbs(":x{no}", Offset::new(2, 6), "no"));
    }
}
