//! Whitespace padding around placeholders, so block-level snippets are not
//! swallowed into surrounding inline Markdown.

use serde::Serialize;

/// Padding for one side of a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Pad {
    /// `true` is one newline, `false` is nothing.
    Bool(bool),
    Newlines(usize),
    Literal(String),
}

impl Pad {
    fn render(&self) -> std::borrow::Cow<'_, str> {
        match self {
            Pad::Literal(s) => s.as_str().into(),
            Pad::Bool(b) => "\n".repeat(usize::from(*b)).into(),
            Pad::Newlines(n) => "\n".repeat(*n).into(),
        }
    }
}

/// Padding instruction: the same pad on both sides, or separate left/right pads.
///
/// Tuples only ever hold scalar pads, so there is no nesting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Padding {
    Both(Pad),
    Sides(Pad, Pad),
}

impl Padding {
    pub const NONE: Padding = Padding::Both(Pad::Bool(false));

    pub fn sides(&self) -> (&Pad, &Pad) {
        match self {
            Padding::Both(pad) => (pad, pad),
            Padding::Sides(left, right) => (left, right),
        }
    }
}

impl Default for Padding {
    fn default() -> Self {
        Padding::Both(Pad::Bool(true))
    }
}

impl From<bool> for Pad {
    fn from(value: bool) -> Self {
        Pad::Bool(value)
    }
}

impl From<usize> for Pad {
    fn from(value: usize) -> Self {
        Pad::Newlines(value)
    }
}

impl From<&str> for Pad {
    fn from(value: &str) -> Self {
        Pad::Literal(value.to_owned())
    }
}

impl From<String> for Pad {
    fn from(value: String) -> Self {
        Pad::Literal(value)
    }
}

impl From<Pad> for Padding {
    fn from(value: Pad) -> Self {
        Padding::Both(value)
    }
}

impl From<bool> for Padding {
    fn from(value: bool) -> Self {
        Padding::Both(value.into())
    }
}

impl From<usize> for Padding {
    fn from(value: usize) -> Self {
        Padding::Both(value.into())
    }
}

impl From<&str> for Padding {
    fn from(value: &str) -> Self {
        Padding::Both(value.into())
    }
}

impl<L: Into<Pad>, R: Into<Pad>> From<(L, R)> for Padding {
    fn from((left, right): (L, R)) -> Self {
        Padding::Sides(left.into(), right.into())
    }
}

/// Surround `s` with the padding described by `padding`; `None` pads with one
/// newline on each side.
pub fn pad_string(s: &str, padding: Option<&Padding>) -> String {
    let default = Padding::default();
    let (left, right) = padding.unwrap_or(&default).sides();
    let (left, right) = (left.render(), right.render());
    let mut out = String::with_capacity(left.len() + s.len() + right.len());
    out.push_str(&left);
    out.push_str(s);
    out.push_str(&right);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_padding() {
        assert_eq!(pad_string("foo", Some(&true.into())), "\nfoo\n");
        assert_eq!(pad_string("foo", Some(&false.into())), "foo");
        assert_eq!(pad_string("foo", Some(&2usize.into())), "\n\nfoo\n\n");
        assert_eq!(pad_string("foo", Some(&0usize.into())), "foo");
        assert_eq!(pad_string("foo", Some(&"--".into())), "--foo--");
    }

    #[test]
    fn omitted_padding_is_one_newline() {
        assert_eq!(pad_string("foo", None), "\nfoo\n");
    }

    #[test]
    fn sided_padding() {
        assert_eq!(pad_string("foo", Some(&("bar", 3usize).into())), "barfoo\n\n\n");
        assert_eq!(pad_string("foo", Some(&(false, true).into())), "foo\n");
        assert_eq!(pad_string("x", Some(&("\n  ", 0usize).into())), "\n  x");
    }
}
