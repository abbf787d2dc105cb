/// Zero-based line and byte column of an offset.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// Line lookup over a document, built once per escape pass.
#[derive(Clone, Debug)]
pub struct LineIndex<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(idx, _)| idx + 1),
        );
        Self {
            source,
            line_starts,
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.source.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index.saturating_sub(1),
        };
        Position {
            line,
            column: offset - self.line_starts[line],
        }
    }

    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line).copied()
    }

    /// Text of `line` without its line ending.
    pub fn line(&self, line: usize) -> Option<&'a str> {
        let start = *self.line_starts.get(line)?;
        let end = self
            .line_starts
            .get(line + 1)
            .map(|next| next - 1)
            .unwrap_or(self.source.len());
        let text = &self.source[start..end];
        Some(text.strip_suffix('\r').unwrap_or(text))
    }

    pub fn is_blank(&self, line: usize) -> bool {
        self.line(line).is_some_and(|text| text.trim().is_empty())
    }

    /// Text on the same line before `offset`.
    pub fn before(&self, offset: usize) -> &'a str {
        let pos = self.position(offset);
        let start = self.line_starts[pos.line];
        &self.source[start..start + pos.column]
    }

    /// Text on the same line from `offset` to the line ending.
    pub fn after(&self, offset: usize) -> &'a str {
        let pos = self.position(offset);
        let line = self.line(pos.line).unwrap_or_default();
        line.get(pos.column..).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_line_based() {
        let index = LineIndex::new("a\nbc\n");
        assert_eq!(index.line_count(), 3);
        assert_eq!(index.position(0), Position { line: 0, column: 0 });
        assert_eq!(index.position(3), Position { line: 1, column: 1 });
        assert_eq!(index.position(5), Position { line: 2, column: 0 });
    }

    #[test]
    fn line_text_drops_endings() {
        let index = LineIndex::new("one\r\ntwo\n\nfour");
        assert_eq!(index.line(0), Some("one"));
        assert_eq!(index.line(1), Some("two"));
        assert!(index.is_blank(2));
        assert_eq!(index.line(3), Some("four"));
        assert_eq!(index.line(4), None);
        assert!(!index.is_blank(4));
    }

    #[test]
    fn before_and_after_split_a_line() {
        let index = LineIndex::new("x\n  > abc\n");
        assert_eq!(index.before(6), "  > ");
        assert_eq!(index.after(6), "abc");
    }
}
