use crate::error::EscapeError;
use crate::snippet::Offset;

/// Range overwrites against an immutable source string.
///
/// Offsets always refer to `source`, whatever was written before. The output
/// is assembled once by [`Rewriter::finish`], so the order of overwrites does
/// not matter.
#[derive(Debug)]
pub struct Rewriter<'a> {
    source: &'a str,
    edits: Vec<(Offset, String)>,
}

impl<'a> Rewriter<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            edits: Vec::new(),
        }
    }

    pub fn overwrite(&mut self, loc: Offset, text: impl Into<String>) -> Result<(), EscapeError> {
        let Offset { start, end } = loc;
        if start > end || end > self.source.len() {
            return Err(EscapeError::OutOfBounds {
                start,
                end,
                len: self.source.len(),
            });
        }
        if !self.source.is_char_boundary(start) || !self.source.is_char_boundary(end) {
            return Err(EscapeError::NotCharBoundary { start, end });
        }
        let clashes = self
            .edits
            .iter()
            .any(|(other, _)| *other == loc || (start < other.end && other.start < end));
        if clashes {
            return Err(EscapeError::OverlappingEdit { start, end });
        }
        self.edits.push((loc, text.into()));
        Ok(())
    }

    pub fn finish(mut self) -> String {
        self.edits.sort_by_key(|(loc, _)| loc.start);
        let mut out = String::with_capacity(self.source.len());
        let mut cursor = 0;
        for (loc, text) in &self.edits {
            out.push_str(&self.source[cursor..loc.start]);
            out.push_str(text);
            cursor = loc.end;
        }
        out.push_str(&self.source[cursor..]);
        out
    }
}
