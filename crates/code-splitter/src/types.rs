use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::ops::Range;

/// A contiguous byte range of a document with its measured size
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Start byte offset (inclusive)
    pub start_byte: usize,

    /// End byte offset (exclusive)
    pub end_byte: usize,

    /// Size under the metric of the call that produced this chunk
    pub size: usize,

    /// Start line (1-indexed)
    pub start_line: usize,

    /// End line (1-indexed, inclusive; the line holding the last byte)
    pub end_line: usize,

    /// Syntax nodes merged into this chunk, one per line
    #[serde(default)]
    pub outline: String,
}

impl Chunk {
    #[must_use]
    pub const fn byte_range(&self) -> Range<usize> {
        self.start_byte..self.end_byte
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.end_byte - self.start_byte
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start_byte == self.end_byte
    }

    /// Get the number of lines in this chunk
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    /// Check if chunk contains a specific line
    #[must_use]
    pub const fn contains_line(&self, line: usize) -> bool {
        line >= self.start_line && line <= self.end_line
    }

    /// True when the chunk is over the ceiling (an unsplittable leaf)
    #[must_use]
    pub const fn is_oversized(&self, max_size: usize) -> bool {
        self.size > max_size
    }

    /// Bytes of `document` covered by this chunk
    #[must_use]
    pub fn bytes<'a>(&self, document: &'a [u8]) -> &'a [u8] {
        &document[self.byte_range()]
    }

    /// Text of this chunk, replacing invalid UTF-8 sequences
    #[must_use]
    pub fn text<'a>(&self, document: &'a [u8]) -> Cow<'a, str> {
        String::from_utf8_lossy(self.bytes(document))
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}..{}]: {}",
            self.start_line, self.end_line, self.size
        )?;
        if !self.outline.is_empty() {
            write!(f, "\n{}", self.outline)?;
        }
        Ok(())
    }
}

/// Newline offsets of a document, for byte offset to line lookups
#[derive(Debug, Clone)]
pub(crate) struct LineIndex {
    newlines: Vec<usize>,
}

impl LineIndex {
    pub(crate) fn new(document: &[u8]) -> Self {
        let newlines = document
            .iter()
            .enumerate()
            .filter_map(|(offset, byte)| (*byte == b'\n').then_some(offset))
            .collect();
        Self { newlines }
    }

    /// 1-based line holding the byte at `offset`
    pub(crate) fn line_of(&self, offset: usize) -> usize {
        self.newlines.partition_point(|&newline| newline < offset) + 1
    }

    /// 1-based first and last line of a byte range
    pub(crate) fn span(&self, range: Range<usize>) -> (usize, usize) {
        let start = self.line_of(range.start);
        let end = if range.end > range.start {
            self.line_of(range.end - 1)
        } else {
            start
        };
        (start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(start_byte: usize, end_byte: usize, start_line: usize, end_line: usize) -> Chunk {
        Chunk {
            start_byte,
            end_byte,
            size: end_byte - start_byte,
            start_line,
            end_line,
            outline: String::new(),
        }
    }

    #[test]
    fn test_line_index() {
        let index = LineIndex::new(b"ab\ncd\n\nef");
        assert_eq!(index.line_of(0), 1);
        assert_eq!(index.line_of(2), 1);
        assert_eq!(index.line_of(3), 2);
        assert_eq!(index.line_of(6), 3);
        assert_eq!(index.line_of(7), 4);
        assert_eq!(index.span(0..3), (1, 1));
        assert_eq!(index.span(0..4), (1, 2));
        assert_eq!(index.span(7..9), (4, 4));
    }

    #[test]
    fn test_chunk_helpers() {
        let document = b"fn a() {}\nfn b() {}\n";
        let c = chunk(10, 20, 2, 2);

        assert_eq!(c.len(), 10);
        assert!(!c.is_empty());
        assert_eq!(c.line_count(), 1);
        assert!(c.contains_line(2));
        assert!(!c.contains_line(1));
        assert_eq!(c.bytes(document), b"fn b() {}\n");
        assert_eq!(c.text(document), "fn b() {}\n");
        assert!(c.is_oversized(9));
        assert!(!c.is_oversized(10));
    }

    #[test]
    fn test_text_is_lossy() {
        let document = [b'o', b'k', 0xff];
        let c = chunk(0, 3, 1, 1);
        assert_eq!(c.text(&document), "ok\u{fffd}");
    }

    #[test]
    fn test_display() {
        let mut c = chunk(0, 4, 1, 3);
        assert_eq!(c.to_string(), "[1..3]: 4");

        c.outline = "function_item [1..3]".to_string();
        assert_eq!(c.to_string(), "[1..3]: 4\nfunction_item [1..3]");
    }

    #[test]
    fn test_serde_round_trip() {
        let c = chunk(3, 9, 1, 2);
        let json = serde_json::to_string(&c).unwrap();
        let back: Chunk = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}
