// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::sync::Arc;

/// A byte range inside a [`SourceBuffer`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
pub struct Span {
    /// Start offset in bytes.
    pub start: u32,
    /// End offset in bytes, exclusive.
    pub end: u32,
}

impl Span {
    /// Creates a new span.
    #[inline]
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Span {
            start: start as u32,
            end: end as u32,
        }
    }

    /// Returns span's length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    /// Checks that span is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Checks that the byte offset is inside the span.
    #[inline]
    pub fn contains(&self, offset: usize) -> bool {
        (self.start as usize..self.end as usize).contains(&offset)
    }

    #[inline]
    pub(crate) fn to_range(self) -> std::ops::Range<usize> {
        self.start as usize..self.end as usize
    }
}

/// A position in the text.
///
/// Both values are 1-based. The column is counted in characters.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TextPos {
    #[allow(missing_docs)]
    pub row: u32,
    #[allow(missing_docs)]
    pub col: u32,
}

impl std::fmt::Display for TextPos {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}", self.row, self.col)
    }
}

/// A shared, immutable source text.
///
/// Cloning is cheap and slicing never copies.
#[derive(Clone)]
pub struct SourceBuffer {
    text: Arc<str>,
    line_starts: Arc<[u32]>,
}

impl SourceBuffer {
    /// Wraps a text.
    pub fn new(text: &str) -> Self {
        assert!(
            text.len() < u32::MAX as usize,
            "source text is limited to 4GiB"
        );

        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }

        SourceBuffer {
            text: Arc::from(text),
            line_starts: Arc::from(line_starts),
        }
    }

    /// Returns the whole text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns text's length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Checks that the text is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Returns a text slice.
    ///
    /// # Panics
    ///
    /// When the span is out of bounds or not on a char boundary.
    #[inline]
    pub fn slice(&self, span: Span) -> &str {
        &self.text[span.to_range()]
    }

    /// Converts a byte offset into a row/column pair.
    ///
    /// Offsets past the end are clamped to the end of the text.
    pub fn text_pos(&self, offset: usize) -> TextPos {
        let offset = offset.min(self.text.len());
        let row = match self.line_starts.binary_search(&(offset as u32)) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };

        let line_start = self.line_starts[row] as usize;
        let mut line_end = offset;
        while !self.text.is_char_boundary(line_end) {
            line_end -= 1;
        }

        let col = self.text[line_start..line_end].chars().count();
        TextPos {
            row: row as u32 + 1,
            col: col as u32 + 1,
        }
    }
}

impl std::fmt::Debug for SourceBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "SourceBuffer {{ len: {}, lines: {} }}",
            self.text.len(),
            self.line_starts.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_pos_first_line() {
        let buf = SourceBuffer::new("<svg/>");
        assert_eq!(buf.text_pos(0), TextPos { row: 1, col: 1 });
        assert_eq!(buf.text_pos(4), TextPos { row: 1, col: 5 });
    }

    #[test]
    fn text_pos_multiline() {
        let buf = SourceBuffer::new("<svg>\n  <g/>\n</svg>");
        assert_eq!(buf.text_pos(6), TextPos { row: 2, col: 1 });
        assert_eq!(buf.text_pos(8), TextPos { row: 2, col: 3 });
        assert_eq!(buf.text_pos(13), TextPos { row: 3, col: 1 });
    }

    #[test]
    fn text_pos_counts_chars() {
        let buf = SourceBuffer::new("ёж<g/>");
        // 'ё' and 'ж' are two bytes each.
        assert_eq!(buf.text_pos(4), TextPos { row: 1, col: 3 });
    }

    #[test]
    fn text_pos_past_end() {
        let buf = SourceBuffer::new("ab\n");
        assert_eq!(buf.text_pos(100), TextPos { row: 2, col: 1 });
    }

    #[test]
    fn slice_shares_text() {
        let buf = SourceBuffer::new("<svg width='10'/>");
        let copy = buf.clone();
        assert_eq!(copy.slice(Span::new(5, 10)), "width");
        assert!(std::ptr::eq(buf.as_str(), copy.as_str()));
    }
}
