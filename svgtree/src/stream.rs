// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::Span;

/// Extension methods for XML-subset only operations.
pub(crate) trait ByteExt {
    /// Checks if a byte is a space.
    ///
    /// `[ \r\n\t]`
    fn is_xml_space(&self) -> bool;

    fn is_quote(&self) -> bool;

    /// Checks if a byte can start an XML name.
    ///
    /// Any non-ASCII byte is accepted, which is good enough for recovery purposes.
    fn is_name_start(&self) -> bool;

    fn is_name_char(&self) -> bool;
}

impl ByteExt for u8 {
    #[inline]
    fn is_xml_space(&self) -> bool {
        matches!(*self, b' ' | b'\t' | b'\n' | b'\r')
    }

    #[inline]
    fn is_quote(&self) -> bool {
        matches!(*self, b'\'' | b'"')
    }

    #[inline]
    fn is_name_start(&self) -> bool {
        matches!(*self, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || *self >= 0x80
    }

    #[inline]
    fn is_name_char(&self) -> bool {
        self.is_name_start() || matches!(*self, b'0'..=b'9' | b'-' | b'.')
    }
}

/// A streaming text parsing interface.
///
/// Unlike a strict tokenizer, all methods are infallible.
/// Reading past the end simply yields nothing.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct Stream<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> From<&'a str> for Stream<'a> {
    #[inline]
    fn from(text: &'a str) -> Self {
        Stream { text, pos: 0 }
    }
}

impl<'a> Stream<'a> {
    /// Returns the current position in bytes.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    #[inline]
    pub fn jump_to_end(&mut self) {
        self.pos = self.text.len();
    }

    #[inline]
    pub fn curr_byte(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    #[inline]
    pub fn next_byte(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos + 1).copied()
    }

    /// Advances by `n` bytes.
    ///
    /// The position is always kept on a char boundary.
    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.text.len());
        while !self.text.is_char_boundary(self.pos) {
            self.pos += 1;
        }
    }

    /// Advances by one char.
    #[inline]
    pub fn advance_char(&mut self) {
        self.advance(1);
    }

    #[inline]
    pub fn starts_with(&self, text: &[u8]) -> bool {
        self.text.as_bytes()[self.pos..].starts_with(text)
    }

    /// Consumes `text` if the stream starts with it.
    #[inline]
    pub fn consume(&mut self, text: &[u8]) -> bool {
        if self.starts_with(text) {
            self.advance(text.len());
            true
        } else {
            false
        }
    }

    pub fn skip_spaces(&mut self) {
        while let Some(c) = self.curr_byte() {
            if c.is_xml_space() {
                self.advance(1);
            } else {
                break;
            }
        }
    }

    /// Consumes an XML name.
    ///
    /// Returns an empty span when the current byte cannot start a name.
    pub fn consume_name(&mut self) -> Span {
        let start = self.pos;
        if let Some(c) = self.curr_byte() {
            if c.is_name_start() {
                self.advance(1);
                while let Some(c) = self.curr_byte() {
                    if c.is_name_char() {
                        self.advance(1);
                    } else {
                        break;
                    }
                }
            }
        }

        Span::new(start, self.pos)
    }

    /// Consumes bytes until `pattern` is found.
    ///
    /// Returns the consumed span, excluding the pattern, and whether the pattern was found.
    /// The pattern itself is consumed too.
    pub fn consume_until(&mut self, pattern: &[u8]) -> (Span, bool) {
        let start = self.pos;
        let hay = &self.text.as_bytes()[self.pos..];
        match find(hay, pattern) {
            Some(idx) => {
                self.pos += idx;
                let span = Span::new(start, self.pos);
                self.advance(pattern.len());
                (span, true)
            }
            None => {
                self.jump_to_end();
                (Span::new(start, self.pos), false)
            }
        }
    }

    /// Consumes bytes while `f` returns `true`.
    pub fn consume_while<F: Fn(u8) -> bool>(&mut self, f: F) -> Span {
        let start = self.pos;
        while let Some(c) = self.curr_byte() {
            if f(c) {
                self.advance(1);
            } else {
                break;
            }
        }

        Span::new(start, self.pos)
    }
}

fn find(hay: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || hay.len() < needle.len() {
        return None;
    }

    hay.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consume_name_stops_at_special_chars() {
        let mut s = Stream::from("xlink:href='a'");
        assert_eq!(s.consume_name(), Span::new(0, 10));
        assert_eq!(s.curr_byte(), Some(b'='));
    }

    #[test]
    fn consume_until_missing_pattern() {
        let mut s = Stream::from("abc");
        let (span, found) = s.consume_until(b"-->");
        assert_eq!(span, Span::new(0, 3));
        assert!(!found);
        assert!(s.at_end());
    }

    #[test]
    fn advance_keeps_char_boundary() {
        let mut s = Stream::from("ж>");
        s.advance(1);
        assert_eq!(s.curr_byte(), Some(b'>'));
    }
}
