//! Explicit scan position for the literal scanners.
//!
//! A [`Cursor`] is a plain value: it owns nothing but an offset into the
//! borrowed input, so every scanner takes one by `&mut` and the caller can
//! inspect where a scan stopped. Offsets are byte offsets into the original
//! input, including a `base` when the cursor walks a sub-range.

use crate::error::CodecError;

/// A position within a text being scanned.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    text: &'a str,
    pos: usize,
    base: usize,
}

impl<'a> Cursor<'a> {
    /// Start scanning `text` at its first byte.
    pub fn new(text: &'a str) -> Self {
        Self::with_base(text, 0)
    }

    /// Start scanning a sub-range that begins at `base` in the outer input.
    pub fn with_base(text: &'a str, base: usize) -> Self {
        Self { text, pos: 0, base }
    }

    /// Offset of the next character relative to the outer input.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Offset relative to this cursor's own text.
    pub fn local(&self) -> usize {
        self.pos
    }

    /// Offset of the end of the input.
    pub fn end_offset(&self) -> usize {
        self.base + self.text.len()
    }

    /// Unconsumed input.
    pub fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.text.len()
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Consume one character.
    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Consume `c` if it is next.
    pub fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    /// Advance by `n` bytes, typically the length of a prefix matched elsewhere.
    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.text.len());
    }

    pub fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    /// Slice of this cursor's text between two local offsets.
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.text[start..end]
    }

    /// Cursor over a sub-range, keeping offsets relative to the outer input.
    pub fn sub(&self, start: usize, end: usize) -> Cursor<'a> {
        Cursor::with_base(&self.text[start..end], self.base + start)
    }

    /// Format error at the current position.
    pub fn error(&self, message: impl Into<String>) -> CodecError {
        CodecError::format(self.offset(), message)
    }

    /// Format error at the end of the input.
    pub fn eof_error(&self, message: impl Into<String>) -> CodecError {
        CodecError::format(self.end_offset(), message)
    }

    /// Fail unless only whitespace remains.
    pub fn expect_end(&mut self, what: &str) -> Result<(), CodecError> {
        self.skip_whitespace();
        if self.is_eof() {
            Ok(())
        } else {
            Err(self.error(format!("junk after {}", what)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bump_and_offsets() {
        let mut cur = Cursor::with_base("a{é}", 10);
        assert_eq!(cur.offset(), 10);
        assert_eq!(cur.bump(), Some('a'));
        assert!(cur.eat('{'));
        assert_eq!(cur.bump(), Some('é'));
        assert_eq!(cur.offset(), 14);
        assert_eq!(cur.rest(), "}");
        assert_eq!(cur.end_offset(), 15);
    }

    #[test]
    fn test_expect_end() {
        let mut cur = Cursor::new("  ");
        assert!(cur.expect_end("array").is_ok());

        let mut cur = Cursor::new(" x");
        let err = cur.expect_end("array").unwrap_err();
        assert_eq!(err.position(), Some(1));
    }

    #[test]
    fn test_sub_keeps_outer_offsets() {
        let cur = Cursor::with_base("{{1},{2}}", 3);
        let mut inner = cur.sub(5, 8);
        assert_eq!(inner.rest(), "{2}");
        assert_eq!(inner.offset(), 8);
        inner.advance(3);
        assert_eq!(inner.offset(), inner.end_offset());
    }
}
