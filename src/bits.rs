//! BIT / VARBIT values and the `B'...'` literal form.

use nom::{
    bytes::complete::take_while,
    character::complete::{char, one_of},
    sequence::{delimited, pair},
    IResult,
};

use crate::error::{CodecError, CodecResult};

/// A packed string of bits, most significant bit first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BitString {
    bytes: Vec<u8>,
    len: usize,
}

impl BitString {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from packed bytes; bits past `len` are cleared.
    pub fn from_bytes(mut bytes: Vec<u8>, len: usize) -> CodecResult<Self> {
        let needed = len.div_ceil(8);
        if bytes.len() < needed {
            return Err(CodecError::invalid(format!(
                "{} byte(s) cannot hold {} bits",
                bytes.len(),
                len
            )));
        }
        bytes.truncate(needed);
        if len % 8 != 0 {
            if let Some(last) = bytes.last_mut() {
                *last &= 0xffu8 << (8 - len % 8);
            }
        }
        Ok(Self { bytes, len })
    }

    pub fn from_bools(bits: impl IntoIterator<Item = bool>) -> Self {
        let mut out = Self::new();
        for bit in bits {
            out.push(bit);
        }
        out
    }

    pub fn push(&mut self, bit: bool) {
        if self.len % 8 == 0 {
            self.bytes.push(0);
        }
        if bit {
            let last = self.bytes.len() - 1;
            self.bytes[last] |= 1 << (7 - self.len % 8);
        }
        self.len += 1;
    }

    /// Number of bits.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Option<bool> {
        if index >= self.len {
            return None;
        }
        Some(self.bytes[index / 8] & (1 << (7 - index % 8)) != 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).filter_map(move |i| self.get(i))
    }

    /// Packed bytes, last byte zero-padded.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Display for BitString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for bit in self.iter() {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl std::str::FromStr for BitString {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_bits(s)
    }
}

/// Append `B'<bits>'`.
pub fn encode_bits(buf: &mut String, bits: &BitString) {
    buf.reserve(bits.len() + 3);
    buf.push_str("B'");
    for bit in bits.iter() {
        buf.push(if bit { '1' } else { '0' });
    }
    buf.push('\'');
}

/// Parse a bit string.
///
/// Accepts the literal forms `B'0101'` and `X'1F'` (either case) as well as
/// the bare `0101` that PostgreSQL prints in text output.
pub fn decode_bits(text: &str) -> CodecResult<BitString> {
    let trimmed = text.trim_start();
    let lead = text.len() - trimmed.len();

    match literal_frame(trimmed) {
        Ok((rest, (prefix, body))) => {
            if !rest.trim().is_empty() {
                let at = lead + trimmed.len() - rest.len();
                return Err(CodecError::format(at, "junk after bit string literal"));
            }
            let body_start = lead + 2;
            match prefix {
                'b' | 'B' => parse_binary(body, body_start),
                _ => parse_hex(body, body_start),
            }
        }
        Err(_) => {
            if trimmed.starts_with(|c: char| matches!(c, 'b' | 'B' | 'x' | 'X')) && trimmed[1..].starts_with('\'') {
                return Err(CodecError::format(text.len(), "unterminated bit string literal"));
            }
            parse_binary(trimmed.trim_end(), lead)
        }
    }
}

/// `B'...'` or `X'...'` with the prefix letter and raw body.
fn literal_frame(input: &str) -> IResult<&str, (char, &str)> {
    pair(
        one_of("bBxX"),
        delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
    )(input)
}

fn parse_binary(body: &str, base: usize) -> CodecResult<BitString> {
    let mut bits = BitString::new();
    for (i, c) in body.char_indices() {
        match c {
            '0' => bits.push(false),
            '1' => bits.push(true),
            other => {
                return Err(CodecError::format(
                    base + i,
                    format!("\"{}\" is not a valid binary digit", other),
                ));
            }
        }
    }
    Ok(bits)
}

fn parse_hex(body: &str, base: usize) -> CodecResult<BitString> {
    let mut bits = BitString::new();
    for (i, c) in body.char_indices() {
        let nibble = c.to_digit(16).ok_or_else(|| {
            CodecError::format(
                base + i,
                format!("\"{}\" is not a valid hexadecimal digit", c),
            )
        })?;
        for shift in (0..4).rev() {
            bits.push(nibble & (1 << shift) != 0);
        }
    }
    Ok(bits)
}
