//! String quoting and escaping for PostgreSQL literals.
//!
//! Three quoting conventions live here:
//!
//! - SQL string constants: `'it''s'` or, when a backslash escape is needed,
//!   the extended form `E'a\nb'`.
//! - Array elements inside `{...}`: `"..."` with backslash escapes.
//! - Record columns inside `(...)`: `"..."` with doubled quotes and backslashes.

use crate::error::{CodecError, CodecResult};
use crate::scan::Cursor;

/// Append `text` to `buf` as a quoted SQL string constant.
///
/// Quotes are doubled and never force the extended form. A backslash or a
/// control character (`NUL`, `\b`, `\f`, `\n`, `\r`, `\t`) is written as a
/// backslash escape, and once the whole text has been scanned an `E` is
/// inserted in front of the opening quote.
///
/// ```
/// let mut buf = String::new();
/// pgtext::escape::quote_literal(&mut buf, "it's");
/// assert_eq!(buf, "'it''s'");
///
/// let mut buf = String::from("xml ");
/// pgtext::escape::quote_literal(&mut buf, "a\tb");
/// assert_eq!(buf, "xml E'a\\tb'");
/// ```
pub fn quote_literal(buf: &mut String, text: &str) {
    let start = buf.len();
    buf.reserve(text.len() + 3);
    buf.push('\'');

    let mut extended = false;
    let mut run = 0;
    for (i, c) in text.char_indices() {
        let replacement = match c {
            '\'' => "''",
            '\\' => "\\\\",
            '\0' => "\\0",
            '\u{8}' => "\\b",
            '\u{c}' => "\\f",
            '\n' => "\\n",
            '\r' => "\\r",
            '\t' => "\\t",
            _ => continue,
        };
        buf.push_str(&text[run..i]);
        buf.push_str(replacement);
        run = i + c.len_utf8();
        if c != '\'' {
            extended = true;
        }
    }
    buf.push_str(&text[run..]);
    buf.push('\'');

    if extended {
        buf.insert(start, 'E');
        tracing::trace!(start, "extended string syntax used");
    }
}

/// Convenience wrapper around [`quote_literal`] returning a new string.
pub fn quoted(text: &str) -> String {
    let mut buf = String::with_capacity(text.len() + 3);
    quote_literal(&mut buf, text);
    buf
}

/// Parse a quoted SQL string constant back into its content.
///
/// Accepts both `'...'` and `E'...'`. In the extended form the usual
/// backslash escapes are honoured, including octal `\ooo`, hexadecimal
/// `\xHH` and unicode `\uXXXX` / `\UXXXXXXXX`.
pub fn unquote_literal(text: &str) -> CodecResult<String> {
    let mut cur = Cursor::new(text);
    cur.skip_whitespace();
    let extended = cur.eat('E') || cur.eat('e');
    if !cur.eat('\'') {
        return Err(cur.error("expected opening quote"));
    }

    let mut out = String::with_capacity(text.len());
    loop {
        let Some(c) = cur.bump() else {
            return Err(cur.eof_error("unterminated quoted string"));
        };
        match c {
            '\'' => {
                if cur.eat('\'') {
                    out.push('\'');
                } else {
                    break;
                }
            }
            '\\' if extended => {
                let at = cur.offset();
                let Some(e) = cur.bump() else {
                    return Err(cur.eof_error("unterminated escape sequence"));
                };
                match e {
                    'b' => out.push('\u{8}'),
                    'f' => out.push('\u{c}'),
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    '0'..='7' => {
                        let mut value = e.to_digit(8).unwrap_or(0);
                        for _ in 0..2 {
                            match cur.peek().and_then(|d| d.to_digit(8)) {
                                Some(d) => {
                                    value = value * 8 + d;
                                    cur.bump();
                                }
                                None => break,
                            }
                        }
                        out.push(code_point(value, at)?);
                    }
                    'x' => {
                        let value = take_hex(&mut cur, 2);
                        match value {
                            Some(v) => out.push(code_point(v, at)?),
                            None => out.push('x'),
                        }
                    }
                    'u' | 'U' => {
                        let width = if e == 'u' { 4 } else { 8 };
                        let before = cur.local();
                        match take_hex(&mut cur, width) {
                            Some(v) if cur.local() - before == width => {
                                out.push(code_point(v, at)?)
                            }
                            _ => {
                                return Err(CodecError::format(
                                    at,
                                    "invalid unicode escape sequence",
                                ));
                            }
                        }
                    }
                    other => out.push(other),
                }
            }
            other => out.push(other),
        }
    }
    cur.expect_end("quoted string")?;
    Ok(out)
}

fn take_hex(cur: &mut Cursor<'_>, max: usize) -> Option<u32> {
    let mut value: Option<u32> = None;
    for _ in 0..max {
        match cur.peek().and_then(|d| d.to_digit(16)) {
            Some(d) => {
                value = Some(value.unwrap_or(0) * 16 + d);
                cur.bump();
            }
            None => break,
        }
    }
    value
}

fn code_point(value: u32, at: usize) -> CodecResult<char> {
    char::from_u32(value).ok_or_else(|| CodecError::format(at, "invalid code point in escape"))
}

// ==================== Array Elements ====================

/// Whether an array element must be double-quoted to survive `array_in`.
pub fn array_element_needs_quotes(text: &str) -> bool {
    text.is_empty()
        || text.eq_ignore_ascii_case("NULL")
        || text
            .chars()
            .any(|c| matches!(c, '{' | '}' | ',' | '"' | '\\') || c.is_whitespace())
}

/// Append one array element, quoting it when required.
pub fn push_array_element(buf: &mut String, text: &str) {
    if !array_element_needs_quotes(text) {
        buf.push_str(text);
        return;
    }
    buf.push('"');
    for c in text.chars() {
        if c == '"' || c == '\\' {
            buf.push('\\');
        }
        buf.push(c);
    }
    buf.push('"');
}

// ==================== Record Columns ====================

/// Whether a record column must be double-quoted to survive `record_in`.
///
/// A bare `NULL` is quoted too, since the record decoder reads it as null.
pub fn record_column_needs_quotes(text: &str) -> bool {
    text.is_empty()
        || text.eq_ignore_ascii_case("NULL")
        || text
            .chars()
            .any(|c| matches!(c, '(' | ')' | ',' | '"' | '\\') || c.is_whitespace())
}

/// Append one record column, quoting it when required.
pub fn push_record_column(buf: &mut String, text: &str) {
    if !record_column_needs_quotes(text) {
        buf.push_str(text);
        return;
    }
    buf.push('"');
    for c in text.chars() {
        if c == '"' || c == '\\' {
            buf.push(c);
        }
        buf.push(c);
    }
    buf.push('"');
}

/// Remove record-column quoting from a raw column span.
///
/// Inside quotes `""` is a literal quote and `\` takes the next character
/// verbatim; quoted and unquoted runs may alternate within one column.
pub fn unescape_record_column(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    let mut in_quotes = false;
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    out.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_literal() {
        assert_eq!(quoted("hello"), "'hello'");
        assert_eq!(quoted(""), "''");
    }

    #[test]
    fn test_quote_only_stays_plain() {
        assert_eq!(quoted("O'Reilly"), "'O''Reilly'");
        assert_eq!(quoted("''"), "''''''");
    }

    #[test]
    fn test_backslash_forces_extended() {
        assert_eq!(quoted("C:\\tmp"), "E'C:\\\\tmp'");
        assert_eq!(quoted("a\nb"), "E'a\\nb'");
        assert_eq!(quoted("a\tb"), "E'a\\tb'");
        assert_eq!(quoted("it's\r\n"), "E'it''s\\r\\n'");
        assert_eq!(quoted("\u{8}\u{c}\0"), "E'\\b\\f\\0'");
    }

    #[test]
    fn test_prefix_inserted_at_recorded_start() {
        let mut buf = String::from("SELECT ");
        quote_literal(&mut buf, "x\\y");
        assert_eq!(buf, "SELECT E'x\\\\y'");
    }

    #[test]
    fn test_multibyte_runs_copied() {
        assert_eq!(quoted("héllo 'wörld'"), "'héllo ''wörld'''");
        assert_eq!(quoted("日本\n"), "E'日本\\n'");
    }

    #[test]
    fn test_unquote_roundtrip() {
        for s in ["plain", "it's", "back\\slash", "tab\there", "line\nbreak", "日本'語"] {
            assert_eq!(unquote_literal(&quoted(s)).unwrap(), s);
        }
    }

    #[test]
    fn test_unquote_extended_escapes() {
        assert_eq!(unquote_literal("E'\\x41\\102\\u00e9'").unwrap(), "ABé");
        assert_eq!(unquote_literal("e'\\q'").unwrap(), "q");
        // backslash is literal in the plain form
        assert_eq!(unquote_literal("'a\\nb'").unwrap(), "a\\nb");
    }

    #[test]
    fn test_unquote_errors() {
        let err = unquote_literal("'abc").unwrap_err();
        assert_eq!(err.position(), Some(4));
        assert!(unquote_literal("abc").is_err());
        assert!(unquote_literal("'a' b").is_err());
        assert!(unquote_literal("E'\\u12'").is_err());
    }

    #[test]
    fn test_array_element_quoting() {
        let mut buf = String::new();
        push_array_element(&mut buf, "plain");
        buf.push(',');
        push_array_element(&mut buf, "NULL");
        buf.push(',');
        push_array_element(&mut buf, "a \"b\" \\c");
        buf.push(',');
        push_array_element(&mut buf, "");
        assert_eq!(buf, r#"plain,"NULL","a \"b\" \\c","""#);
    }

    #[test]
    fn test_record_column_quoting() {
        let mut buf = String::new();
        push_record_column(&mut buf, "a,b");
        buf.push(',');
        push_record_column(&mut buf, "say \"hi\"");
        buf.push(',');
        push_record_column(&mut buf, "x\\y");
        buf.push(',');
        push_record_column(&mut buf, "null");
        assert_eq!(buf, r#""a,b","say ""hi""","x\\y","null""#);
    }

    #[test]
    fn test_unescape_record_column() {
        assert_eq!(unescape_record_column(r#""a,b""#), "a,b");
        assert_eq!(unescape_record_column(r#""say ""hi""""#), "say \"hi\"");
        assert_eq!(unescape_record_column(r#""x\\y""#), "x\\y");
        assert_eq!(unescape_record_column(r#""ab"cd"#), "abcd");
        assert_eq!(unescape_record_column(r#""""#), "");
    }
}
