//! Composite record text: `(1,"a,b",)`.
//!
//! Columns are split in one pass that tracks parenthesis depth for nested
//! composites and quote state for quoted columns. The raw column spans are
//! counted before any column is decoded.

use crate::error::{CodecError, CodecResult};
use crate::escape::{push_record_column, unescape_record_column};
use crate::scan::Cursor;
use crate::types::SqlTypeKind;
use crate::value::PgValue;

/// Column layout expected when decoding a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordType {
    /// Exactly these columns, in order.
    Columns(Vec<SqlTypeKind>),
    /// Any number of columns, each decoded as text.
    Unlimited,
}

impl RecordType {
    /// Required column count, if the layout is fixed.
    pub fn column_count(&self) -> Option<usize> {
        match self {
            RecordType::Columns(kinds) => Some(kinds.len()),
            RecordType::Unlimited => None,
        }
    }

    /// Kind used to decode column `index`.
    pub fn column_kind(&self, index: usize) -> SqlTypeKind {
        match self {
            RecordType::Columns(kinds) => {
                kinds.get(index).copied().unwrap_or(SqlTypeKind::Unknown)
            }
            RecordType::Unlimited => SqlTypeKind::Unknown,
        }
    }
}

impl From<Vec<SqlTypeKind>> for RecordType {
    fn from(kinds: Vec<SqlTypeKind>) -> Self {
        RecordType::Columns(kinds)
    }
}

/// Split record text into raw column spans, quotes still in place.
///
/// `()` has no columns.
pub fn split_columns(text: &str) -> CodecResult<Vec<&str>> {
    let mut cur = Cursor::new(text);
    cur.skip_whitespace();
    if !cur.eat('(') {
        return Err(cur.error("malformed record literal: missing left parenthesis"));
    }

    let mut spans = Vec::new();
    let mut start = cur.local();
    let mut depth = 0usize;
    let mut in_quote = false;
    loop {
        let before = cur.local();
        let Some(c) = cur.bump() else {
            return Err(cur.eof_error("malformed record literal: unexpected end of input"));
        };
        match c {
            '\\' => {
                if cur.bump().is_none() {
                    return Err(cur.eof_error("malformed record literal: unexpected end of input"));
                }
            }
            '"' if in_quote => {
                if !cur.eat('"') {
                    in_quote = false;
                }
            }
            '"' => in_quote = true,
            _ if in_quote => {}
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            ',' if depth == 0 => {
                spans.push(cur.slice(start, before));
                start = cur.local();
            }
            ')' => {
                if !(spans.is_empty() && start == before) {
                    spans.push(cur.slice(start, before));
                }
                break;
            }
            _ => {}
        }
    }
    cur.expect_end("right parenthesis")?;
    Ok(spans)
}

/// Resolve a raw span to its column text; `None` is null.
fn column_text(raw: &str) -> Option<std::borrow::Cow<'_, str>> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("NULL") {
        None
    } else if raw.starts_with('"') {
        Some(std::borrow::Cow::Owned(unescape_record_column(raw)))
    } else {
        Some(std::borrow::Cow::Borrowed(raw))
    }
}

/// Decode record text with a per-column decoder.
///
/// `decode` receives the column index and its unescaped text. When
/// `expected` is set the column count must match it exactly; the check runs
/// before any column is decoded.
pub fn decode_record_with<T, F>(
    text: &str,
    expected: Option<usize>,
    mut decode: F,
) -> CodecResult<Vec<Option<T>>>
where
    F: FnMut(usize, &str) -> CodecResult<T>,
{
    let mut spans = split_columns(text)?;
    // a single null column prints as "()"
    if spans.is_empty() && expected == Some(1) {
        spans.push("");
    }
    if let Some(expected) = expected {
        if spans.len() != expected {
            return Err(CodecError::ColumnCount {
                expected,
                found: spans.len(),
            });
        }
    }

    let columns = spans
        .iter()
        .enumerate()
        .map(|(i, raw)| column_text(raw).map(|col| decode(i, &col)).transpose())
        .collect::<CodecResult<Vec<_>>>()?;
    tracing::debug!(columns = columns.len(), "decoded record");
    Ok(columns)
}

/// Decode record text into values of the given layout.
///
/// Unlimited records decode every column as text.
pub fn decode_record(text: &str, record_type: &RecordType) -> CodecResult<Vec<PgValue>> {
    let columns = decode_record_with(text, record_type.column_count(), |i, col| {
        PgValue::from_text(record_type.column_kind(i), col)
    })?;
    Ok(columns
        .into_iter()
        .map(|col| col.unwrap_or(PgValue::Null))
        .collect())
}

/// Append `(...)` text for a column sequence; `None` columns are left empty.
pub fn encode_record<'a, T, I, F>(buf: &mut String, columns: I, mut encode: F) -> CodecResult<()>
where
    T: 'a + ?Sized,
    I: IntoIterator<Item = Option<&'a T>>,
    F: FnMut(&T, &mut String) -> CodecResult<()>,
{
    let start = buf.len();
    let mut scratch = String::new();
    buf.push('(');
    for (i, column) in columns.into_iter().enumerate() {
        if i > 0 {
            buf.push(',');
        }
        if let Some(value) = column {
            scratch.clear();
            if let Err(e) = encode(value, &mut scratch) {
                buf.truncate(start);
                return Err(e);
            }
            push_record_column(buf, &scratch);
        }
    }
    buf.push(')');
    Ok(())
}
