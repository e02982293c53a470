//! PostgreSQL array text: `{1,2,3}`, `{{a,b},{c,d}}`, `[0:1]={x,y}`.
//!
//! Encoding walks a [`PgArray`] and hands each leaf to a caller-supplied
//! element encoder. Decoding is two-phase: a cheap pass counts the items of
//! a level to size its container, then a single-pass state machine splits
//! the level into elements and recurses into nested sub-arrays.
//!
//! Reference: https://www.postgresql.org/docs/current/arrays.html#ARRAYS-IO

use nom::{
    character::complete::{char, digit1, multispace0, one_of},
    combinator::{map_res, opt, recognize},
    multi::many1,
    sequence::{delimited, pair, terminated},
    IResult,
};
use serde::{Deserialize, Serialize};

use crate::error::{CodecError, CodecResult};
use crate::escape::push_array_element;
use crate::scan::Cursor;

/// Maximum number of array dimensions (PostgreSQL `MAXDIM`).
pub const MAX_DIMS: usize = 6;

/// Maximum number of array slots (PostgreSQL `MaxArraySize`).
pub const MAX_ARRAY_SIZE: usize = 0x3fff_ffff / 8;

/// One slot of an array level.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayItem<T> {
    Null,
    Value(T),
    Nested(PgArray<T>),
}

/// A possibly multidimensional array value.
#[derive(Debug, Clone, PartialEq)]
pub struct PgArray<T> {
    items: Vec<ArrayItem<T>>,
}

impl<T> Default for PgArray<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> PgArray<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn from_items(items: Vec<ArrayItem<T>>) -> Self {
        Self { items }
    }

    /// One-dimensional array without nulls.
    pub fn from_values(values: impl IntoIterator<Item = T>) -> Self {
        values.into_iter().map(ArrayItem::Value).collect()
    }

    /// One-dimensional array, `None` becoming NULL.
    pub fn from_options(values: impl IntoIterator<Item = Option<T>>) -> Self {
        values
            .into_iter()
            .map(|v| v.map_or(ArrayItem::Null, ArrayItem::Value))
            .collect()
    }

    /// Array whose items are the given sub-arrays.
    pub fn nested(rows: impl IntoIterator<Item = PgArray<T>>) -> Self {
        rows.into_iter().map(ArrayItem::Nested).collect()
    }

    pub fn push(&mut self, value: T) {
        self.items.push(ArrayItem::Value(value));
    }

    pub fn push_null(&mut self) {
        self.items.push(ArrayItem::Null);
    }

    pub fn push_nested(&mut self, sub: PgArray<T>) {
        self.items.push(ArrayItem::Nested(sub));
    }

    /// Number of items at the top level.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[ArrayItem<T>] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ArrayItem<T>> {
        self.items.iter()
    }

    pub fn into_items(self) -> Vec<ArrayItem<T>> {
        self.items
    }

    /// Nesting depth; a flat array has depth 1.
    pub fn depth(&self) -> usize {
        1 + self
            .items
            .iter()
            .filter_map(|item| match item {
                ArrayItem::Nested(sub) => Some(sub.depth()),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }
}

impl<T> FromIterator<ArrayItem<T>> for PgArray<T> {
    fn from_iter<I: IntoIterator<Item = ArrayItem<T>>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<'a, T> IntoIterator for &'a PgArray<T> {
    type Item = &'a ArrayItem<T>;
    type IntoIter = std::slice::Iter<'a, ArrayItem<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

// ==================== Shape ====================

/// Bounds of one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimension {
    pub lower: i32,
    pub length: usize,
}

impl Dimension {
    pub fn new(lower: i32, length: usize) -> Self {
        Self { lower, length }
    }

    /// Inclusive upper bound.
    pub fn upper(&self) -> i64 {
        self.lower as i64 + self.length as i64 - 1
    }
}

/// Per-dimension bounds of an array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayShape {
    dims: Vec<Dimension>,
}

impl ArrayShape {
    pub fn new(dims: Vec<Dimension>) -> CodecResult<Self> {
        if dims.is_empty() {
            return Err(CodecError::invalid("an array shape needs at least one dimension"));
        }
        if dims.len() > MAX_DIMS {
            return Err(too_many_dims(dims.len()));
        }
        let slots = dims
            .iter()
            .try_fold(1usize, |acc, d| acc.checked_mul(d.length))
            .filter(|&n| n <= MAX_ARRAY_SIZE);
        if slots.is_none() {
            return Err(CodecError::range(format!(
                "array size exceeds the maximum allowed ({})",
                MAX_ARRAY_SIZE
            )));
        }
        Ok(Self { dims })
    }

    /// Default lower bounds (1) with the given lengths.
    pub fn with_lengths(lengths: &[usize]) -> CodecResult<Self> {
        Self::new(lengths.iter().map(|&n| Dimension::new(1, n)).collect())
    }

    /// Shape of an array value, which must be rectangular.
    pub fn of<T>(array: &PgArray<T>) -> CodecResult<Self> {
        let depth = array.depth();
        if depth > MAX_DIMS {
            return Err(too_many_dims(depth));
        }
        let mut lengths = vec![None; depth];
        collect_lengths(array, 0, depth, &mut lengths)?;
        Self::with_lengths(&lengths.into_iter().map_while(|n| n).collect::<Vec<_>>())
    }

    pub fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    pub fn lengths(&self) -> Vec<usize> {
        self.dims.iter().map(|d| d.length).collect()
    }

    /// Total number of leaf slots, at most [`MAX_ARRAY_SIZE`].
    pub fn cardinality(&self) -> usize {
        self.dims.iter().map(|d| d.length).product()
    }

    /// Whether every dimension starts at 1.
    pub fn is_default_bounds(&self) -> bool {
        self.dims.iter().all(|d| d.lower == 1)
    }

    /// Append `[lo:hi]...=`.
    pub fn write_decoration(&self, buf: &mut String) {
        let mut tmp = itoa::Buffer::new();
        for dim in &self.dims {
            buf.push('[');
            buf.push_str(tmp.format(dim.lower));
            buf.push(':');
            buf.push_str(tmp.format(dim.upper()));
            buf.push(']');
        }
        buf.push('=');
    }
}

impl std::fmt::Display for ArrayShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for dim in &self.dims {
            write!(f, "[{}:{}]", dim.lower, dim.upper())?;
        }
        Ok(())
    }
}

fn too_many_dims(found: usize) -> CodecError {
    CodecError::range(format!(
        "number of array dimensions ({}) exceeds the maximum allowed ({})",
        found, MAX_DIMS
    ))
}

fn ragged() -> CodecError {
    CodecError::invalid("multidimensional arrays must have sub-arrays with matching dimensions")
}

fn collect_lengths<T>(
    array: &PgArray<T>,
    level: usize,
    depth: usize,
    lengths: &mut [Option<usize>],
) -> CodecResult<()> {
    match lengths[level] {
        None => lengths[level] = Some(array.len()),
        Some(n) if n != array.len() => return Err(ragged()),
        Some(_) => {}
    }
    for item in array {
        match item {
            ArrayItem::Nested(sub) => collect_lengths(sub, level + 1, depth, lengths)?,
            ArrayItem::Value(_) | ArrayItem::Null if level + 1 != depth => {
                return Err(ragged());
            }
            _ => {}
        }
    }
    Ok(())
}

/// When to write the `[lo:hi]=` decoration on output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoundsPolicy {
    /// Never decorate; lower bounds are lost.
    Never,
    /// Decorate only when some lower bound differs from 1.
    #[default]
    NonDefault,
    /// Always decorate non-empty arrays.
    Always,
}

impl BoundsPolicy {
    pub fn emits(self, shape: &ArrayShape) -> bool {
        match self {
            Self::Never => false,
            Self::NonDefault => !shape.is_default_bounds(),
            Self::Always => true,
        }
    }
}

// ==================== Encoding ====================

/// Append the `{...}` text of `array`.
///
/// `encode` writes the unquoted text of one element; it is then quoted
/// according to the array element rules. NULL items are written bare.
pub fn encode_array<T, F>(buf: &mut String, array: &PgArray<T>, mut encode: F) -> CodecResult<()>
where
    F: FnMut(&T, &mut String) -> CodecResult<()>,
{
    let start = buf.len();
    let mut scratch = String::new();
    let result = write_level(buf, array, &mut encode, &mut scratch);
    if result.is_err() {
        buf.truncate(start);
    }
    result
}

fn write_level<T, F>(
    buf: &mut String,
    array: &PgArray<T>,
    encode: &mut F,
    scratch: &mut String,
) -> CodecResult<()>
where
    F: FnMut(&T, &mut String) -> CodecResult<()>,
{
    buf.push('{');
    for (i, item) in array.iter().enumerate() {
        if i > 0 {
            buf.push(',');
        }
        match item {
            ArrayItem::Null => buf.push_str("NULL"),
            ArrayItem::Nested(sub) => write_level(buf, sub, encode, scratch)?,
            ArrayItem::Value(value) => {
                scratch.clear();
                encode(value, scratch)?;
                push_array_element(buf, scratch);
            }
        }
    }
    buf.push('}');
    Ok(())
}

/// Append a flat slice as a one-dimensional array.
pub fn encode_slice<T, F>(buf: &mut String, values: &[Option<T>], mut encode: F) -> CodecResult<()>
where
    F: FnMut(&T, &mut String) -> CodecResult<()>,
{
    let start = buf.len();
    let mut scratch = String::new();
    buf.push('{');
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            buf.push(',');
        }
        match value {
            None => buf.push_str("NULL"),
            Some(v) => {
                scratch.clear();
                if let Err(e) = encode(v, &mut scratch) {
                    buf.truncate(start);
                    return Err(e);
                }
                push_array_element(buf, &scratch);
            }
        }
    }
    buf.push('}');
    Ok(())
}

/// Like [`encode_array`], writing the bound decoration when `policy` asks.
///
/// Without an explicit `shape` the array's own shape with lower bounds of 1
/// is used. An explicit shape must agree with the array's lengths.
pub fn encode_array_shaped<T, F>(
    buf: &mut String,
    array: &PgArray<T>,
    shape: Option<&ArrayShape>,
    policy: BoundsPolicy,
    encode: F,
) -> CodecResult<()>
where
    F: FnMut(&T, &mut String) -> CodecResult<()>,
{
    let actual = ArrayShape::of(array)?;
    let shape = match shape {
        Some(s) if s.ndim() != actual.ndim() => {
            return Err(CodecError::DimensionMismatch {
                expected: actual.ndim(),
                found: s.ndim(),
            });
        }
        Some(s) if s.lengths() != actual.lengths() => {
            return Err(CodecError::invalid(format!(
                "array bounds {} do not match its contents {}",
                s, actual
            )));
        }
        Some(s) => s.clone(),
        None => actual,
    };

    let start = buf.len();
    if !array.is_empty() && policy.emits(&shape) {
        shape.write_decoration(buf);
    }
    if let Err(e) = encode_array(buf, array, encode) {
        buf.truncate(start);
        return Err(e);
    }
    Ok(())
}

// ==================== Bound Decoration ====================

fn bound(input: &str) -> IResult<&str, i32> {
    delimited(
        multispace0,
        map_res(recognize(pair(opt(one_of("+-")), digit1)), |s: &str| {
            s.parse::<i32>()
        }),
        multispace0,
    )(input)
}

/// `[lo:hi]` or `[hi]`, repeated, then `=`.
fn decoration(input: &str) -> IResult<&str, Vec<(Option<i32>, i32)>> {
    terminated(
        many1(delimited(
            pair(multispace0, char('[')),
            pair(opt(terminated(bound, char(':'))), bound),
            char(']'),
        )),
        pair(multispace0, char('=')),
    )(input)
}

/// Parse an optional leading bound decoration, leaving `cur` at the body.
fn parse_decoration(cur: &mut Cursor<'_>) -> CodecResult<Option<ArrayShape>> {
    cur.skip_whitespace();
    if cur.peek() != Some('[') {
        return Ok(None);
    }
    let start = cur.offset();
    let input = cur.rest();
    let pairs = match decoration(input) {
        Ok((rest, pairs)) => {
            cur.advance(input.len() - rest.len());
            pairs
        }
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
            return Err(CodecError::format(
                start + input.len() - e.input.len(),
                "malformed array dimensions",
            ));
        }
        Err(nom::Err::Incomplete(_)) => {
            return Err(cur.eof_error("malformed array dimensions"));
        }
    };
    if pairs.len() > MAX_DIMS {
        return Err(too_many_dims(pairs.len()));
    }

    let mut dims = Vec::with_capacity(pairs.len());
    for (lower, upper) in pairs {
        let lower = lower.unwrap_or(1);
        if upper < lower {
            return Err(CodecError::format(
                start,
                "upper bound cannot be less than lower bound",
            ));
        }
        dims.push(Dimension::new(lower, (upper as i64 - lower as i64 + 1) as usize));
    }
    let shape = ArrayShape::new(dims)?;
    tracing::trace!(%shape, "parsed array bound decoration");
    Ok(Some(shape))
}

// ==================== Length Inference ====================

/// Number of top-level items in array text; `{}` has none.
///
/// A leading bound decoration is skipped.
pub fn infer_length(text: &str) -> CodecResult<usize> {
    let mut cur = Cursor::new(text);
    parse_decoration(&mut cur)?;
    cur.skip_whitespace();
    if !cur.eat('{') {
        return Err(cur.error("array value must start with \"{\""));
    }
    count_items(cur)
}

/// Shape of array text without decoding its elements.
///
/// A bound decoration is returned as written; otherwise the lengths are
/// read along the first item of each level with lower bounds of 1.
pub fn infer_shape(text: &str) -> CodecResult<ArrayShape> {
    let mut cur = Cursor::new(text);
    if let Some(shape) = parse_decoration(&mut cur)? {
        return Ok(shape);
    }
    let mut lengths = Vec::new();
    loop {
        cur.skip_whitespace();
        if !cur.eat('{') {
            return Err(cur.error("array value must start with \"{\""));
        }
        let length = count_items(cur)?;
        lengths.push(length);
        if lengths.len() > MAX_DIMS {
            return Err(too_many_dims(lengths.len()));
        }
        cur.skip_whitespace();
        if length == 0 || cur.peek() != Some('{') {
            break;
        }
    }
    ArrayShape::with_lengths(&lengths)
}

/// Count the items of a level whose `{` has just been consumed.
///
/// Nested braces and quoted runs are opaque; a backslash hides the next
/// character.
fn count_items(mut cur: Cursor<'_>) -> CodecResult<usize> {
    let mut depth = 1usize;
    let mut in_quote = false;
    let mut commas = 0usize;
    let mut seen = false;
    while let Some(c) = cur.bump() {
        match c {
            '\\' => {
                cur.bump();
                seen = true;
            }
            '"' => {
                in_quote = !in_quote;
                seen = true;
            }
            _ if in_quote => {}
            '{' => {
                depth += 1;
                seen = true;
            }
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(if seen || commas > 0 { commas + 1 } else { 0 });
                }
            }
            ',' if depth == 1 => commas += 1,
            c if !c.is_whitespace() => seen = true,
            _ => {}
        }
    }
    Err(cur.eof_error(if in_quote {
        "unterminated quoted array element"
    } else {
        "unterminated array"
    }))
}

// ==================== Decoding ====================

/// Decode array text with `dims` declared dimensions.
///
/// `decode` receives the unescaped text of each non-NULL element. Any
/// lower bounds are dropped; see [`decode_array_with_shape`].
pub fn decode_array<T, F>(text: &str, dims: usize, decode: F) -> CodecResult<PgArray<T>>
where
    F: FnMut(&str) -> CodecResult<T>,
{
    decode_array_with_shape(text, dims, decode).map(|(array, _)| array)
}

/// Decode array text and report its shape, including declared lower bounds.
///
/// An empty array has no elements to give it depth, so its shape is a
/// single zero-length dimension whatever `dims` says.
pub fn decode_array_with_shape<T, F>(
    text: &str,
    dims: usize,
    mut decode: F,
) -> CodecResult<(PgArray<T>, ArrayShape)>
where
    F: FnMut(&str) -> CodecResult<T>,
{
    if dims == 0 {
        return Err(CodecError::invalid("an array needs at least one dimension"));
    }
    if dims > MAX_DIMS {
        return Err(too_many_dims(dims));
    }

    let mut cur = Cursor::new(text);
    let declared = parse_decoration(&mut cur)?;
    if let Some(shape) = &declared {
        if shape.ndim() != dims {
            return Err(CodecError::DimensionMismatch {
                expected: dims,
                found: shape.ndim(),
            });
        }
    }

    let body_start = cur.offset();
    let mut lengths = vec![None; dims];
    let array = scan_level(&mut cur, 0, &mut lengths, &mut decode)?;
    cur.expect_end("array")?;

    let found: Vec<usize> = lengths.into_iter().map_while(|n| n).collect();
    let shape = match declared {
        Some(shape) => {
            if shape.lengths() != found && !(array.is_empty() && shape.cardinality() == 0) {
                return Err(CodecError::format(
                    body_start,
                    "specified array dimensions do not match array contents",
                ));
            }
            shape
        }
        None => ArrayShape::with_lengths(&found)?,
    };

    tracing::debug!(dims, items = array.len(), %shape, "decoded array");
    Ok((array, shape))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    AwaitingOpenBrace,
    Normal,
    InQuote,
    /// Skipping to the `}` matching the `{` at local offset `start`.
    InNestedBrace { start: usize, depth: usize, in_quote: bool },
}

/// The element being accumulated between separators.
struct Token<T> {
    text: String,
    /// Length of `text` up to its last significant character.
    keep: usize,
    started: bool,
    quoted: bool,
    at: usize,
    nested: Option<PgArray<T>>,
}

impl<T> Token<T> {
    fn new() -> Self {
        Self {
            text: String::new(),
            keep: 0,
            started: false,
            quoted: false,
            at: 0,
            nested: None,
        }
    }

    fn start(&mut self, at: usize) {
        if !self.started {
            self.started = true;
            self.at = at;
        }
    }

    fn push_significant(&mut self, c: char) {
        self.text.push(c);
        self.keep = self.text.len();
    }
}

/// Decode one `{...}` level; `cur` may start with whitespace.
fn scan_level<T, F>(
    cur: &mut Cursor<'_>,
    level: usize,
    lengths: &mut [Option<usize>],
    decode: &mut F,
) -> CodecResult<PgArray<T>>
where
    F: FnMut(&str) -> CodecResult<T>,
{
    let leaf = level + 1 == lengths.len();
    let mut state = ScanState::AwaitingOpenBrace;
    let mut items: Vec<ArrayItem<T>> = Vec::new();
    let mut token = Token::new();

    loop {
        let at = cur.offset();
        let local = cur.local();
        let Some(c) = cur.bump() else {
            return Err(cur.eof_error(match state {
                ScanState::AwaitingOpenBrace => "array value must start with \"{\"",
                ScanState::InQuote => "unterminated quoted array element",
                _ => "unterminated array",
            }));
        };

        match state {
            ScanState::AwaitingOpenBrace => {
                if c == '{' {
                    let expected = count_items(*cur)?;
                    if expected == 0 {
                        cur.skip_whitespace();
                        cur.eat('}');
                        break;
                    }
                    items.reserve_exact(expected);
                    state = ScanState::Normal;
                } else if !c.is_whitespace() {
                    return Err(CodecError::format(at, "array value must start with \"{\""));
                }
            }
            ScanState::Normal => match c {
                '"' => {
                    if token.nested.is_some() {
                        return Err(CodecError::format(at, "unexpected \"\"\" character"));
                    }
                    token.start(at);
                    token.quoted = true;
                    state = ScanState::InQuote;
                }
                '\\' => {
                    let Some(escaped) = cur.bump() else {
                        return Err(cur.eof_error("unexpected end of input after \"\\\""));
                    };
                    token.start(at);
                    token.push_significant(escaped);
                }
                '{' => {
                    if leaf || token.started || token.nested.is_some() {
                        return Err(CodecError::format(at, "unexpected \"{\" character"));
                    }
                    state = ScanState::InNestedBrace {
                        start: local,
                        depth: 1,
                        in_quote: false,
                    };
                }
                ',' | '}' => {
                    let done = std::mem::replace(&mut token, Token::new());
                    items.push(close_token(done, leaf, at, c, decode)?);
                    if c == '}' {
                        break;
                    }
                }
                c if c.is_whitespace() => {
                    if token.started {
                        token.text.push(c);
                    }
                }
                c => {
                    if token.nested.is_some() {
                        return Err(CodecError::format(
                            at,
                            format!("unexpected \"{}\" character", c),
                        ));
                    }
                    token.start(at);
                    token.push_significant(c);
                }
            },
            ScanState::InQuote => match c {
                '\\' => {
                    let Some(escaped) = cur.bump() else {
                        return Err(cur.eof_error("unterminated quoted array element"));
                    };
                    token.push_significant(escaped);
                }
                '"' => {
                    token.keep = token.text.len();
                    state = ScanState::Normal;
                }
                c => token.push_significant(c),
            },
            ScanState::InNestedBrace {
                start,
                depth,
                in_quote,
            } => {
                let (depth, in_quote) = match c {
                    '\\' => {
                        cur.bump();
                        (depth, in_quote)
                    }
                    '"' => (depth, !in_quote),
                    _ if in_quote => (depth, in_quote),
                    '{' => (depth + 1, false),
                    '}' => (depth - 1, false),
                    _ => (depth, false),
                };
                if depth == 0 {
                    let mut sub = cur.sub(start, cur.local());
                    let nested = scan_level(&mut sub, level + 1, lengths, decode)?;
                    token.start(at);
                    token.nested = Some(nested);
                    state = ScanState::Normal;
                } else {
                    state = ScanState::InNestedBrace {
                        start,
                        depth,
                        in_quote,
                    };
                }
            }
        }
    }

    match lengths[level] {
        None => lengths[level] = Some(items.len()),
        Some(n) if n != items.len() => {
            return Err(CodecError::format(
                cur.offset().saturating_sub(1),
                "multidimensional arrays must have sub-arrays with matching dimensions",
            ));
        }
        Some(_) => {}
    }
    Ok(PgArray::from_items(items))
}

fn close_token<T, F>(
    mut token: Token<T>,
    leaf: bool,
    at: usize,
    separator: char,
    decode: &mut F,
) -> CodecResult<ArrayItem<T>>
where
    F: FnMut(&str) -> CodecResult<T>,
{
    if let Some(nested) = token.nested {
        return Ok(ArrayItem::Nested(nested));
    }
    if !token.started {
        return Err(CodecError::format(
            at,
            format!("unexpected \"{}\" character", separator),
        ));
    }
    if !leaf {
        return Err(CodecError::format(token.at, "expected \"{\" character"));
    }
    token.text.truncate(token.keep);
    if !token.quoted && token.text.eq_ignore_ascii_case("NULL") {
        return Ok(ArrayItem::Null);
    }
    decode(&token.text).map(ArrayItem::Value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> CodecResult<String> {
        Ok(s.to_string())
    }

    fn int(s: &str) -> CodecResult<i32> {
        s.parse()
            .map_err(|_| CodecError::invalid(format!("invalid integer \"{}\"", s)))
    }

    fn render_ints(array: &PgArray<i32>) -> String {
        let mut buf = String::new();
        encode_array(&mut buf, array, |v, b| {
            b.push_str(&v.to_string());
            Ok(())
        })
        .unwrap();
        buf
    }

    fn render_text(array: &PgArray<String>) -> String {
        let mut buf = String::new();
        encode_array(&mut buf, array, |v, b| {
            b.push_str(v);
            Ok(())
        })
        .unwrap();
        buf
    }

    #[test]
    fn test_encode_flat() {
        let arr = PgArray::from_options(vec![Some(1), None, Some(3)]);
        assert_eq!(render_ints(&arr), "{1,NULL,3}");
        assert_eq!(render_ints(&PgArray::new()), "{}");
    }

    #[test]
    fn test_encode_quotes_elements() {
        let arr = PgArray::from_values(
            ["plain", "", "NULL", "a b", "x,y", "q\"uote", "back\\slash", "{}"]
                .map(String::from),
        );
        assert_eq!(
            render_text(&arr),
            r#"{plain,"","NULL","a b","x,y","q\"uote","back\\slash","{}"}"#
        );
    }

    #[test]
    fn test_encode_nested() {
        let arr = PgArray::nested([
            PgArray::from_values([1, 2]),
            PgArray::from_values([3, 4]),
        ]);
        assert_eq!(render_ints(&arr), "{{1,2},{3,4}}");
    }

    #[test]
    fn test_encode_slice_matches_owned() {
        let values = [Some("a b".to_string()), None];
        let mut from_slice = String::new();
        encode_slice(&mut from_slice, &values, |v, b| {
            b.push_str(v);
            Ok(())
        })
        .unwrap();
        assert_eq!(from_slice, render_text(&PgArray::from_options(values.clone())));
    }

    #[test]
    fn test_encode_error_rolls_back() {
        let mut buf = String::from("SELECT ");
        let arr = PgArray::from_values([1, 2]);
        let err = encode_array(&mut buf, &arr, |v, b| {
            if *v == 2 {
                return Err(CodecError::invalid("boom"));
            }
            b.push('1');
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, CodecError::InvalidValue(_)));
        assert_eq!(buf, "SELECT ");
    }

    #[test]
    fn test_decode_flat_with_nulls() {
        let arr = decode_array("{1,NULL,3}", 1, int).unwrap();
        assert_eq!(arr, PgArray::from_options(vec![Some(1), None, Some(3)]));

        let arr = decode_array("{1,null,3}", 1, int).unwrap();
        assert_eq!(arr.items()[1], ArrayItem::Null);
    }

    #[test]
    fn test_quoted_null_is_text() {
        let arr = decode_array(r#"{1,"NULL",3}"#, 1, text).unwrap();
        assert_eq!(arr.items()[1], ArrayItem::Value("NULL".to_string()));
    }

    #[test]
    fn test_decode_whitespace_and_escapes() {
        let arr = decode_array(r#" { a b , " padded " , "q\"x" , c\,d } "#, 1, text).unwrap();
        assert_eq!(
            arr,
            PgArray::from_values(["a b", " padded ", "q\"x", "c,d"].map(String::from))
        );
    }

    #[test]
    fn test_decode_empty() {
        let arr: PgArray<i32> = decode_array("{}", 1, int).unwrap();
        assert!(arr.is_empty());
        let arr: PgArray<i32> = decode_array("{  }", 2, int).unwrap();
        assert!(arr.is_empty());
        let arr = decode_array(r#"{""}"#, 1, text).unwrap();
        assert_eq!(arr, PgArray::from_values([String::new()]));
    }

    #[test]
    fn test_roundtrip_depths() {
        let one = PgArray::from_options(vec![Some(-1), None, Some(7)]);
        let two = PgArray::nested([one.clone(), PgArray::from_options(vec![None, None, Some(0)])]);
        let three = PgArray::nested([two.clone(), two.clone()]);
        for (depth, arr) in [(1, &one), (2, &two), (3, &three)] {
            let rendered = render_ints(arr);
            assert_eq!(&decode_array(&rendered, depth, int).unwrap(), arr, "{}", rendered);
        }

        let words = PgArray::nested([
            PgArray::from_options(vec![Some("it's".to_string()), None]),
            PgArray::from_options(vec![Some("{x}".to_string()), Some("\\".to_string())]),
        ]);
        let rendered = render_text(&words);
        assert_eq!(decode_array(&rendered, 2, text).unwrap(), words);
    }

    #[test]
    fn test_infer_length() {
        assert_eq!(infer_length("{1,2,3}").unwrap(), 3);
        assert_eq!(infer_length("{}").unwrap(), 0);
        assert_eq!(infer_length("{{1,2},{3,4}}").unwrap(), 2);
        assert_eq!(infer_length(r#"{"a,b","}",c}"#).unwrap(), 3);
        assert_eq!(infer_length(r#"{"\"",x}"#).unwrap(), 2);
        assert_eq!(infer_length("[0:4]={1,2,3,4,5}").unwrap(), 5);
    }

    #[test]
    fn test_infer_shape() {
        assert_eq!(infer_shape("{{1,2},{3,4}}").unwrap().lengths(), vec![2, 2]);
        assert_eq!(infer_shape("{{{1},{2},{3}}}").unwrap().lengths(), vec![1, 3, 1]);
        assert_eq!(infer_shape("{}").unwrap().lengths(), vec![0]);

        let shape = infer_shape("[0:1][-1:0]={{1,2},{3,4}}").unwrap();
        assert_eq!(shape.dims(), &[Dimension::new(0, 2), Dimension::new(-1, 2)]);
        assert_eq!(shape.to_string(), "[0:1][-1:0]");

        assert!(matches!(
            infer_shape("{{{{{{{1}}}}}}}"),
            Err(CodecError::Range(_))
        ));
    }

    #[test]
    fn test_decoration_matches_undecorated() {
        let plain = decode_array("{{1,2},{3,4}}", 2, int).unwrap();
        let (decorated, shape) =
            decode_array_with_shape("[0:1][0:1]={{1,2},{3,4}}", 2, int).unwrap();
        assert_eq!(decorated, plain);
        assert_eq!(shape.dims(), &[Dimension::new(0, 2), Dimension::new(0, 2)]);
        assert!(!shape.is_default_bounds());

        let (_, shape) = decode_array_with_shape("[3]={a,b,c}", 1, text).unwrap();
        assert_eq!(shape.dims(), &[Dimension::new(1, 3)]);
    }

    #[test]
    fn test_decoration_errors() {
        assert!(matches!(
            decode_array("[1:2]={{1},{2}}", 2, int),
            Err(CodecError::DimensionMismatch {
                expected: 2,
                found: 1
            })
        ));
        let err = decode_array("[1:3]={1,2}", 1, int).unwrap_err();
        assert!(matches!(err, CodecError::Format { position: 6, .. }));

        let err = decode_array("[2:1]={1}", 1, int).unwrap_err();
        assert_eq!(err.position(), Some(0));

        let err = decode_array("[1:x]={1}", 1, int).unwrap_err();
        assert_eq!(err.position(), Some(3));
    }

    #[test]
    fn test_oversized_decoration() {
        let err = decode_array("[0:2147483646][0:2147483646][0:2147483646]={}", 3, int)
            .unwrap_err();
        assert!(matches!(err, CodecError::Range(_)), "{:?}", err);

        let err = decode_array("[1:200000000]={}", 1, int).unwrap_err();
        assert!(matches!(err, CodecError::Range(_)));

        let big = ArrayShape::with_lengths(&[MAX_ARRAY_SIZE]).unwrap();
        assert_eq!(big.cardinality(), MAX_ARRAY_SIZE);
        assert!(ArrayShape::with_lengths(&[MAX_ARRAY_SIZE, 2]).is_err());
    }

    #[test]
    fn test_empty_shape_is_one_dimensional() {
        let (arr, shape) = decode_array_with_shape("{  }", 2, int).unwrap();
        assert!(arr.is_empty());
        assert_eq!(shape.dims(), &[Dimension::new(1, 0)]);

        let mut buf = String::new();
        encode_array_shaped(&mut buf, &arr, Some(&shape), BoundsPolicy::Always, |v, b| {
            b.push_str(&v.to_string());
            Ok(())
        })
        .unwrap();
        assert_eq!(buf, "{}");
    }

    #[test]
    fn test_null_where_sub_array_expected() {
        let err = decode_array("{{1,2},NULL}", 2, int).unwrap_err();
        assert!(matches!(err, CodecError::Format { position: 7, .. }), "{:?}", err);

        let err = decode_array("{NULL,{1,2}}", 2, int).unwrap_err();
        assert_eq!(err.position(), Some(1));

        // quoted or not, a scalar cannot stand in for a level
        assert!(decode_array(r#"{{"a"},"NULL"}"#, 2, text).is_err());

        let arr = decode_array("{{1,NULL},{NULL,4}}", 2, int).unwrap();
        assert_eq!(arr.items()[1], ArrayItem::Nested(PgArray::from_options(vec![None, Some(4)])));
    }

    #[test]
    fn test_unterminated_reports_end_offset() {
        let err = decode_array("{1,2", 1, int).unwrap_err();
        assert!(matches!(err, CodecError::Format { position: 4, .. }));

        let err = decode_array(r#"{"abc"#, 1, text).unwrap_err();
        assert_eq!(err.position(), Some(5));

        let err = decode_array("{{1,2}", 2, int).unwrap_err();
        assert_eq!(err.position(), Some(6));
    }

    #[test]
    fn test_dimension_errors() {
        // nested brace in a one-dimensional context
        let err = decode_array("{1,{2}}", 1, int).unwrap_err();
        assert_eq!(err.position(), Some(3));

        // scalar where a sub-array is expected
        let err = decode_array("{{1},2}", 2, int).unwrap_err();
        assert_eq!(err.position(), Some(5));

        // ragged
        assert!(matches!(
            decode_array("{{1,2},{3}}", 2, int),
            Err(CodecError::Format { .. })
        ));

        assert!(matches!(decode_array("{1}", 7, int), Err(CodecError::Range(_))));
    }

    #[test]
    fn test_malformed_elements() {
        assert_eq!(decode_array("{1,,2}", 1, int).unwrap_err().position(), Some(3));
        assert_eq!(decode_array("{1,}", 1, int).unwrap_err().position(), Some(3));
        assert_eq!(decode_array("x{1}", 1, int).unwrap_err().position(), Some(0));
        assert_eq!(decode_array("{1} x", 1, int).unwrap_err().position(), Some(4));
    }

    #[test]
    fn test_element_error_propagates() {
        let err = decode_array("{1,x}", 1, int).unwrap_err();
        assert!(matches!(err, CodecError::InvalidValue(_)));
    }

    #[test]
    fn test_shape_of() {
        let arr = PgArray::nested([PgArray::from_values([1, 2, 3]), PgArray::from_values([4, 5, 6])]);
        assert_eq!(ArrayShape::of(&arr).unwrap().lengths(), vec![2, 3]);

        let ragged = PgArray::nested([PgArray::from_values([1]), PgArray::from_values([2, 3])]);
        assert!(ArrayShape::of(&ragged).is_err());

        let mixed = PgArray::from_items(vec![
            ArrayItem::Value(1),
            ArrayItem::Nested(PgArray::from_values([2])),
        ]);
        assert!(ArrayShape::of(&mixed).is_err());

        let null_level = PgArray::from_items(vec![
            ArrayItem::Nested(PgArray::from_values([1, 2])),
            ArrayItem::Null,
        ]);
        assert!(ArrayShape::of(&null_level).is_err());
        let null_first = PgArray::from_items(vec![
            ArrayItem::Null,
            ArrayItem::Nested(PgArray::from_values([1, 2])),
        ]);
        assert!(ArrayShape::of(&null_first).is_err());

        let null_leaves = PgArray::nested([PgArray::from_options(vec![None::<i32>, None])]);
        assert_eq!(ArrayShape::of(&null_leaves).unwrap().lengths(), vec![1, 2]);
    }

    #[test]
    fn test_encode_shaped_policies() {
        let arr = PgArray::from_values([7, 8]);
        let zero_based = ArrayShape::new(vec![Dimension::new(0, 2)]).unwrap();
        let write = |b: &mut String, shape: Option<&ArrayShape>, policy: BoundsPolicy| {
            encode_array_shaped(b, &arr, shape, policy, |v, out| {
                out.push_str(&v.to_string());
                Ok(())
            })
        };

        let mut buf = String::new();
        write(&mut buf, Some(&zero_based), BoundsPolicy::NonDefault).unwrap();
        assert_eq!(buf, "[0:1]={7,8}");

        let mut buf = String::new();
        write(&mut buf, None, BoundsPolicy::NonDefault).unwrap();
        assert_eq!(buf, "{7,8}");

        let mut buf = String::new();
        write(&mut buf, None, BoundsPolicy::Always).unwrap();
        assert_eq!(buf, "[1:2]={7,8}");

        let mut buf = String::new();
        write(&mut buf, Some(&zero_based), BoundsPolicy::Never).unwrap();
        assert_eq!(buf, "{7,8}");

        let wrong = ArrayShape::with_lengths(&[3]).unwrap();
        assert!(write(&mut String::new(), Some(&wrong), BoundsPolicy::Always).is_err());
    }

    #[test]
    fn test_bounds_policy_serde() {
        let policy: BoundsPolicy = serde_json::from_str("\"non-default\"").unwrap();
        assert_eq!(policy, BoundsPolicy::NonDefault);
        assert_eq!(serde_json::to_string(&BoundsPolicy::Always).unwrap(), "\"always\"");
    }
}
