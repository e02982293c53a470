//! Runtime values and their PostgreSQL text form.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::array::{encode_array, ArrayItem, ArrayShape, PgArray};
use crate::bits::{decode_bits, BitString};
use crate::error::{CodecError, CodecResult};
use crate::record::{decode_record, encode_record, RecordType};
use crate::temporal;
use crate::types::SqlTypeKind;

/// A value to be rendered as, or decoded from, PostgreSQL text.
#[derive(Debug, Clone, PartialEq)]
pub enum PgValue {
    Null,
    Bool(bool),
    Int2(i16),
    Int4(i32),
    Int8(i64),
    Numeric(Decimal),
    Float4(f32),
    Float8(f64),
    Text(String),
    /// Binary data (bytea)
    Bytes(Vec<u8>),
    Bits(BitString),
    Date(NaiveDate),
    Time(NaiveTime),
    TimeTz(NaiveTime, FixedOffset),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<FixedOffset>),
    Uuid(Uuid),
    Json(serde_json::Value),
    Array(PgArray<PgValue>),
    /// Composite row, columns in declaration order
    Record(Vec<PgValue>),
}

impl PgValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PgValue::Null)
    }

    /// Short name of the runtime type, used in mismatch errors.
    pub fn type_label(&self) -> &'static str {
        match self {
            PgValue::Null => "null",
            PgValue::Bool(_) => "bool",
            PgValue::Int2(_) => "int2",
            PgValue::Int4(_) => "int4",
            PgValue::Int8(_) => "int8",
            PgValue::Numeric(_) => "numeric",
            PgValue::Float4(_) => "float4",
            PgValue::Float8(_) => "float8",
            PgValue::Text(_) => "text",
            PgValue::Bytes(_) => "bytes",
            PgValue::Bits(_) => "bits",
            PgValue::Date(_) => "date",
            PgValue::Time(_) => "time",
            PgValue::TimeTz(..) => "timetz",
            PgValue::Timestamp(_) => "timestamp",
            PgValue::TimestampTz(_) => "timestamptz",
            PgValue::Uuid(_) => "uuid",
            PgValue::Json(_) => "json",
            PgValue::Array(_) => "array",
            PgValue::Record(_) => "record",
        }
    }

    /// The kind a value maps to when no target type is known.
    pub fn natural_kind(&self) -> SqlTypeKind {
        match self {
            PgValue::Null | PgValue::Array(_) => SqlTypeKind::Unknown,
            PgValue::Bool(_) => SqlTypeKind::Boolean,
            PgValue::Int2(_) => SqlTypeKind::SmallInt,
            PgValue::Int4(_) => SqlTypeKind::Integer,
            PgValue::Int8(_) => SqlTypeKind::BigInt,
            PgValue::Numeric(_) => SqlTypeKind::Numeric,
            PgValue::Float4(_) => SqlTypeKind::Real,
            PgValue::Float8(_) => SqlTypeKind::Double,
            PgValue::Text(_) => SqlTypeKind::Text,
            PgValue::Bytes(_) => SqlTypeKind::Bytea,
            PgValue::Bits(_) => SqlTypeKind::VarBit,
            PgValue::Date(_) => SqlTypeKind::Date,
            PgValue::Time(_) => SqlTypeKind::Time,
            PgValue::TimeTz(..) => SqlTypeKind::TimeTz,
            PgValue::Timestamp(_) => SqlTypeKind::Timestamp,
            PgValue::TimestampTz(_) => SqlTypeKind::TimestampTz,
            PgValue::Uuid(_) => SqlTypeKind::Uuid,
            PgValue::Json(_) => SqlTypeKind::Jsonb,
            PgValue::Record(_) => SqlTypeKind::Record,
        }
    }

    /// Append the backend's text output form (no SQL quoting).
    ///
    /// `Null` has no text form inside a scalar context and is rejected;
    /// arrays and records render their nulls themselves.
    pub fn write_text(&self, buf: &mut String) -> CodecResult<()> {
        match self {
            PgValue::Null => {
                return Err(CodecError::invalid("NULL has no text representation"));
            }
            PgValue::Bool(b) => buf.push(if *b { 't' } else { 'f' }),
            PgValue::Int2(n) => push_int(buf, *n as i64),
            PgValue::Int4(n) => push_int(buf, *n as i64),
            PgValue::Int8(n) => push_int(buf, *n),
            PgValue::Numeric(d) => buf.push_str(&d.to_string()),
            PgValue::Float4(f) => push_f32(buf, *f),
            PgValue::Float8(f) => push_f64(buf, *f),
            PgValue::Text(s) => buf.push_str(s),
            PgValue::Bytes(bytes) => push_hex(buf, bytes),
            PgValue::Bits(bits) => buf.push_str(&bits.to_string()),
            PgValue::Date(d) => temporal::format_date(buf, *d),
            PgValue::Time(t) => temporal::format_time(buf, *t),
            PgValue::TimeTz(t, off) => temporal::format_time_tz(buf, *t, *off),
            PgValue::Timestamp(ts) => temporal::format_timestamp(buf, *ts),
            PgValue::TimestampTz(ts) => temporal::format_timestamp_tz(buf, ts),
            PgValue::Uuid(u) => {
                let mut tmp = [0u8; 36];
                buf.push_str(u.hyphenated().encode_lower(&mut tmp));
            }
            PgValue::Json(json) => buf.push_str(&json.to_string()),
            PgValue::Array(arr) => {
                ArrayShape::of(arr)?;
                encode_array(buf, arr, |v, b| v.write_text(b))?
            }
            PgValue::Record(columns) => encode_record(
                buf,
                columns.iter().map(|c| if c.is_null() { None } else { Some(c) }),
                |v, b| v.write_text(b),
            )?,
        }
        Ok(())
    }

    pub fn to_text(&self) -> CodecResult<String> {
        let mut buf = String::new();
        self.write_text(&mut buf)?;
        Ok(buf)
    }

    /// Decode backend text output for `kind`.
    ///
    /// Kinds without a dedicated Rust representation (geometric, network,
    /// range, interval, xml and the character types) decode to `Text`.
    pub fn from_text(kind: SqlTypeKind, text: &str) -> CodecResult<PgValue> {
        let value = match kind {
            SqlTypeKind::Boolean => PgValue::Bool(parse_bool(text)?),
            SqlTypeKind::SmallInt => PgValue::Int2(parse_number(kind, text)?),
            SqlTypeKind::Integer => PgValue::Int4(parse_number(kind, text)?),
            SqlTypeKind::BigInt => PgValue::Int8(parse_number(kind, text)?),
            SqlTypeKind::Numeric => PgValue::Numeric(parse_decimal(text)?),
            SqlTypeKind::Real => PgValue::Float4(parse_number(kind, text)?),
            SqlTypeKind::Double => PgValue::Float8(parse_number(kind, text)?),
            SqlTypeKind::Date => PgValue::Date(temporal::parse_date(text)?),
            SqlTypeKind::Time => PgValue::Time(temporal::parse_time(text)?),
            SqlTypeKind::TimeTz => {
                let (t, off) = temporal::parse_time_tz(text)?;
                PgValue::TimeTz(t, off)
            }
            SqlTypeKind::Timestamp => PgValue::Timestamp(temporal::parse_timestamp(text)?),
            SqlTypeKind::TimestampTz => PgValue::TimestampTz(temporal::parse_timestamp_tz(text)?),
            SqlTypeKind::Uuid => PgValue::Uuid(
                Uuid::parse_str(text.trim())
                    .map_err(|e| CodecError::invalid(format!("invalid uuid '{}': {}", text, e)))?,
            ),
            SqlTypeKind::Json | SqlTypeKind::Jsonb => PgValue::Json(
                serde_json::from_str(text)
                    .map_err(|e| CodecError::invalid(format!("invalid json: {}", e)))?,
            ),
            SqlTypeKind::Bytea => PgValue::Bytes(parse_bytea(text)?),
            SqlTypeKind::Bit | SqlTypeKind::VarBit => PgValue::Bits(decode_bits(text)?),
            SqlTypeKind::Record => PgValue::Record(decode_record(text, &RecordType::Unlimited)?),
            SqlTypeKind::Interval
            | SqlTypeKind::Char
            | SqlTypeKind::Varchar
            | SqlTypeKind::Text
            | SqlTypeKind::Name
            | SqlTypeKind::Xml
            | SqlTypeKind::Inet
            | SqlTypeKind::Cidr
            | SqlTypeKind::MacAddr
            | SqlTypeKind::Point
            | SqlTypeKind::Line
            | SqlTypeKind::LineSegment
            | SqlTypeKind::Box
            | SqlTypeKind::Path
            | SqlTypeKind::Polygon
            | SqlTypeKind::Circle
            | SqlTypeKind::Int4Range
            | SqlTypeKind::Int8Range
            | SqlTypeKind::NumRange
            | SqlTypeKind::TsRange
            | SqlTypeKind::TstzRange
            | SqlTypeKind::DateRange
            | SqlTypeKind::Unknown => PgValue::Text(text.to_string()),
        };
        Ok(value)
    }

    /// JSON view for display and tooling.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as J;
        match self {
            PgValue::Null => J::Null,
            PgValue::Bool(b) => J::Bool(*b),
            PgValue::Int2(n) => J::from(*n),
            PgValue::Int4(n) => J::from(*n),
            PgValue::Int8(n) => J::from(*n),
            PgValue::Float4(f) => float_json(*f as f64, || self.to_text()),
            PgValue::Float8(f) => float_json(*f, || self.to_text()),
            PgValue::Json(json) => json.clone(),
            PgValue::Array(arr) => array_json(arr),
            PgValue::Record(columns) => J::Array(columns.iter().map(PgValue::to_json).collect()),
            other => other.to_text().map(J::String).unwrap_or(J::Null),
        }
    }
}

fn float_json(f: f64, text: impl FnOnce() -> CodecResult<String>) -> serde_json::Value {
    match serde_json::Number::from_f64(f) {
        Some(n) => serde_json::Value::Number(n),
        None => text().map(serde_json::Value::String).unwrap_or_default(),
    }
}

fn array_json(arr: &PgArray<PgValue>) -> serde_json::Value {
    serde_json::Value::Array(
        arr.iter()
            .map(|item| match item {
                ArrayItem::Null => serde_json::Value::Null,
                ArrayItem::Value(v) => v.to_json(),
                ArrayItem::Nested(sub) => array_json(sub),
            })
            .collect(),
    )
}

// ==================== Number Formatting ====================

pub(crate) fn push_int(buf: &mut String, n: i64) {
    let mut tmp = itoa::Buffer::new();
    buf.push_str(tmp.format(n));
}

pub(crate) fn push_f64(buf: &mut String, f: f64) {
    if f.is_nan() {
        buf.push_str("NaN");
    } else if f.is_infinite() {
        buf.push_str(if f > 0.0 { "Infinity" } else { "-Infinity" });
    } else {
        let mut tmp = ryu::Buffer::new();
        buf.push_str(tmp.format_finite(f));
    }
}

pub(crate) fn push_f32(buf: &mut String, f: f32) {
    if f.is_nan() {
        buf.push_str("NaN");
    } else if f.is_infinite() {
        buf.push_str(if f > 0.0 { "Infinity" } else { "-Infinity" });
    } else {
        let mut tmp = ryu::Buffer::new();
        buf.push_str(tmp.format_finite(f));
    }
}

/// `\x` followed by lowercase hex digits.
pub(crate) fn push_hex(buf: &mut String, bytes: &[u8]) {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    buf.reserve(2 + bytes.len() * 2);
    buf.push_str("\\x");
    for byte in bytes {
        buf.push(HEX[(byte >> 4) as usize] as char);
        buf.push(HEX[(byte & 0x0f) as usize] as char);
    }
}

// ==================== Text Parsing ====================

fn parse_bool(text: &str) -> CodecResult<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "on" | "1" => Ok(true),
        "f" | "false" | "n" | "no" | "off" | "0" => Ok(false),
        _ => Err(CodecError::invalid(format!(
            "invalid input syntax for type boolean: \"{}\"",
            text
        ))),
    }
}

fn parse_number<T>(kind: SqlTypeKind, text: &str) -> CodecResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    text.trim().parse().map_err(|e| {
        CodecError::invalid(format!(
            "invalid input syntax for type {}: \"{}\" ({})",
            kind, text, e
        ))
    })
}

fn parse_decimal(text: &str) -> CodecResult<Decimal> {
    let body = text.trim();
    body.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(body))
        .map_err(|e| {
            CodecError::invalid(format!(
                "invalid input syntax for type numeric: \"{}\" ({})",
                text, e
            ))
        })
}

/// Decode bytea text in either hex (`\x...`) or escape format.
pub fn parse_bytea(text: &str) -> CodecResult<Vec<u8>> {
    if let Some(hex) = text.strip_prefix("\\x") {
        let digits: Vec<u8> = hex.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
        if digits.len() % 2 != 0 {
            return Err(CodecError::invalid("invalid hexadecimal data: odd number of digits"));
        }
        return digits
            .chunks(2)
            .map(|pair| {
                let hi = (pair[0] as char).to_digit(16);
                let lo = (pair[1] as char).to_digit(16);
                match (hi, lo) {
                    (Some(hi), Some(lo)) => Ok((hi * 16 + lo) as u8),
                    _ => Err(CodecError::invalid(format!(
                        "invalid hexadecimal digit in \"{}\"",
                        text
                    ))),
                }
            })
            .collect();
    }

    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
        } else if bytes.get(i + 1) == Some(&b'\\') {
            out.push(b'\\');
            i += 2;
        } else if i + 3 < bytes.len()
            && bytes[i + 1..i + 4].iter().all(|b| (b'0'..=b'7').contains(b))
        {
            let value = bytes[i + 1..i + 4]
                .iter()
                .fold(0u32, |acc, b| acc * 8 + (b - b'0') as u32);
            if value > 0xff {
                return Err(CodecError::invalid("invalid input syntax for type bytea"));
            }
            out.push(value as u8);
            i += 4;
        } else {
            return Err(CodecError::invalid("invalid input syntax for type bytea"));
        }
    }
    Ok(out)
}

// ==================== Conversions ====================

impl From<bool> for PgValue {
    fn from(b: bool) -> Self {
        PgValue::Bool(b)
    }
}

impl From<i16> for PgValue {
    fn from(n: i16) -> Self {
        PgValue::Int2(n)
    }
}

impl From<i32> for PgValue {
    fn from(n: i32) -> Self {
        PgValue::Int4(n)
    }
}

impl From<i64> for PgValue {
    fn from(n: i64) -> Self {
        PgValue::Int8(n)
    }
}

impl From<f32> for PgValue {
    fn from(f: f32) -> Self {
        PgValue::Float4(f)
    }
}

impl From<f64> for PgValue {
    fn from(f: f64) -> Self {
        PgValue::Float8(f)
    }
}

impl From<Decimal> for PgValue {
    fn from(d: Decimal) -> Self {
        PgValue::Numeric(d)
    }
}

impl From<&str> for PgValue {
    fn from(s: &str) -> Self {
        PgValue::Text(s.to_string())
    }
}

impl From<String> for PgValue {
    fn from(s: String) -> Self {
        PgValue::Text(s)
    }
}

impl From<Vec<u8>> for PgValue {
    fn from(bytes: Vec<u8>) -> Self {
        PgValue::Bytes(bytes)
    }
}

impl From<BitString> for PgValue {
    fn from(bits: BitString) -> Self {
        PgValue::Bits(bits)
    }
}

impl From<NaiveDate> for PgValue {
    fn from(d: NaiveDate) -> Self {
        PgValue::Date(d)
    }
}

impl From<NaiveTime> for PgValue {
    fn from(t: NaiveTime) -> Self {
        PgValue::Time(t)
    }
}

impl From<NaiveDateTime> for PgValue {
    fn from(ts: NaiveDateTime) -> Self {
        PgValue::Timestamp(ts)
    }
}

impl From<DateTime<FixedOffset>> for PgValue {
    fn from(ts: DateTime<FixedOffset>) -> Self {
        PgValue::TimestampTz(ts)
    }
}

impl From<Uuid> for PgValue {
    fn from(u: Uuid) -> Self {
        PgValue::Uuid(u)
    }
}

impl From<serde_json::Value> for PgValue {
    fn from(json: serde_json::Value) -> Self {
        PgValue::Json(json)
    }
}

impl From<PgArray<PgValue>> for PgValue {
    fn from(arr: PgArray<PgValue>) -> Self {
        PgValue::Array(arr)
    }
}

impl<T: Into<PgValue>> From<Option<T>> for PgValue {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(PgValue::Null)
    }
}
