//! Render values as SQL literals for embedding in generated statements.
//!
//! Typed casts are written as a leading type name (`json '{}'`,
//! `TIMESTAMP '...'`), never as a trailing `::type`. Arrays are the one
//! exception: `int4[] '{...}'` is not valid syntax, so they use
//! `CAST('{...}' AS int4[])`.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::array::{encode_array_shaped, ArrayShape, BoundsPolicy, PgArray};
use crate::bits::encode_bits;
use crate::error::{CodecError, CodecResult};
use crate::escape::quote_literal;
use crate::record::{encode_record, RecordType};
use crate::types::{SqlType, SqlTypeKind, TypeCategory};
use crate::value::{push_f32, push_f64, push_hex, push_int, PgValue};

/// Whether `value` may be rendered as `kind`. NULL fits every kind.
pub fn accepts(kind: SqlTypeKind, value: &PgValue) -> bool {
    use PgValue as V;
    use SqlTypeKind as K;
    match (kind, value) {
        (_, V::Null) | (K::Unknown, _) => true,
        (K::Boolean, V::Bool(_)) => true,
        (K::SmallInt, V::Int2(_)) => true,
        (K::Integer, V::Int2(_) | V::Int4(_)) => true,
        (K::BigInt, V::Int2(_) | V::Int4(_) | V::Int8(_)) => true,
        (K::Numeric, V::Numeric(_) | V::Int2(_) | V::Int4(_) | V::Int8(_)) => true,
        (K::Real, V::Float4(_)) => true,
        (K::Double, V::Float4(_) | V::Float8(_)) => true,
        (K::Date, V::Date(_)) => true,
        (K::Time, V::Time(_)) => true,
        (K::TimeTz, V::TimeTz(..)) => true,
        (K::Timestamp, V::Timestamp(_)) => true,
        (K::TimestampTz, V::TimestampTz(_)) => true,
        (K::Json | K::Jsonb, V::Json(_) | V::Text(_)) => true,
        (K::Uuid, V::Uuid(_)) => true,
        (K::Record, V::Record(_) | V::Text(_)) => true,
        (K::Bytea, V::Bytes(_)) => true,
        (K::Bit | K::VarBit, V::Bits(_)) => true,
        (K::Uuid, _) => false,
        (k, V::Text(_)) => k.category() == TypeCategory::Quoted,
        _ => false,
    }
}

/// [`accepts`] as a `TypeMismatch` error.
pub fn check_value(kind: SqlTypeKind, value: &PgValue) -> CodecResult<()> {
    if accepts(kind, value) {
        Ok(())
    } else {
        Err(CodecError::TypeMismatch {
            kind: kind.name(),
            found: value.type_label(),
        })
    }
}

/// Render `value` as a SQL literal of `kind`.
///
/// ```
/// use pgtext::{encode_literal, PgValue, SqlTypeKind};
///
/// let sql = encode_literal(SqlTypeKind::Text, &PgValue::from("it's"), false).unwrap();
/// assert_eq!(sql, "'it''s'");
/// ```
pub fn encode_literal(kind: SqlTypeKind, value: &PgValue, cast: bool) -> CodecResult<String> {
    let mut buf = String::new();
    encode_literal_into(&mut buf, kind, value, cast)?;
    Ok(buf)
}

/// Append the literal to `buf`. On error `buf` is left as it was.
pub fn encode_literal_into(
    buf: &mut String,
    kind: SqlTypeKind,
    value: &PgValue,
    cast: bool,
) -> CodecResult<()> {
    let start = buf.len();
    let result = write_literal(buf, kind, value, cast);
    if result.is_err() {
        buf.truncate(start);
    }
    result
}

fn write_literal(
    buf: &mut String,
    kind: SqlTypeKind,
    value: &PgValue,
    cast: bool,
) -> CodecResult<()> {
    if value.is_null() {
        buf.push_str("NULL");
        return Ok(());
    }
    let kind = match kind {
        SqlTypeKind::Unknown => value.natural_kind(),
        other => other,
    };
    // arrays only pass for `unknown`; typed arrays go through encode_array_literal
    check_value(kind, value)?;

    match value {
        PgValue::Null => buf.push_str("NULL"),
        PgValue::Bool(b) => buf.push_str(if *b { "true" } else { "false" }),
        PgValue::Int2(n) => push_int(buf, *n as i64),
        PgValue::Int4(n) => push_int(buf, *n as i64),
        PgValue::Int8(n) => push_int(buf, *n),
        PgValue::Numeric(d) => buf.push_str(&d.to_string()),
        PgValue::Float4(f) if f.is_finite() => push_f32(buf, *f),
        PgValue::Float8(f) if f.is_finite() => push_f64(buf, *f),
        PgValue::Float4(_) | PgValue::Float8(_) => {
            if cast {
                buf.push_str(kind.name());
                buf.push(' ');
            }
            buf.push('\'');
            value.write_text(buf)?;
            buf.push('\'');
        }
        PgValue::Date(_)
        | PgValue::Time(_)
        | PgValue::TimeTz(..)
        | PgValue::Timestamp(_)
        | PgValue::TimestampTz(_) => {
            if let (true, Some(keyword)) = (cast, kind.temporal_keyword()) {
                buf.push_str(keyword);
                buf.push(' ');
            }
            buf.push('\'');
            value.write_text(buf)?;
            buf.push('\'');
        }
        PgValue::Bytes(bytes) => {
            if cast {
                buf.push_str("bytea ");
            }
            buf.push('\'');
            push_hex(buf, bytes);
            buf.push('\'');
        }
        PgValue::Bits(bits) => encode_bits(buf, bits),
        PgValue::Array(array) => {
            encode_array_literal(buf, SqlTypeKind::Unknown, array, cast)?;
        }
        PgValue::Record(_) => quote_literal(buf, &value.to_text()?),
        PgValue::Text(_) | PgValue::Json(_) | PgValue::Uuid(_) => {
            // records are never prefixed
            if cast && kind != SqlTypeKind::Record {
                buf.push_str(kind.name());
                buf.push(' ');
            }
            match value {
                PgValue::Text(s) => quote_literal(buf, s),
                other => quote_literal(buf, &other.to_text()?),
            }
        }
    }
    Ok(())
}

/// Render `value` for a declared type, enforcing its bounds.
///
/// Fails with `Range` when a numeric has more integer digits than
/// `precision - scale` allows once rounded to `scale`, a character value
/// is longer than its declared length, a `bit(n)` value is not exactly
/// `n` bits, or a `varbit(n)` value exceeds `n` bits.
pub fn encode_typed_literal(
    buf: &mut String,
    ty: &SqlType,
    value: &PgValue,
    cast: bool,
) -> CodecResult<()> {
    check_value(ty.kind(), value)?;
    check_bounds(ty, value)?;
    encode_literal_into(buf, ty.kind(), value, cast)
}

fn check_bounds(ty: &SqlType, value: &PgValue) -> CodecResult<()> {
    match (ty.kind(), value) {
        (SqlTypeKind::Numeric, _) => {
            let (Some(precision), Some(scale)) = (ty.precision(), ty.scale()) else {
                return Ok(());
            };
            let decimal = match value {
                PgValue::Numeric(d) => *d,
                PgValue::Int2(n) => Decimal::from(*n),
                PgValue::Int4(n) => Decimal::from(*n),
                PgValue::Int8(n) => Decimal::from(*n),
                _ => return Ok(()),
            };
            check_numeric(decimal, precision, scale, ty)
        }
        (SqlTypeKind::Char | SqlTypeKind::Varchar, PgValue::Text(s)) => match ty.length() {
            Some(n) if s.trim_end_matches(' ').chars().count() > n as usize => Err(
                CodecError::range(format!("value too long for type {}", ty.ddl())),
            ),
            _ => Ok(()),
        },
        (SqlTypeKind::Bit, PgValue::Bits(bits)) => match ty.length() {
            Some(n) if bits.len() != n as usize => Err(CodecError::range(format!(
                "bit string length {} does not match type {}",
                bits.len(),
                ty.ddl()
            ))),
            _ => Ok(()),
        },
        (SqlTypeKind::VarBit, PgValue::Bits(bits)) => match ty.length() {
            Some(n) if bits.len() > n as usize => Err(CodecError::range(format!(
                "bit string too long for type {}",
                ty.ddl()
            ))),
            _ => Ok(()),
        },
        _ => Ok(()),
    }
}

fn check_numeric(value: Decimal, precision: u32, scale: u32, ty: &SqlType) -> CodecResult<()> {
    let rounded = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    let allowed = precision as i64 - scale as i64;
    let fits = if allowed >= 0 {
        integer_digits(rounded) as i64 <= allowed
    } else {
        // every digit must sit at least `-allowed` places after the point
        match Decimal::try_new(1, (-allowed) as u32) {
            Ok(limit) => rounded.abs() < limit,
            Err(_) => rounded.is_zero(),
        }
    };
    if fits {
        Ok(())
    } else {
        Err(CodecError::range(format!(
            "numeric field overflow: {} does not fit {}",
            value,
            ty.ddl()
        )))
    }
}

fn integer_digits(value: Decimal) -> usize {
    let whole = value.abs().trunc();
    if whole.is_zero() {
        0
    } else {
        whole.to_string().len()
    }
}

// ==================== Compound Literals ====================

/// Render an array as a quoted literal, `'{1,2}'`.
///
/// With `cast` the literal becomes `CAST('{1,2}' AS int4[])`; element kinds
/// `unknown` and `record` are never cast. Each element is checked against
/// `elem_kind`.
pub fn encode_array_literal(
    buf: &mut String,
    elem_kind: SqlTypeKind,
    array: &PgArray<PgValue>,
    cast: bool,
) -> CodecResult<()> {
    encode_array_literal_shaped(buf, elem_kind, array, None, BoundsPolicy::NonDefault, cast)
}

/// [`encode_array_literal`] with explicit bounds and decoration policy.
pub fn encode_array_literal_shaped(
    buf: &mut String,
    elem_kind: SqlTypeKind,
    array: &PgArray<PgValue>,
    shape: Option<&ArrayShape>,
    policy: BoundsPolicy,
    cast: bool,
) -> CodecResult<()> {
    let mut text = String::new();
    encode_array_shaped(&mut text, array, shape, policy, |value, out| {
        check_value(elem_kind, value)?;
        value.write_text(out)
    })?;

    let with_cast = cast && !matches!(elem_kind, SqlTypeKind::Unknown | SqlTypeKind::Record);
    if with_cast {
        buf.push_str("CAST(");
    }
    quote_literal(buf, &text);
    if with_cast {
        buf.push_str(" AS ");
        buf.push_str(elem_kind.name());
        buf.push_str("[])");
    }
    Ok(())
}

/// Render a row as a quoted record literal, `'(1,"a b")'`.
pub fn encode_record_literal(
    buf: &mut String,
    record_type: &RecordType,
    columns: &[PgValue],
) -> CodecResult<()> {
    if let Some(expected) = record_type.column_count() {
        if expected != columns.len() {
            return Err(CodecError::ColumnCount {
                expected,
                found: columns.len(),
            });
        }
    }
    for (i, column) in columns.iter().enumerate() {
        check_value(record_type.column_kind(i), column)?;
    }

    let mut text = String::new();
    encode_record(
        &mut text,
        columns.iter().map(|c| if c.is_null() { None } else { Some(c) }),
        |value, out| value.write_text(out),
    )?;
    quote_literal(buf, &text);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::BitString;
    use chrono::{FixedOffset, NaiveDate, NaiveTime, TimeZone};
    use pretty_assertions::assert_eq;

    fn lit(kind: SqlTypeKind, value: impl Into<PgValue>, cast: bool) -> String {
        encode_literal(kind, &value.into(), cast).unwrap()
    }

    #[test]
    fn test_scalars() {
        assert_eq!(lit(SqlTypeKind::Boolean, true, false), "true");
        assert_eq!(lit(SqlTypeKind::Boolean, false, true), "false");
        assert_eq!(lit(SqlTypeKind::BigInt, -7i32, false), "-7");
        assert_eq!(lit(SqlTypeKind::Double, 0.25f64, true), "0.25");
        assert_eq!(lit(SqlTypeKind::Real, 0.1f32, false), "0.1");
    }

    #[test]
    fn test_numeric_is_plain() {
        let d = Decimal::from_scientific("1.25e-8").unwrap();
        assert_eq!(lit(SqlTypeKind::Numeric, d, false), "0.0000000125");
        assert_eq!(lit(SqlTypeKind::Numeric, 12i64, false), "12");
    }

    #[test]
    fn test_non_finite_floats_are_quoted() {
        assert_eq!(lit(SqlTypeKind::Double, f64::NAN, false), "'NaN'");
        assert_eq!(lit(SqlTypeKind::Double, f64::INFINITY, true), "float8 'Infinity'");
        assert_eq!(lit(SqlTypeKind::Real, f32::NEG_INFINITY, false), "'-Infinity'");
    }

    #[test]
    fn test_null_for_every_kind() {
        for kind in SqlTypeKind::ALL {
            assert_eq!(encode_literal(kind, &PgValue::Null, true).unwrap(), "NULL");
        }
    }

    #[test]
    fn test_temporal() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(lit(SqlTypeKind::Date, d, true), "DATE '2024-03-09'");
        assert_eq!(lit(SqlTypeKind::Date, d, false), "'2024-03-09'");

        let ts = d.and_hms_micro_opt(1, 2, 3, 4).unwrap();
        assert_eq!(
            lit(SqlTypeKind::Timestamp, ts, true),
            "TIMESTAMP '2024-03-09 01:02:03.000004'"
        );

        let offset = FixedOffset::west_opt(3 * 3600).unwrap();
        let tz = offset.with_ymd_and_hms(2024, 3, 9, 1, 2, 3).unwrap();
        assert_eq!(
            lit(SqlTypeKind::TimestampTz, tz, true),
            "TIMESTAMPTZ '2024-03-09 01:02:03.000000-03:00'"
        );

        let t = PgValue::TimeTz(NaiveTime::from_hms_opt(4, 5, 6).unwrap(), offset);
        assert_eq!(
            encode_literal(SqlTypeKind::TimeTz, &t, true).unwrap(),
            "TIMETZ '04:05:06.000000-03:00'"
        );

        let bc = NaiveDate::from_ymd_opt(-99, 1, 1).unwrap();
        assert_eq!(lit(SqlTypeKind::Date, bc, false), "'0100-01-01 BC'");
    }

    #[test]
    fn test_quoted_kinds_prefix_type_name() {
        assert_eq!(lit(SqlTypeKind::Text, "a'b", false), "'a''b'");
        assert_eq!(lit(SqlTypeKind::Xml, "<a/>", true), "xml '<a/>'");
        assert_eq!(lit(SqlTypeKind::Point, "(1,2)", true), "point '(1,2)'");
        assert_eq!(lit(SqlTypeKind::Interval, "1 day", true), "interval '1 day'");
        assert_eq!(lit(SqlTypeKind::Text, "tab\there", true), "text E'tab\\there'");
        assert_eq!(
            lit(SqlTypeKind::Jsonb, serde_json::json!({"k": "it's"}), true),
            r#"jsonb '{"k":"it''s"}'"#
        );
        let id = uuid::Uuid::nil();
        assert_eq!(
            lit(SqlTypeKind::Uuid, id, true),
            "uuid '00000000-0000-0000-0000-000000000000'"
        );
    }

    #[test]
    fn test_record_never_prefixed() {
        let rec = PgValue::Record(vec![PgValue::Int4(1), PgValue::from("a b"), PgValue::Null]);
        assert_eq!(
            encode_literal(SqlTypeKind::Record, &rec, true).unwrap(),
            r#"'(1,"a b",)'"#
        );
        assert_eq!(lit(SqlTypeKind::Record, "(1,2)", true), "'(1,2)'");
    }

    #[test]
    fn test_bytea_and_bits() {
        assert_eq!(lit(SqlTypeKind::Bytea, vec![0x01u8, 0xab], false), "'\\x01ab'");
        assert_eq!(lit(SqlTypeKind::Bytea, Vec::<u8>::new(), true), "bytea '\\x'");
        let bits: BitString = "1001".parse().unwrap();
        assert_eq!(lit(SqlTypeKind::VarBit, bits, true), "B'1001'");
    }

    #[test]
    fn test_unknown_uses_natural_kind() {
        assert_eq!(lit(SqlTypeKind::Unknown, 5i16, true), "5");
        assert_eq!(lit(SqlTypeKind::Unknown, "x", true), "text 'x'");
        let d = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        assert_eq!(lit(SqlTypeKind::Unknown, d, true), "DATE '2000-01-01'");
        let arr = PgArray::from_options(vec![Some(PgValue::Int4(1)), None]);
        assert_eq!(lit(SqlTypeKind::Unknown, arr, true), "'{1,NULL}'");
    }

    #[test]
    fn test_type_mismatch_writes_nothing() {
        let mut buf = String::from("VALUES (");
        let err =
            encode_literal_into(&mut buf, SqlTypeKind::Integer, &PgValue::from("1"), false)
                .unwrap_err();
        assert!(matches!(
            err,
            CodecError::TypeMismatch {
                kind: "int4",
                found: "text"
            }
        ));
        assert_eq!(buf, "VALUES (");

        assert!(encode_literal(SqlTypeKind::SmallInt, &PgValue::Int4(1), false).is_err());
        assert!(encode_literal(SqlTypeKind::Uuid, &PgValue::from("x"), false).is_err());
        let arr = PgValue::Array(PgArray::new());
        assert!(encode_literal(SqlTypeKind::Text, &arr, false).is_err());
    }

    #[test]
    fn test_typed_numeric_bounds() {
        let ty = SqlType::numeric(5, 2).unwrap();
        let mut buf = String::new();
        let ok = Decimal::from_scientific("999.994").unwrap();
        encode_typed_literal(&mut buf, &ty, &PgValue::Numeric(ok), false).unwrap();
        assert_eq!(buf, "999.994");

        // rounds up to 1000.00
        let over = Decimal::from_scientific("999.995").unwrap();
        assert!(matches!(
            encode_typed_literal(&mut String::new(), &ty, &PgValue::Numeric(over), false),
            Err(CodecError::Range(_))
        ));
        assert!(encode_typed_literal(&mut String::new(), &ty, &PgValue::Int4(1000), false).is_err());
        assert!(encode_typed_literal(&mut String::new(), &ty, &PgValue::Int4(-999), false).is_ok());

        let tiny = SqlType::numeric(2, 3).unwrap();
        let small = Decimal::from_scientific("0.012").unwrap();
        assert!(encode_typed_literal(&mut String::new(), &tiny, &PgValue::Numeric(small), false).is_ok());
        let big = Decimal::from_scientific("0.1").unwrap();
        assert!(encode_typed_literal(&mut String::new(), &tiny, &PgValue::Numeric(big), false).is_err());
    }

    #[test]
    fn test_typed_length_bounds() {
        let ty = SqlType::with_length(SqlTypeKind::Varchar, 3).unwrap();
        let mut buf = String::new();
        encode_typed_literal(&mut buf, &ty, &PgValue::from("abc   "), true).unwrap();
        assert_eq!(buf, "varchar 'abc   '");
        assert!(matches!(
            encode_typed_literal(&mut String::new(), &ty, &PgValue::from("abcd"), false),
            Err(CodecError::Range(_))
        ));

        let bit4 = SqlType::with_length(SqlTypeKind::Bit, 4).unwrap();
        let three: BitString = "101".parse().unwrap();
        assert!(encode_typed_literal(&mut String::new(), &bit4, &PgValue::Bits(three.clone()), false).is_err());
        let varbit4 = SqlType::with_length(SqlTypeKind::VarBit, 4).unwrap();
        assert!(encode_typed_literal(&mut String::new(), &varbit4, &PgValue::Bits(three), false).is_ok());
    }

    #[test]
    fn test_array_literals() {
        let arr = PgArray::nested([
            PgArray::from_values([PgValue::Int4(1), PgValue::Int4(2)]),
            PgArray::from_options(vec![None, Some(PgValue::Int4(4))]),
        ]);
        let mut buf = String::new();
        encode_array_literal(&mut buf, SqlTypeKind::Integer, &arr, false).unwrap();
        assert_eq!(buf, "'{{1,2},{NULL,4}}'");

        let mut buf = String::new();
        encode_array_literal(&mut buf, SqlTypeKind::Integer, &arr, true).unwrap();
        assert_eq!(buf, "CAST('{{1,2},{NULL,4}}' AS int4[])");

        let words = PgArray::from_values([PgValue::from("it's"), PgValue::from("a\\b")]);
        let mut buf = String::new();
        encode_array_literal(&mut buf, SqlTypeKind::Text, &words, false).unwrap();
        assert_eq!(buf, r#"E'{it''s,"a\\\\b"}'"#);

        let bad = PgArray::from_values([PgValue::from("x")]);
        assert!(matches!(
            encode_array_literal(&mut String::new(), SqlTypeKind::Integer, &bad, false),
            Err(CodecError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_array_literal_with_bounds() {
        let arr = PgArray::from_values([PgValue::Int4(5), PgValue::Int4(6)]);
        let shape = ArrayShape::new(vec![crate::array::Dimension::new(0, 2)]).unwrap();
        let mut buf = String::new();
        encode_array_literal_shaped(
            &mut buf,
            SqlTypeKind::Integer,
            &arr,
            Some(&shape),
            BoundsPolicy::NonDefault,
            false,
        )
        .unwrap();
        assert_eq!(buf, "'[0:1]={5,6}'");
    }

    #[test]
    fn test_record_literal() {
        let layout = RecordType::Columns(vec![SqlTypeKind::Integer, SqlTypeKind::Text]);
        let mut buf = String::new();
        encode_record_literal(&mut buf, &layout, &[PgValue::Int4(7), PgValue::from("x,y")])
            .unwrap();
        assert_eq!(buf, r#"'(7,"x,y")'"#);

        assert!(matches!(
            encode_record_literal(&mut String::new(), &layout, &[PgValue::Int4(7)]),
            Err(CodecError::ColumnCount {
                expected: 2,
                found: 1
            })
        ));
        assert!(matches!(
            encode_record_literal(&mut String::new(), &layout, &[PgValue::from("7"), PgValue::Null]),
            Err(CodecError::TypeMismatch { .. })
        ));
    }
}
