//! Checks generated literals against a running PostgreSQL.
//!
//! ```bash
//! PGTEXT_DATABASE_URL=postgres://localhost/postgres cargo test --test live_postgres -- --ignored
//! ```

use chrono::NaiveDate;
use pgtext::prelude::*;
use pretty_assertions::assert_eq;
use sqlx::postgres::{PgPool, PgPoolOptions};

async fn connect() -> Option<PgPool> {
    let Ok(url) = std::env::var("PGTEXT_DATABASE_URL") else {
        eprintln!("PGTEXT_DATABASE_URL not set, skipping");
        return None;
    };
    Some(
        PgPoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await
            .expect("failed to connect"),
    )
}

/// Evaluate `expr` and return its text output.
async fn as_text(pool: &PgPool, expr: &str) -> Option<String> {
    sqlx::query_scalar::<_, Option<String>>(&format!("SELECT ({})::text", expr))
        .fetch_one(pool)
        .await
        .unwrap_or_else(|e| panic!("{} failed: {}", expr, e))
}

#[tokio::test]
#[ignore]
async fn test_string_literals() {
    let Some(pool) = connect().await else { return };
    for s in ["plain", "it's", "C:\\tmp", "line\nbreak\ttab", "日本'語"] {
        let literal = encode_literal(SqlTypeKind::Text, &PgValue::from(s), true).unwrap();
        assert_eq!(as_text(&pool, &literal).await.as_deref(), Some(s), "{}", literal);
    }
}

#[tokio::test]
#[ignore]
async fn test_scalar_literals() {
    let Some(pool) = connect().await else { return };
    let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
    let cases = [
        (SqlTypeKind::Boolean, PgValue::Bool(true), "true"),
        (SqlTypeKind::BigInt, PgValue::Int8(-9_000_000_000), "-9000000000"),
        (SqlTypeKind::Double, PgValue::Float8(f64::NEG_INFINITY), "-Infinity"),
        (SqlTypeKind::Date, PgValue::Date(date), "2024-02-29"),
        (SqlTypeKind::Bytea, PgValue::Bytes(vec![0, 255]), "\\x00ff"),
        (SqlTypeKind::VarBit, PgValue::Bits("1010".parse().unwrap()), "1010"),
        (SqlTypeKind::Jsonb, PgValue::from(r#"{"a": "it's"}"#), r#"{"a": "it's"}"#),
    ];
    for (kind, value, expected) in cases {
        let literal = encode_literal(kind, &value, true).unwrap();
        assert_eq!(as_text(&pool, &literal).await.as_deref(), Some(expected), "{}", literal);
    }
    assert_eq!(as_text(&pool, "NULL").await, None);
}

#[tokio::test]
#[ignore]
async fn test_array_literals() {
    let Some(pool) = connect().await else { return };
    let array = PgArray::nested([
        PgArray::from_values([PgValue::from("a b"), PgValue::from("NULL")]),
        PgArray::from_options(vec![None, Some(PgValue::from("q\"\\"))]),
    ]);
    let mut literal = String::new();
    encode_array_literal(&mut literal, SqlTypeKind::Text, &array, true).unwrap();

    let text = as_text(&pool, &literal).await.unwrap();
    let back = decode_array(&text, 2, |s| Ok(PgValue::from(s))).unwrap();
    assert_eq!(back, array);
}

#[tokio::test]
#[ignore]
async fn test_decorated_arrays() {
    let Some(pool) = connect().await else { return };
    let text = as_text(&pool, "'[0:1]={5,6}'::int4[]").await.unwrap();
    assert_eq!(text, "[0:1]={5,6}");

    let (array, shape) = decode_array_with_shape(&text, 1, |s| {
        PgValue::from_text(SqlTypeKind::Integer, s)
    })
    .unwrap();
    assert_eq!(shape.dims(), &[Dimension::new(0, 2)]);

    let codec = Codec::new(CodecConfig::builder().type_cast(true).build());
    let literal = codec.encode_array(SqlTypeKind::Integer, &array, Some(&shape)).unwrap();
    assert_eq!(as_text(&pool, &literal).await.as_deref(), Some("[0:1]={5,6}"));
}

#[tokio::test]
#[ignore]
async fn test_record_text() {
    let Some(pool) = connect().await else { return };
    let text = as_text(&pool, "ROW(1, 'a,b', NULL, 'say \"hi\"')").await.unwrap();
    let values = decode_record(
        &text,
        &RecordType::Columns(vec![
            SqlTypeKind::Integer,
            SqlTypeKind::Text,
            SqlTypeKind::Text,
            SqlTypeKind::Text,
        ]),
    )
    .unwrap();
    assert_eq!(
        values,
        vec![
            PgValue::Int4(1),
            PgValue::from("a,b"),
            PgValue::Null,
            PgValue::from("say \"hi\""),
        ]
    );
}
