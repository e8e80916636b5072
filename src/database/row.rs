//! Conversion between sqlx rows/arguments and `serde_json` values.
//!
//! Rows come back as JSON maps so that arbitrary tables (and arbitrary ad-hoc
//! SQL) can be returned without compile-time types.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow, PgValueFormat};
use sqlx::types::BigDecimal;
use sqlx::{Column, Decode, Postgres, Row as _, Type, TypeInfo, ValueRef};
use uuid::Uuid;

use super::executor::Row;

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

/// Convert a driver row into a column-ordered JSON map
pub fn row_to_json(row: &PgRow) -> Row {
    let mut map = Row::new();
    for (i, column) in row.columns().iter().enumerate() {
        let value = column_to_json(row, i, column.type_info().name());
        map.insert(column.name().to_string(), value);
    }
    map
}

fn column_to_json(row: &PgRow, i: usize, type_name: &str) -> Value {
    match type_name {
        "BOOL" => decode::<bool>(row, i, Value::Bool),
        "INT2" => decode::<i16>(row, i, |v| Value::from(v)),
        "INT4" => decode::<i32>(row, i, |v| Value::from(v)),
        "INT8" => decode::<i64>(row, i, |v| Value::from(v)),
        "FLOAT4" => decode::<f32>(row, i, |v| float(v as f64)),
        "FLOAT8" => decode::<f64>(row, i, float),
        // Arbitrary precision; strings avoid silently rounding through f64
        "NUMERIC" => numeric(row, i),
        "JSON" | "JSONB" => decode::<Value>(row, i, |v| v),
        "UUID" => decode::<Uuid>(row, i, |v| Value::String(v.to_string())),
        "TIMESTAMPTZ" => decode::<DateTime<Utc>>(row, i, |v| Value::String(v.to_rfc3339())),
        "TIMESTAMP" => decode::<NaiveDateTime>(row, i, |v| {
            Value::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
        }),
        "DATE" => decode::<NaiveDate>(row, i, |v| Value::String(v.to_string())),
        "TIME" => decode::<NaiveTime>(row, i, |v| Value::String(v.to_string())),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => decode::<String>(row, i, Value::String),
        "TEXT[]" | "VARCHAR[]" => decode::<Vec<String>>(row, i, |v| Value::from(v)),
        "INT4[]" => decode::<Vec<i32>>(row, i, |v| Value::from(v)),
        "INT8[]" => decode::<Vec<i64>>(row, i, |v| Value::from(v)),
        "BOOL[]" => decode::<Vec<bool>>(row, i, |v| Value::from(v)),
        "UUID[]" => decode::<Vec<Uuid>>(row, i, |v| {
            Value::Array(v.into_iter().map(|u| Value::String(u.to_string())).collect())
        }),
        // Enums, domains and anything else: fall back to the textual form
        _ => match row.try_get_unchecked::<Option<String>, _>(i) {
            Ok(Some(s)) => Value::String(s),
            _ => Value::Null,
        },
    }
}

fn decode<'r, T>(row: &'r PgRow, i: usize, into: impl FnOnce(T) -> Value) -> Value
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    match row.try_get::<Option<T>, _>(i) {
        Ok(Some(v)) => into(v),
        Ok(None) => Value::Null,
        Err(e) => {
            tracing::warn!("Failed to decode column {}: {}", i, e);
            Value::Null
        }
    }
}

/// NUMERIC as a string carrying the stored display scale (`3.50`, not `3.5`)
fn numeric(row: &PgRow, i: usize) -> Value {
    let raw = match row.try_get_raw(i) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!("Failed to decode column {}: {}", i, e);
            return Value::Null;
        }
    };

    // Simple-protocol results are already the server's own rendering
    if matches!(raw.format(), PgValueFormat::Text) {
        return raw
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .unwrap_or(Value::Null);
    }

    match raw.as_bytes().ok().and_then(numeric_header) {
        Some(NumericHeader::Special(s)) => Value::String(s.to_string()),
        Some(NumericHeader::Scale(scale)) => decode::<BigDecimal>(row, i, |v| scaled(&v, scale)),
        None => decode::<BigDecimal>(row, i, |v| Value::String(v.to_string())),
    }
}

#[derive(Debug, PartialEq)]
enum NumericHeader {
    Special(&'static str),
    Scale(u16),
}

/// Binary NUMERIC header: ndigits, weight, sign, dscale (all 16-bit big endian)
fn numeric_header(bytes: &[u8]) -> Option<NumericHeader> {
    let word = |at: usize| Some(u16::from_be_bytes([*bytes.get(at)?, *bytes.get(at + 1)?]));
    let sign = word(4)?;
    let dscale = word(6)?;
    Some(match sign {
        0xC000 => NumericHeader::Special("NaN"),
        0xD000 => NumericHeader::Special("Infinity"),
        0xF000 => NumericHeader::Special("-Infinity"),
        _ => NumericHeader::Scale(dscale),
    })
}

fn scaled(v: &BigDecimal, scale: u16) -> Value {
    Value::String(v.with_scale(i64::from(scale)).to_string())
}

fn float(f: f64) -> Value {
    serde_json::Number::from_f64(f)
        .map(Value::Number)
        // NaN and infinities have no JSON number form
        .unwrap_or_else(|| Value::String(f.to_string()))
}

/// Bind one JSON value as a positional parameter
pub fn bind_param<'q>(q: PgQuery<'q>, v: &Value) -> PgQuery<'q> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(u) = n.as_u64() {
                // Postgres has no unsigned 64-bit type
                q.bind(u as i64)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.clone()),
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()), // JSONB
    }
}
