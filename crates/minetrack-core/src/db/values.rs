//! Conversions between Rust values and libSQL column values

use libsql::{Row, Value};

use crate::error::{Error, Result};

pub fn opt_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |text| Value::Text(text.to_string()))
}

pub fn opt_real(value: Option<f64>) -> Value {
    value.map_or(Value::Null, Value::Real)
}

pub fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

pub fn flag(value: bool) -> Value {
    Value::Integer(i64::from(value))
}

/// SQLite takes i64 for LIMIT/OFFSET; larger counts clamp to `i64::MAX`.
pub fn count(value: usize) -> Value {
    Value::Integer(i64::try_from(value).unwrap_or(i64::MAX))
}

pub fn column_opt_text(row: &Row, idx: i32) -> Result<Option<String>> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Text(text) => Ok(Some(text)),
        Value::Integer(number) => Ok(Some(number.to_string())),
        other => Err(unexpected(idx, &other)),
    }
}

pub fn column_text(row: &Row, idx: i32) -> Result<String> {
    column_opt_text(row, idx)?
        .ok_or_else(|| Error::Database(format!("column {idx} is unexpectedly NULL")))
}

#[allow(clippy::cast_precision_loss)]
pub fn column_opt_real(row: &Row, idx: i32) -> Result<Option<f64>> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Real(number) => Ok(Some(number)),
        Value::Integer(number) => Ok(Some(number as f64)),
        other => Err(unexpected(idx, &other)),
    }
}

pub fn column_i64(row: &Row, idx: i32) -> Result<i64> {
    match row.get_value(idx)? {
        Value::Integer(number) => Ok(number),
        other => Err(unexpected(idx, &other)),
    }
}

pub fn column_opt_i64(row: &Row, idx: i32) -> Result<Option<i64>> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Integer(number) => Ok(Some(number)),
        other => Err(unexpected(idx, &other)),
    }
}

pub fn column_flag(row: &Row, idx: i32) -> Result<bool> {
    Ok(column_i64(row, idx)? != 0)
}

/// Clamp a stored counter into `u64`.
pub fn column_u64(row: &Row, idx: i32) -> Result<u64> {
    Ok(u64::try_from(column_i64(row, idx)?).unwrap_or_default())
}

fn unexpected(idx: i32, value: &Value) -> Error {
    Error::Database(format!("unexpected value in column {idx}: {value:?}"))
}
