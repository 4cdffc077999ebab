//! Value binding and row decoding for SQLite.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Arguments, Column, Row, TypeInfo, ValueRef};
use tabula::{Rows, StorageError, Value};

/// Bind a Value to SqliteArguments.
///
/// JSON values are stored as their text form.
pub fn bind_value(args: &mut SqliteArguments<'static>, value: &Value) -> Result<(), StorageError> {
    match value {
        Value::Null | Value::TypedNull(_) => args.add(None::<String>),
        Value::Text(s) => args.add(s.clone()),
        Value::Bytes(b) => args.add(b.clone()),
        Value::Int(n) => args.add(*n),
        Value::Float(n) => args.add(*n),
        Value::Bool(b) => args.add(*b),
        Value::Datetime(dt) => args.add(*dt),
        Value::Json(v) => args.add(v.to_string()),
    }
    .map_err(|e| StorageError::Database(e.to_string()))
}

/// Decode fetched rows into a result cursor.
pub fn decode_rows(rows: &[SqliteRow]) -> Result<Rows, StorageError> {
    let columns: Vec<String> = rows
        .first()
        .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();

    let mut decoded = Vec::with_capacity(rows.len());
    for row in rows {
        let mut cells = Vec::with_capacity(columns.len());
        for idx in 0..row.columns().len() {
            cells.push(decode_cell(row, idx)?);
        }
        decoded.push(cells);
    }

    Ok(Rows::new(columns, decoded))
}

/// Extract one cell as a Value
///
/// The value's storage class decides the cell kind. The declared column type
/// only refines it: `BOOLEAN` integers become booleans and `DATETIME` values
/// that parse become datetimes.
fn decode_cell(row: &SqliteRow, idx: usize) -> Result<Value, StorageError> {
    let raw = row
        .try_get_raw(idx)
        .map_err(|e| StorageError::Database(e.to_string()))?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let storage = raw.type_info().name().to_string();

    match (row.column(idx).type_info().name(), storage.as_str()) {
        ("BOOLEAN", "INTEGER") => return Ok(Value::Bool(get(row, idx)?)),
        ("DATETIME", _) => {
            if let Ok(dt) = get::<DateTime<Utc>>(row, idx) {
                return Ok(Value::Datetime(dt));
            }
        }
        _ => {}
    }

    let value = match storage.as_str() {
        "INTEGER" => Value::Int(get(row, idx)?),
        "REAL" => Value::Float(get(row, idx)?),
        "BLOB" => Value::Bytes(get(row, idx)?),
        _ => Value::Text(get(row, idx)?),
    };

    Ok(value)
}

fn get<T>(row: &SqliteRow, idx: usize) -> Result<T, StorageError>
where
    T: for<'r> sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get_unchecked(idx)
        .map_err(|e| StorageError::Database(e.to_string()))
}
