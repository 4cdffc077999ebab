//! Value binding and row decoding for PostgreSQL.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgArguments, PgRow, PgTypeInfo};
use sqlx::types::{BigDecimal, Uuid};
use sqlx::{Arguments, Column, Encode, Postgres, Row, Type, TypeInfo, ValueRef};
use tabula::{NullType, Rows, StorageError, Value};

/// Bind a Value to PgArguments.
///
/// PostgreSQL types every parameter, so a null carrying its field type is
/// bound as a null of that type. An untyped null is bound as `TEXT`.
pub fn bind_value(args: &mut PgArguments, value: &Value) -> Result<(), StorageError> {
    match value {
        Value::Null => args.add(None::<String>),
        Value::TypedNull(kind) => bind_null(args, *kind).map(|_| ()),
        Value::Text(s) => args.add(s.clone()),
        Value::Bytes(b) => args.add(b.clone()),
        Value::Int(n) => args.add(*n),
        Value::Float(n) => args.add(*n),
        Value::Bool(b) => args.add(*b),
        Value::Datetime(dt) => args.add(*dt),
        // Store complex types as JSONB
        Value::Json(v) => args.add(v.clone()),
    }
    .map_err(|e| StorageError::Database(e.to_string()))
}

/// Bind a null of the given type, returning the parameter type used.
fn bind_null(args: &mut PgArguments, kind: NullType) -> Result<PgTypeInfo, BoxDynError> {
    match kind {
        NullType::Text => typed_null::<String>(args),
        NullType::Bytes => typed_null::<Vec<u8>>(args),
        NullType::Int => typed_null::<i64>(args),
        NullType::Float => typed_null::<f64>(args),
        NullType::Bool => typed_null::<bool>(args),
        NullType::Datetime => typed_null::<DateTime<Utc>>(args),
        NullType::Json => typed_null::<serde_json::Value>(args),
    }
}

fn typed_null<T>(args: &mut PgArguments) -> Result<PgTypeInfo, BoxDynError>
where
    T: for<'q> Encode<'q, Postgres> + Type<Postgres> + 'static,
{
    args.add(None::<T>)?;
    Ok(T::type_info())
}

/// Decode fetched rows into a result cursor.
pub fn decode_rows(rows: &[PgRow]) -> Result<Rows, StorageError> {
    let columns: Vec<String> = rows
        .first()
        .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();

    let mut decoded = Vec::with_capacity(rows.len());
    for row in rows {
        let mut cells = Vec::with_capacity(columns.len());
        for idx in 0..row.columns().len() {
            cells.push(extract_column_value(row, idx)?);
        }
        decoded.push(cells);
    }

    Ok(Rows::new(columns, decoded))
}

/// How a column's values are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decoder {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Bytes,
    Timestamptz,
    Timestamp,
    Date,
    Time,
    Json,
    Numeric,
    Uuid,
    Text,
    /// Raw wire bytes, for types with no closer cell kind.
    Raw,
}

fn decoder_for(type_name: &str) -> Decoder {
    match type_name {
        "BOOL" => Decoder::Bool,
        "INT2" => Decoder::Int2,
        "INT4" => Decoder::Int4,
        "INT8" => Decoder::Int8,
        "FLOAT4" => Decoder::Float4,
        "FLOAT8" => Decoder::Float8,
        "BYTEA" => Decoder::Bytes,
        "TIMESTAMPTZ" => Decoder::Timestamptz,
        "TIMESTAMP" => Decoder::Timestamp,
        "DATE" => Decoder::Date,
        "TIME" => Decoder::Time,
        "JSONB" | "JSON" => Decoder::Json,
        "NUMERIC" => Decoder::Numeric,
        "UUID" => Decoder::Uuid,
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "\"CHAR\"" | "UNKNOWN" => Decoder::Text,
        _ => Decoder::Raw,
    }
}

/// Extract a column value from a row
fn extract_column_value(row: &PgRow, idx: usize) -> Result<Value, StorageError> {
    let value = match decoder_for(row.column(idx).type_info().name()) {
        Decoder::Bool => get::<bool>(row, idx)?.map(Value::Bool),
        Decoder::Int2 => get::<i16>(row, idx)?.map(|n| Value::Int(n.into())),
        Decoder::Int4 => get::<i32>(row, idx)?.map(|n| Value::Int(n.into())),
        Decoder::Int8 => get::<i64>(row, idx)?.map(Value::Int),
        Decoder::Float4 => get::<f32>(row, idx)?.map(|n| Value::Float(n.into())),
        Decoder::Float8 => get::<f64>(row, idx)?.map(Value::Float),
        Decoder::Bytes => get::<Vec<u8>>(row, idx)?.map(Value::Bytes),
        Decoder::Timestamptz => get::<DateTime<Utc>>(row, idx)?.map(Value::Datetime),
        Decoder::Timestamp => {
            get::<NaiveDateTime>(row, idx)?.map(|dt| Value::Datetime(dt.and_utc()))
        }
        Decoder::Date => get::<NaiveDate>(row, idx)?
            .map(|d| Value::Datetime(d.and_time(NaiveTime::MIN).and_utc())),
        Decoder::Time => get::<NaiveTime>(row, idx)?.map(|t| Value::Text(t.to_string())),
        Decoder::Json => get::<serde_json::Value>(row, idx)?.map(Value::Json),
        Decoder::Numeric => get::<BigDecimal>(row, idx)?.map(|n| Value::Text(n.to_string())),
        Decoder::Uuid => get::<Uuid>(row, idx)?.map(|u| Value::Text(u.to_string())),
        Decoder::Text => get::<String>(row, idx)?.map(Value::Text),
        Decoder::Raw => raw_bytes(row, idx),
    };

    Ok(value.unwrap_or(Value::Null))
}

/// The undecoded bytes of a cell; `None` when null or unreadable.
fn raw_bytes(row: &PgRow, idx: usize) -> Option<Value> {
    let raw = row.try_get_raw(idx).ok()?;
    if raw.is_null() {
        return None;
    }
    match raw.as_bytes() {
        Ok(bytes) => Some(Value::Bytes(bytes.to_vec())),
        Err(e) => {
            log::debug!("Column {} has no readable bytes: {}", idx, e);
            None
        }
    }
}

fn get<T>(row: &PgRow, idx: usize) -> Result<Option<T>, StorageError>
where
    T: for<'r> sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(idx)
        .map_err(|e| StorageError::Database(e.to_string()))
}
