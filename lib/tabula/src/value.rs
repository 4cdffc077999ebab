//! Cell values and the field types they can be assigned to.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// A decoded result cell, or a value bound to a query parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    /// A null parameter that remembers the type of the field it came from,
    /// so backends with strict parameter typing can bind a typed null.
    #[serde(serialize_with = "serialize_null")]
    TypedNull(NullType),
    Text(String),
    Bytes(Vec<u8>),
    Int(i64),
    Float(f64),
    Bool(bool),
    Datetime(DateTime<Utc>),
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null | Value::TypedNull(_))
    }
}

fn serialize_null<S: Serializer>(_: &NullType, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_unit()
}

/// Storage type of a null parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullType {
    Text,
    Bytes,
    Int,
    Float,
    Bool,
    Datetime,
    Json,
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Text(s.clone())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::Datetime(dt)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Declared kind of a record field, used to pick a coercion rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Boolean,
    Time,
    /// Any other declared type. Never assigned from a result cell.
    Opaque,
}

/// Types that can back a model field.
///
/// `from_value` receives a cell that has already been coerced to the field's
/// kind, so implementations only unwrap the matching variant.
pub trait FieldValue: Sized {
    const KIND: FieldKind;

    /// Type of the null bound for an absent value of this field.
    const NULL: NullType;

    fn from_value(value: Value) -> Option<Self>;

    fn to_value(&self) -> Value;
}

impl FieldValue for String {
    const KIND: FieldKind = FieldKind::Text;
    const NULL: NullType = NullType::Text;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

macro_rules! integer_field {
    ($($ty:ty),*) => {
        $(
            impl FieldValue for $ty {
                const KIND: FieldKind = FieldKind::Integer;
                const NULL: NullType = NullType::Int;

                fn from_value(value: Value) -> Option<Self> {
                    match value {
                        Value::Int(n) => Some(n as $ty),
                        _ => None,
                    }
                }

                /// Values outside the `i64` range are passed as decimal text
                /// rather than wrapped.
                fn to_value(&self) -> Value {
                    i64::try_from(*self)
                        .map(Value::Int)
                        .unwrap_or_else(|_| Value::Text(self.to_string()))
                }
            }
        )*
    };
}

integer_field!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl FieldValue for bool {
    const KIND: FieldKind = FieldKind::Boolean;
    const NULL: NullType = NullType::Bool;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FieldValue for DateTime<Utc> {
    const KIND: FieldKind = FieldKind::Time;
    const NULL: NullType = NullType::Datetime;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Datetime(dt) => Some(dt),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        Value::Datetime(*self)
    }
}

impl FieldValue for f64 {
    const KIND: FieldKind = FieldKind::Opaque;
    const NULL: NullType = NullType::Float;

    fn from_value(_: Value) -> Option<Self> {
        None
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl FieldValue for f32 {
    const KIND: FieldKind = FieldKind::Opaque;
    const NULL: NullType = NullType::Float;

    fn from_value(_: Value) -> Option<Self> {
        None
    }

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }
}

impl FieldValue for Vec<u8> {
    const KIND: FieldKind = FieldKind::Opaque;
    const NULL: NullType = NullType::Bytes;

    fn from_value(_: Value) -> Option<Self> {
        None
    }

    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl FieldValue for serde_json::Value {
    const KIND: FieldKind = FieldKind::Opaque;
    const NULL: NullType = NullType::Json;

    fn from_value(_: Value) -> Option<Self> {
        None
    }

    fn to_value(&self) -> Value {
        Value::Json(self.clone())
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    const KIND: FieldKind = T::KIND;
    const NULL: NullType = T::NULL;

    fn from_value(value: Value) -> Option<Self> {
        T::from_value(value).map(Some)
    }

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::TypedNull(T::NULL),
        }
    }
}
