//! Result mapper: populates records, mappings and sequences from rows.
//!
//! Every target is one of three shapes, picked once per call from the
//! target's type:
//!
//! - **Record**: a `Model`; columns are matched against its signature and
//!   cells coerced to the field's kind.
//! - **Mapping**: `HashMap<String, Value>`; one entry per column.
//! - **Sequence**: [`Sequence`]; cells appended in column order.
//!
//! Null cells are skipped for every shape.

use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::signature::{ModelSignature, SignatureCache};
use crate::value::FieldKind;
use crate::{Model, Rows, StorageError, Value};

/// Column name -> raw cell, for mapping-shaped targets.
pub type Mapping = HashMap<String, Value>;

/// Raw cells in column order, for sequence-shaped targets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sequence(pub Vec<Value>);

impl Deref for Sequence {
    type Target = Vec<Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Sequence {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Sequence> for Vec<Value> {
    fn from(sequence: Sequence) -> Self {
        sequence.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Record,
    Mapping,
    Sequence,
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeKind::Record => write!(f, "record"),
            ShapeKind::Mapping => write!(f, "mapping"),
            ShapeKind::Sequence => write!(f, "sequence"),
        }
    }
}

/// Coerce a cell into a field of `kind`.
///
/// Returns `None` when the cell is null or its kind is not accepted, in which
/// case the field is left untouched.
pub fn coerce(kind: FieldKind, cell: Value) -> Option<Value> {
    match (kind, cell) {
        (_, Value::Null | Value::TypedNull(_)) => None,
        (FieldKind::Text, Value::Text(s)) => Some(Value::Text(s)),
        (FieldKind::Text, Value::Bytes(b)) => {
            Some(Value::Text(String::from_utf8_lossy(&b).into_owned()))
        }
        (FieldKind::Integer, Value::Int(n)) => Some(Value::Int(n)),
        (FieldKind::Boolean, Value::Bool(b)) => Some(Value::Bool(b)),
        (FieldKind::Time, Value::Datetime(dt)) => Some(Value::Datetime(dt)),
        _ => None,
    }
}

/// One scanned row, handed to a shape to populate itself from.
pub struct ScannedRow<'a> {
    columns: &'a [String],
    cells: Vec<Value>,
    signature: Option<&'a ModelSignature>,
}

impl<'a> ScannedRow<'a> {
    pub fn new(
        columns: &'a [String],
        cells: Vec<Value>,
        signature: Option<&'a ModelSignature>,
    ) -> Self {
        Self {
            columns,
            cells,
            signature,
        }
    }

    /// Non-null cells paired with their column names.
    pub fn cells(self) -> impl Iterator<Item = (&'a str, Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.cells)
            .filter(|(_, cell)| !cell.is_null())
    }

    /// Assign matching columns onto `record`'s fields.
    ///
    /// Columns without a field are ignored.
    pub fn populate<M: Model>(self, record: &mut M) {
        let Some(signature) = self.signature else {
            log::warn!("No signature available to populate {}", M::TYPE_NAME);
            return;
        };

        for (column, cell) in self.cells() {
            let Some(field) = signature.field(column) else {
                continue;
            };
            let Some(descriptor) = M::FIELDS.get(field.index) else {
                continue;
            };
            if let Some(value) = coerce(field.kind, cell) {
                (descriptor.set)(record, value);
            }
        }
    }
}

/// A type one result row can be scanned into.
///
/// `#[derive(Model)]` implements this for records; mappings, sequences and
/// boxed shapes are covered here.
pub trait Shape: Sized + Send {
    const KIND: ShapeKind;

    /// A fresh, zero-valued instance for collection targets.
    fn blank() -> Self;

    /// The record signature, for record shapes.
    fn signature(_signatures: &SignatureCache) -> Option<Arc<ModelSignature>> {
        None
    }

    fn scan(&mut self, row: ScannedRow<'_>);
}

impl Shape for Mapping {
    const KIND: ShapeKind = ShapeKind::Mapping;

    fn blank() -> Self {
        HashMap::new()
    }

    fn scan(&mut self, row: ScannedRow<'_>) {
        for (column, cell) in row.cells() {
            self.insert(column.to_string(), cell);
        }
    }
}

impl Shape for Sequence {
    const KIND: ShapeKind = ShapeKind::Sequence;

    fn blank() -> Self {
        Sequence::default()
    }

    fn scan(&mut self, row: ScannedRow<'_>) {
        self.0.extend(row.cells().map(|(_, cell)| cell));
    }
}

impl<T: Shape> Shape for Box<T> {
    const KIND: ShapeKind = T::KIND;

    fn blank() -> Self {
        Box::new(T::blank())
    }

    fn signature(signatures: &SignatureCache) -> Option<Arc<ModelSignature>> {
        T::signature(signatures)
    }

    fn scan(&mut self, row: ScannedRow<'_>) {
        (**self).scan(row)
    }
}

/// Something a query can populate: a single shape, an optional shape, or a
/// collection of shapes.
pub trait Target: Send {
    fn load(&mut self, rows: Rows, signatures: &SignatureCache) -> Result<(), StorageError>;
}

impl Target for Mapping {
    fn load(&mut self, rows: Rows, signatures: &SignatureCache) -> Result<(), StorageError> {
        fill_one(self, rows, signatures)
    }
}

impl Target for Sequence {
    fn load(&mut self, rows: Rows, signatures: &SignatureCache) -> Result<(), StorageError> {
        fill_one(self, rows, signatures)
    }
}

impl<T: Shape> Target for Vec<T> {
    fn load(&mut self, rows: Rows, signatures: &SignatureCache) -> Result<(), StorageError> {
        fill_all(self, rows, signatures)
    }
}

impl<T: Shape> Target for Option<T> {
    fn load(&mut self, rows: Rows, signatures: &SignatureCache) -> Result<(), StorageError> {
        fill_optional(self, rows, signatures)
    }
}

/// Populate `target` in place from the first row.
///
/// Fields the row leaves untouched (nulls, unmatched columns) keep their
/// current values.
pub fn fill_one<T: Shape>(
    target: &mut T,
    rows: Rows,
    signatures: &SignatureCache,
) -> Result<(), StorageError> {
    let signature = T::signature(signatures);
    let (columns, mut rows) = rows.into_parts();
    let cells = rows
        .pop_front()
        .ok_or_else(|| StorageError::NotFound(format!("no rows for {} target", T::KIND)))?;
    target.scan(ScannedRow::new(&columns, cells, signature.as_deref()));
    Ok(())
}

/// Append one fresh element per row.
pub fn fill_all<T: Shape>(
    target: &mut Vec<T>,
    rows: Rows,
    signatures: &SignatureCache,
) -> Result<(), StorageError> {
    let signature = T::signature(signatures);
    let (columns, rows) = rows.into_parts();
    target.reserve(rows.len());
    for cells in rows {
        let mut item = T::blank();
        item.scan(ScannedRow::new(&columns, cells, signature.as_deref()));
        target.push(item);
    }
    Ok(())
}

/// Like [`fill_one`], but zero rows leave `None` instead of failing.
pub fn fill_optional<T: Shape>(
    target: &mut Option<T>,
    rows: Rows,
    signatures: &SignatureCache,
) -> Result<(), StorageError> {
    if rows.is_empty() {
        *target = None;
        return Ok(());
    }
    let mut item = T::blank();
    fill_one(&mut item, rows, signatures)?;
    *target = Some(item);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Model;
    use chrono::{DateTime, TimeZone, Utc};

    #[derive(Debug, Default, Clone, PartialEq, Model)]
    struct Person {
        id: i64,
        name: String,
        #[column(name = "is_admin")]
        admin: bool,
        joined: DateTime<Utc>,
        score: f64,
        nick: Option<String>,
        small: i8,
    }

    fn joined() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap()
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn person_rows(rows: Vec<Vec<Value>>) -> Rows {
        Rows::new(
            columns(&["id", "name", "is_admin", "joined", "score", "extra"]),
            rows,
        )
    }

    #[test]
    fn coercion_table() {
        assert_eq!(
            coerce(FieldKind::Text, Value::Bytes(b"abc".to_vec())),
            Some(Value::Text("abc".into()))
        );
        assert_eq!(coerce(FieldKind::Text, Value::Int(1)), None);
        assert_eq!(coerce(FieldKind::Integer, Value::Int(9)), Some(Value::Int(9)));
        assert_eq!(coerce(FieldKind::Integer, Value::Float(9.0)), None);
        assert_eq!(coerce(FieldKind::Boolean, Value::Int(1)), None);
        assert_eq!(
            coerce(FieldKind::Time, Value::Text("2021-03-04".into())),
            None
        );
        assert_eq!(
            coerce(FieldKind::Time, Value::Datetime(joined())),
            Some(Value::Datetime(joined()))
        );
        assert_eq!(coerce(FieldKind::Opaque, Value::Float(1.0)), None);
        assert_eq!(coerce(FieldKind::Text, Value::Null), None);
        assert_eq!(
            coerce(FieldKind::Integer, Value::TypedNull(crate::NullType::Int)),
            None
        );
    }

    #[test]
    fn record_fields_are_coerced_and_unmatched_columns_dropped() {
        let signatures = SignatureCache::new();
        let mut person = Person::default();
        let rows = person_rows(vec![vec![
            Value::Int(7),
            Value::Bytes(b"ann".to_vec()),
            Value::Bool(true),
            Value::Datetime(joined()),
            Value::Float(1.5),
            Value::Text("ignored".into()),
        ]]);

        fill_one(&mut person, rows, &signatures).unwrap();

        assert_eq!(
            person,
            Person {
                id: 7,
                name: "ann".into(),
                admin: true,
                joined: joined(),
                ..Person::default()
            }
        );
    }

    #[test]
    fn mismatched_kinds_leave_fields_untouched() {
        let signatures = SignatureCache::new();
        let mut person = Person::default();
        let rows = person_rows(vec![vec![
            Value::Text("7".into()),
            Value::Int(3),
            Value::Int(1),
            Value::Text("2021-03-04T05:06:07Z".into()),
            Value::Float(1.5),
            Value::Null,
        ]]);

        fill_one(&mut person, rows, &signatures).unwrap();

        assert_eq!(person, Person::default());
    }

    #[test]
    fn null_cells_keep_prior_values() {
        let signatures = SignatureCache::new();
        let mut person = Person {
            id: 1,
            name: "keep".into(),
            admin: true,
            nick: Some("nick".into()),
            ..Person::default()
        };
        let rows = Rows::new(
            columns(&["id", "name", "is_admin", "nick"]),
            vec![vec![Value::Int(2), Value::Null, Value::Null, Value::Null]],
        );

        fill_one(&mut person, rows, &signatures).unwrap();

        assert_eq!(person.id, 2);
        assert_eq!(person.name, "keep");
        assert!(person.admin);
        assert_eq!(person.nick.as_deref(), Some("nick"));
    }

    #[test]
    fn integers_narrow_to_field_width() {
        let signatures = SignatureCache::new();
        let mut person = Person::default();
        let rows = Rows::new(columns(&["small"]), vec![vec![Value::Int(300)]]);

        fill_one(&mut person, rows, &signatures).unwrap();

        assert_eq!(person.small, 300_i64 as i8);
    }

    #[test]
    fn single_target_without_rows_is_not_found() {
        let signatures = SignatureCache::new();
        let mut person = Person::default();

        let err = fill_one(&mut person, person_rows(vec![]), &signatures).unwrap_err();

        assert!(err.is_not_found());
    }

    #[test]
    fn collection_without_rows_is_empty() {
        let signatures = SignatureCache::new();
        let mut people: Vec<Person> = Vec::new();

        people.load(person_rows(vec![]), &signatures).unwrap();

        assert!(people.is_empty());
    }

    #[test]
    fn collections_hold_values_or_boxes() {
        let signatures = SignatureCache::new();
        let rows = || {
            Rows::new(
                columns(&["id", "name"]),
                vec![
                    vec![Value::Int(1), Value::Text("a".into())],
                    vec![Value::Int(2), Value::Null],
                ],
            )
        };

        let mut people: Vec<Person> = Vec::new();
        people.load(rows(), &signatures).unwrap();
        let mut boxed: Vec<Box<Person>> = Vec::new();
        boxed.load(rows(), &signatures).unwrap();

        assert_eq!(people.len(), 2);
        assert_eq!(people[1].id, 2);
        assert_eq!(people[1].name, "");
        assert_eq!(*boxed[0], people[0]);
        assert_eq!(signatures.len(), 1);
    }

    #[test]
    fn mappings_take_raw_cells_by_column() {
        let signatures = SignatureCache::new();
        let rows = Rows::new(
            columns(&["a", "b", "c"]),
            vec![vec![
                Value::Int(1),
                Value::Null,
                Value::Bytes(b"raw".to_vec()),
            ]],
        );
        let mut mapping = Mapping::new();

        mapping.load(rows, &signatures).unwrap();

        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping["a"], Value::Int(1));
        assert_eq!(mapping["c"], Value::Bytes(b"raw".to_vec()));
        assert!(signatures.is_empty());
    }

    #[test]
    fn sequences_keep_column_order() {
        let signatures = SignatureCache::new();
        let rows = Rows::new(
            columns(&["z", "a"]),
            vec![
                vec![Value::Text("first".into()), Value::Bool(false)],
                vec![Value::Text("second".into()), Value::Bool(true)],
            ],
        );
        let mut sequences: Vec<Sequence> = Vec::new();

        sequences.load(rows, &signatures).unwrap();

        assert_eq!(
            sequences,
            vec![
                Sequence(vec![Value::Text("first".into()), Value::Bool(false)]),
                Sequence(vec![Value::Text("second".into()), Value::Bool(true)]),
            ]
        );
    }

    #[test]
    fn optional_targets_absorb_empty_results() {
        let signatures = SignatureCache::new();
        let mut found: Option<Person> = Some(Person::default());

        found.load(person_rows(vec![]), &signatures).unwrap();
        assert!(found.is_none());

        let rows = Rows::new(columns(&["id"]), vec![vec![Value::Int(5)]]);
        found.load(rows, &signatures).unwrap();
        assert_eq!(found.map(|p| p.id), Some(5));
    }
}
