//! Model trait: the per-type field table records are mapped through.
//!
//! Types implementing `Model` describe their own fields, so result mapping and
//! the insert helper never need runtime reflection. Add `#[derive(Model)]` to
//! generate the implementation.

use crate::Value;
use crate::value::FieldKind;

/// Trait for record types that query results can be mapped onto.
///
/// # Example
///
/// ```text
/// #[derive(Debug, Default, Model)]
/// pub struct User {
///     pub id: i64,
///     #[column(name = "user_name")]
///     pub name: String,
///     pub active: bool,
///     pub created_at: DateTime<Utc>,
/// }
/// ```
///
/// # Column Naming
///
/// A field's column is its `#[column(name = "...")]` tag when present,
/// otherwise the field name lower-cased (`CreatedAt` -> `createdat`).
pub trait Model: Default + Send + Sync + 'static {
    /// The type's own name. The insert helper writes to its lower-cased form.
    const TYPE_NAME: &'static str;

    /// Field table in declaration order.
    const FIELDS: &'static [FieldDescriptor<Self>];
}

/// One entry in a model's field table.
pub struct FieldDescriptor<M> {
    /// Rust field name, without any raw identifier prefix.
    pub name: &'static str,
    /// Explicit column tag.
    pub tag: Option<&'static str>,
    pub kind: FieldKind,
    pub get: fn(&M) -> Value,
    /// Receives a cell already coerced to `kind`.
    pub set: fn(&mut M, Value),
}

impl<M> FieldDescriptor<M> {
    /// The column this field maps to.
    pub fn column(&self) -> String {
        match self.tag {
            Some(tag) if !tag.is_empty() => tag.to_string(),
            _ => self.name.to_lowercase(),
        }
    }
}

impl<M> std::fmt::Debug for FieldDescriptor<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("kind", &self.kind)
            .finish()
    }
}
