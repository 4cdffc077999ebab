//! Tabula - Map SQL result rows onto record shapes and run reversible migrations.
//!
//! This crate is the storage-agnostic core. Backends implement
//! [`QueryExecutor`] and [`TransactionExecutor`]; everything else is shared.
//!
//! # Core Concepts
//!
//! - **Model**: a record struct with a derived [`Model`] impl describing its
//!   fields and the column each one maps to.
//! - **Signature**: the column-to-field lookup built once per model type and
//!   cached on the [`Context`].
//! - **Target**: where mapped rows go. A single record, a `Vec` of records, an
//!   `Option`, a [`Mapping`] of column names or a positional [`Sequence`].
//!
//! # Modules
//!
//! - [`Context`]: owns an executor and the signature cache
//! - [`Query`]: one statement, mapped into a target
//! - [`Tx`]: transactional scope with an insert helper
//! - [`migrate`]: ordered upgrade/downgrade steps with a persisted marker

#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::unwrap_in_result)
)]

// Lets the derive macro's `::tabula::` paths resolve inside this crate.
extern crate self as tabula;

mod context;
mod error;
mod executor;
pub mod mapper;
pub mod migrate;
mod model;
mod query;
mod signature;
mod tx;
mod value;

#[cfg(test)]
mod testing;

use std::pin::Pin;

pub use context::Context;
pub use error::StorageError;
pub use executor::{
    ConnectionConfig, DEFAULT_MAX_CONNECTIONS, QueryExecutor, Rows, TransactionExecutor,
};
pub use mapper::{Mapping, ScannedRow, Sequence, Shape, ShapeKind, Target, coerce};
pub use model::{FieldDescriptor, Model};
pub use query::Query;
pub use signature::{FieldSignature, ModelSignature, SignatureCache};
pub use tx::{InsertStatement, Tx, insert_statement};
pub use value::{FieldKind, FieldValue, NullType, Value};

/// A boxed, sendable future borrowing for `'a`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// Re-export derive macro
pub use tabula_derive::Model;
