//! SQLite executor for tabula.
//!
//! Wraps an sqlx SQLite pool so it can back a [`tabula::Context`]:
//!
//! ```text
//! use tabula::Context;
//! use tabula_sqlite::SqlitePool;
//!
//! let ctx: Context<SqlitePool> = Context::open("sqlite://app.db?mode=rwc").await?;
//! let users: Vec<User> = ctx.execute("SELECT * FROM user", vec![]).all().await?;
//! ```
//!
//! Cells decode by declared column type (`BOOLEAN`, `INTEGER`, `REAL`,
//! `BLOB`, `DATETIME`, anything else as text). Columns without a declared
//! type, such as expressions, decode by the storage class of the value.

#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::unwrap_in_result)
)]

mod bind;
mod executor;

pub use bind::{bind_value, decode_rows};
pub use executor::{DEFAULT_DATABASE_URL, SqlitePool, SqliteTransaction};

// Re-export core types for convenience
pub use tabula::{
    ConnectionConfig, Context, QueryExecutor, StorageError, TransactionExecutor, Value,
};
