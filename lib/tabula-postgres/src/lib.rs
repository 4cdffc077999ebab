//! PostgreSQL executor for tabula.
//!
//! ```text
//! use tabula::{ConnectionConfig, Context};
//! use tabula_postgres::PgPool;
//!
//! let config = ConnectionConfig::from_env("DATABASE_URL")?;
//! let ctx: Context<PgPool> = Context::open(config).await?;
//! ```
//!
//! Statements use numbered placeholders (`$1`, `$2`, ...), including the
//! INSERT built by `Tx::save`.

#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::unwrap_in_result)
)]

mod bind;
mod executor;

pub use bind::{bind_value, decode_rows};
pub use executor::{PgPool, PgTransaction};

// Re-export core types for convenience
pub use tabula::{
    ConnectionConfig, Context, QueryExecutor, StorageError, TransactionExecutor, Value,
};
