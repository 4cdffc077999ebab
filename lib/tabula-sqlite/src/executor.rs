//! SQLite implementation of QueryExecutor.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteArguments, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::ops::Deref;
use tabula::{
    ConnectionConfig, DEFAULT_MAX_CONNECTIONS, QueryExecutor, Rows, StorageError,
    TransactionExecutor, Value,
};

use crate::{bind_value, decode_rows};

/// Data source used when none is configured: `data.db` in the working
/// directory, created on first use.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data.db?mode=rwc";

/// Wrapper around sqlx::SqlitePool that implements QueryExecutor.
#[derive(Clone, Debug)]
pub struct SqlitePool(sqlx::SqlitePool);

impl SqlitePool {
    /// Create a new SqlitePool from an sqlx SqlitePool.
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self(pool)
    }

    /// Connect to the default database file.
    pub async fn connect_default() -> Result<Self, StorageError> {
        <Self as QueryExecutor>::connect(&ConnectionConfig::new(DEFAULT_DATABASE_URL)).await
    }

    /// Get the inner sqlx::SqlitePool.
    pub fn inner(&self) -> &sqlx::SqlitePool {
        &self.0
    }
}

impl Deref for SqlitePool {
    type Target = sqlx::SqlitePool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

fn arguments(args: &[Value]) -> Result<SqliteArguments<'static>, StorageError> {
    let mut arguments = SqliteArguments::default();
    for value in args {
        bind_value(&mut arguments, value)?;
    }
    Ok(arguments)
}

#[async_trait]
impl QueryExecutor for SqlitePool {
    type Transaction = SqliteTransaction;

    async fn connect(config: &ConnectionConfig) -> Result<Self, StorageError> {
        let max_connections = match config.max_connections {
            0 => DEFAULT_MAX_CONNECTIONS,
            n => n,
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;
        log::debug!("Connected to {}", config.url);
        Ok(Self(pool))
    }

    fn placeholder(_index: usize) -> String {
        "?".to_string()
    }

    async fn query(&self, sql: &str, args: &[Value]) -> Result<Rows, StorageError> {
        let rows = sqlx::query_with(sql, arguments(args)?)
            .fetch_all(&self.0)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;

        decode_rows(&rows)
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> Result<u64, StorageError> {
        let result = sqlx::query_with(sql, arguments(args)?)
            .execute(&self.0)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn begin_transaction(&self) -> Result<Self::Transaction, StorageError> {
        let tx = self
            .0
            .begin()
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(SqliteTransaction { tx })
    }

    async fn close(&self) {
        self.0.close().await
    }
}

/// SQLite transaction wrapper implementing TransactionExecutor.
pub struct SqliteTransaction {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl TransactionExecutor for SqliteTransaction {
    async fn query(&mut self, sql: &str, args: &[Value]) -> Result<Rows, StorageError> {
        let rows = sqlx::query_with(sql, arguments(args)?)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;

        decode_rows(&rows)
    }

    async fn execute(&mut self, sql: &str, args: &[Value]) -> Result<u64, StorageError> {
        let result = sqlx::query_with(sql, arguments(args)?)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn commit(self) -> Result<(), StorageError> {
        self.tx
            .commit()
            .await
            .map_err(|e| StorageError::Database(e.to_string()))
    }

    async fn rollback(self) -> Result<(), StorageError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| StorageError::Database(e.to_string()))
    }
}
