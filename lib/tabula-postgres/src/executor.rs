//! PostgreSQL implementation of QueryExecutor.

use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::ops::Deref;
use tabula::{
    ConnectionConfig, DEFAULT_MAX_CONNECTIONS, QueryExecutor, Rows, StorageError,
    TransactionExecutor, Value,
};

use crate::{bind_value, decode_rows};

/// Wrapper around sqlx::PgPool that implements QueryExecutor.
#[derive(Clone, Debug)]
pub struct PgPool(sqlx::PgPool);

impl PgPool {
    /// Create a new PgPool from an sqlx PgPool.
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self(pool)
    }

    /// Get the inner sqlx::PgPool.
    pub fn inner(&self) -> &sqlx::PgPool {
        &self.0
    }
}

impl Deref for PgPool {
    type Target = sqlx::PgPool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

fn arguments(args: &[Value]) -> Result<PgArguments, StorageError> {
    let mut arguments = PgArguments::default();
    for value in args {
        bind_value(&mut arguments, value)?;
    }
    Ok(arguments)
}

#[async_trait]
impl QueryExecutor for PgPool {
    type Transaction = PgTransaction;

    async fn connect(config: &ConnectionConfig) -> Result<Self, StorageError> {
        let max_connections = match config.max_connections {
            0 => DEFAULT_MAX_CONNECTIONS,
            n => n,
        };
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;
        log::debug!("Connected to PostgreSQL ({} connections max)", max_connections);
        Ok(Self(pool))
    }

    fn placeholder(index: usize) -> String {
        format!("${}", index)
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
        Ok(PgTransaction { tx })
    }

    async fn close(&self) {
        self.0.close().await
    }
}

/// PostgreSQL transaction wrapper implementing TransactionExecutor.
pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl TransactionExecutor for PgTransaction {
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
