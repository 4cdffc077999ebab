//! Database-agnostic executor boundary.
//!
//! Backends (SQLite, PostgreSQL, ...) implement these traits over their
//! connection pools; everything above this module only sees rows of `Value`s.

use async_trait::async_trait;

use crate::{StorageError, Value};

/// Default pool size for backends that pool connections.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 16;

/// Connection configuration for database backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Backend-specific data source URL (`sqlite://data.db`, `postgres://...`).
    pub url: String,
    pub max_connections: u32,
}

impl ConnectionConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Read the data source URL from an environment variable.
    pub fn from_env(var: &str) -> Result<Self, StorageError> {
        std::env::var(var)
            .map(Self::new)
            .map_err(|e| StorageError::Config(format!("{}: {}", var, e)))
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }
}

impl From<&str> for ConnectionConfig {
    fn from(url: &str) -> Self {
        ConnectionConfig::new(url)
    }
}

impl From<String> for ConnectionConfig {
    fn from(url: String) -> Self {
        ConnectionConfig::new(url)
    }
}

impl From<&String> for ConnectionConfig {
    fn from(url: &String) -> Self {
        ConnectionConfig::new(url.clone())
    }
}

/// Result cursor: ordered column names plus decoded rows.
///
/// A cursor is owned by the call that opened it and dropped before that call
/// returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rows {
    columns: Vec<String>,
    rows: std::collections::VecDeque<Vec<Value>>,
}

impl Rows {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows: rows.into(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, std::collections::VecDeque<Vec<Value>>) {
        (self.columns, self.rows)
    }
}

impl Iterator for Rows {
    type Item = Vec<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.pop_front()
    }
}

/// Trait for executing statements against a database backend.
///
/// Implemented by database-specific pool types (e.g., SqlitePool, PgPool).
#[async_trait]
pub trait QueryExecutor: Send + Sync + Sized {
    /// The transaction type for this executor.
    type Transaction: TransactionExecutor;

    /// Open a connection pool.
    async fn connect(config: &ConnectionConfig) -> Result<Self, StorageError>;

    /// Positional placeholder for the 1-based parameter `index`.
    fn placeholder(index: usize) -> String;

    /// Run a statement and return its rows.
    async fn query(&self, sql: &str, args: &[Value]) -> Result<Rows, StorageError>;

    /// Run a statement and return the number of rows affected.
    async fn execute(&self, sql: &str, args: &[Value]) -> Result<u64, StorageError>;

    /// Begin a transaction. The returned executor can be used for statements within the transaction.
    async fn begin_transaction(&self) -> Result<Self::Transaction, StorageError>;

    /// Release every connection held by this executor.
    async fn close(&self);
}

/// Trait for executing statements within a transaction.
#[async_trait]
pub trait TransactionExecutor: Send + Sync {
    /// Run a statement within the transaction and return its rows.
    async fn query(&mut self, sql: &str, args: &[Value]) -> Result<Rows, StorageError>;

    /// Run a statement within the transaction and return the number of rows affected.
    async fn execute(&mut self, sql: &str, args: &[Value]) -> Result<u64, StorageError>;

    /// Commit the transaction.
    async fn commit(self) -> Result<(), StorageError>;

    /// Rollback the transaction.
    async fn rollback(self) -> Result<(), StorageError>;
}
