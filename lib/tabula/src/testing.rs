//! In-memory executor for unit tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    ConnectionConfig, QueryExecutor, Rows, StorageError, TransactionExecutor, Value,
};

#[derive(Debug, Default)]
struct Shared {
    journal: Vec<String>,
    rows: VecDeque<Rows>,
}

/// Records every statement it is given and answers queries from a queue of
/// canned results (empty results once the queue runs dry).
#[derive(Debug, Default, Clone)]
pub(crate) struct FakeExecutor {
    shared: Arc<Mutex<Shared>>,
    fail_on: Option<&'static str>,
}

impl FakeExecutor {
    pub(crate) fn with_rows(self, rows: Rows) -> Self {
        self.shared.lock().rows.push_back(rows);
        self
    }

    /// Fail any statement containing `pattern`; `"BEGIN"` fails transaction start.
    pub(crate) fn failing_on(mut self, pattern: &'static str) -> Self {
        self.fail_on = Some(pattern);
        self
    }

    pub(crate) fn journal(&self) -> Vec<String> {
        self.shared.lock().journal.clone()
    }

    fn run(&self, sql: &str, args: &[Value]) -> Result<Rows, StorageError> {
        if let Some(pattern) = self.fail_on {
            if sql.contains(pattern) {
                return Err(StorageError::Database(format!("{} failed", sql)));
            }
        }
        let mut shared = self.shared.lock();
        if args.is_empty() {
            shared.journal.push(sql.to_string());
        } else {
            shared.journal.push(format!("{} {:?}", sql, args));
        }
        Ok(shared.rows.pop_front().unwrap_or_default())
    }
}

#[async_trait]
impl QueryExecutor for FakeExecutor {
    type Transaction = FakeTransaction;

    async fn connect(_config: &ConnectionConfig) -> Result<Self, StorageError> {
        Ok(Self::default())
    }

    fn placeholder(_index: usize) -> String {
        "?".to_string()
    }

    async fn query(&self, sql: &str, args: &[Value]) -> Result<Rows, StorageError> {
        self.run(sql, args)
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> Result<u64, StorageError> {
        self.run(sql, args).map(|_| 1)
    }

    async fn begin_transaction(&self) -> Result<Self::Transaction, StorageError> {
        self.run("BEGIN", &[])?;
        Ok(FakeTransaction {
            executor: self.clone(),
        })
    }

    async fn close(&self) {
        self.shared.lock().journal.push("CLOSE".to_string());
    }
}

pub(crate) struct FakeTransaction {
    executor: FakeExecutor,
}

#[async_trait]
impl TransactionExecutor for FakeTransaction {
    async fn query(&mut self, sql: &str, args: &[Value]) -> Result<Rows, StorageError> {
        self.executor.run(sql, args)
    }

    async fn execute(&mut self, sql: &str, args: &[Value]) -> Result<u64, StorageError> {
        self.executor.run(sql, args).map(|_| 1)
    }

    async fn commit(self) -> Result<(), StorageError> {
        self.executor.run("COMMIT", &[]).map(|_| ())
    }

    async fn rollback(self) -> Result<(), StorageError> {
        self.executor.run("ROLLBACK", &[]).map(|_| ())
    }
}
