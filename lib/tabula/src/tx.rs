//! Transactional scope handed to `Context::scope` callbacks.

use crate::mapper::Target;
use crate::{Context, Model, QueryExecutor, StorageError, TransactionExecutor, Value};

/// The column the insert helper never writes.
const ID_COLUMN: &str = "id";

/// A live transaction paired with the context that opened it.
///
/// Only `Context::scope` creates one, and it alone decides whether to commit
/// or roll back.
pub struct Tx<'c, E: QueryExecutor> {
    context: &'c Context<E>,
    inner: E::Transaction,
}

impl<'c, E: QueryExecutor> Tx<'c, E> {
    pub(crate) fn new(context: &'c Context<E>, inner: E::Transaction) -> Self {
        Self { context, inner }
    }

    pub(crate) fn into_inner(self) -> E::Transaction {
        self.inner
    }

    pub fn context(&self) -> &'c Context<E> {
        self.context
    }

    /// Run a statement within the transaction.
    pub async fn execute(&mut self, sql: &str, args: &[Value]) -> Result<u64, StorageError> {
        log::debug!("[SQL] {}", sql);
        self.inner.execute(sql, args).await
    }

    /// Run a query within the transaction and map its rows into `target`.
    pub async fn populate<T: Target>(
        &mut self,
        target: &mut T,
        sql: &str,
        args: &[Value],
    ) -> Result<(), StorageError> {
        log::debug!("[SQL] {}", sql);
        let rows = self.inner.query(sql, args).await?;
        target.load(rows, self.context.signatures())
    }

    /// Insert `record` into the table named after its type.
    pub async fn save<M: Model>(&mut self, record: &M) -> Result<u64, StorageError> {
        let insert = insert_statement(record, E::placeholder);
        self.execute(&insert.sql, &insert.values).await
    }
}

/// A generated INSERT and the values to bind to it.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: String,
    pub columns: Vec<String>,
    pub sql: String,
    pub values: Vec<Value>,
}

/// Build the INSERT `Tx::save` runs for `record`.
///
/// Columns resolve exactly as in the model's signature; a column named `id`
/// is left out so the database can assign it. Values are the record's
/// current field values, uncoerced.
pub fn insert_statement<M: Model>(record: &M, placeholder: fn(usize) -> String) -> InsertStatement {
    let table = M::TYPE_NAME.to_lowercase();
    let mut columns = Vec::with_capacity(M::FIELDS.len());
    let mut values = Vec::with_capacity(M::FIELDS.len());

    for field in M::FIELDS {
        let column = field.column();
        if column == ID_COLUMN {
            continue;
        }
        columns.push(column);
        values.push((field.get)(record));
    }

    let placeholders: Vec<String> = (1..=columns.len()).map(placeholder).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders.join(", ")
    );

    InsertStatement {
        table,
        columns,
        sql,
        values,
    }
}
