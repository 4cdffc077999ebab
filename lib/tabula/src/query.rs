//! Single-use statements mapped into targets.

use crate::mapper::{self, Shape, Target};
use crate::{Context, QueryExecutor, Rows, StorageError, Value};

/// One statement plus its positional arguments, bound to the context that
/// will run it. Consumed by whichever fetch method is called.
#[derive(Debug)]
pub struct Query<'c, E> {
    context: &'c Context<E>,
    sql: String,
    args: Vec<Value>,
}

impl<'c, E: QueryExecutor> Query<'c, E> {
    pub(crate) fn new(context: &'c Context<E>, sql: String, args: Vec<Value>) -> Self {
        Self { context, sql, args }
    }

    /// Append another positional argument.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Run the statement and map its rows into `target`.
    ///
    /// The target's type decides the multiplicity: a single shape is
    /// populated in place from the first row (`NotFound` when there is
    /// none), a `Vec` receives one element per row, an `Option` is `None`
    /// for an empty result.
    pub async fn populate<T: Target>(self, target: &mut T) -> Result<(), StorageError> {
        let context = self.context;
        let signatures = context.signatures();
        let rows = self.rows().await?;
        target.load(rows, signatures)
    }

    /// Map the first row into a fresh `T`.
    pub async fn one<T: Shape>(self) -> Result<T, StorageError> {
        let context = self.context;
        let signatures = context.signatures();
        let rows = self.rows().await?;
        let mut item = T::blank();
        mapper::fill_one(&mut item, rows, signatures)?;
        Ok(item)
    }

    /// Map every row.
    pub async fn all<T: Shape>(self) -> Result<Vec<T>, StorageError> {
        let context = self.context;
        let signatures = context.signatures();
        let rows = self.rows().await?;
        let mut items = Vec::new();
        mapper::fill_all(&mut items, rows, signatures)?;
        Ok(items)
    }

    /// Map the first row, if any.
    pub async fn optional<T: Shape>(self) -> Result<Option<T>, StorageError> {
        let context = self.context;
        let signatures = context.signatures();
        let rows = self.rows().await?;
        let mut item = None;
        mapper::fill_optional(&mut item, rows, signatures)?;
        Ok(item)
    }

    async fn rows(self) -> Result<Rows, StorageError> {
        log::debug!("[SQL] {}", self.sql);
        self.context.executor().query(&self.sql, &self.args).await
    }
}
