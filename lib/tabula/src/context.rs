//! The owning handle: executor connection plus signature cache.

use std::sync::Arc;

use crate::signature::{ModelSignature, SignatureCache};
use crate::{
    BoxFuture, ConnectionConfig, Model, Query, QueryExecutor, StorageError, TransactionExecutor,
    Tx, Value,
};

/// Bundles an executor with the signature cache of every model mapped
/// through it.
///
/// Queries and transactional scopes borrow the context, so it can only be
/// closed once none of them are alive.
#[derive(Debug)]
pub struct Context<E> {
    executor: E,
    signatures: SignatureCache,
}

impl<E: QueryExecutor> Context<E> {
    /// Wrap an already connected executor.
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            signatures: SignatureCache::new(),
        }
    }

    /// Connect the executor and wrap it.
    pub async fn open(config: impl Into<ConnectionConfig>) -> Result<Self, StorageError> {
        let config = config.into();
        let executor = E::connect(&config).await?;
        Ok(Self::new(executor))
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn signatures(&self) -> &SignatureCache {
        &self.signatures
    }

    /// Signature for `M`, derived on first use.
    pub fn signature<M: Model>(&self) -> Arc<ModelSignature> {
        self.signatures.signature::<M>()
    }

    /// An already derived signature, by model type name.
    pub fn signature_by_name(&self, type_name: &str) -> Option<Arc<ModelSignature>> {
        self.signatures.by_name(type_name)
    }

    /// Prepare a statement for mapping into a target.
    pub fn execute(&self, sql: impl Into<String>, args: Vec<Value>) -> Query<'_, E> {
        Query::new(self, sql.into(), args)
    }

    /// Run a statement outside any transaction, returning rows affected.
    pub async fn exec(&self, sql: &str, args: &[Value]) -> Result<u64, StorageError> {
        log::debug!("[SQL] {}", sql);
        self.executor.execute(sql, args).await
    }

    /// Run `work` inside a transaction.
    ///
    /// Commits when `work` succeeds and rolls back when it fails. If the
    /// transaction cannot be started, `work` is never called.
    ///
    /// ```text
    /// ctx.scope(|tx| Box::pin(async move {
    ///     tx.save(&user).await?;
    ///     Ok::<_, StorageError>(())
    /// }))
    /// .await?;
    /// ```
    pub async fn scope<'c, R, F>(&'c self, work: F) -> Result<R, StorageError>
    where
        R: Send,
        F: for<'t> FnOnce(&'t mut Tx<'c, E>) -> BoxFuture<'t, Result<R, StorageError>> + Send,
    {
        let mut tx = Tx::new(self, self.executor.begin_transaction().await?);

        match work(&mut tx).await {
            Ok(value) => {
                tx.into_inner().commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = tx.into_inner().rollback().await {
                    log::warn!("Rollback failed after error ({}): {}", err, rollback);
                }
                Err(err)
            }
        }
    }

    /// Release the executor's connections.
    pub async fn close(self) {
        self.executor.close().await
    }
}
