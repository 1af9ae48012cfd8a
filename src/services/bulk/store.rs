//! Transactional database contract used by the batch executor.
//!
//! `BatchStore` hands out one transaction per batch. Dropping a
//! `BatchTransaction` without committing rolls it back and releases the
//! underlying connection, so every exit path of a batch cleans up.

use anyhow::Result;
use async_trait::async_trait;

use super::statement::Statement;

#[async_trait]
pub trait BatchStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn BatchTransaction>>;
}

#[async_trait]
pub trait BatchTransaction: Send {
    /// Run a write statement, returning the affected row count. A failed
    /// statement leaves the transaction usable for the following rows.
    async fn execute(&mut self, statement: &Statement) -> Result<u64>;

    /// Whether `table` holds a row with `column = id`, as seen by this
    /// transaction.
    async fn exists(&mut self, table: &str, column: &str, id: &str) -> Result<bool>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}
