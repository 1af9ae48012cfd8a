//! PostgreSQL implementation of the batch store.
//!
//! Each row's statement runs under a savepoint. Postgres aborts the whole
//! transaction on the first failed statement, so a failing row is rolled
//! back to its savepoint and later rows can still be applied.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use crate::services::bulk::{BatchStore, BatchTransaction, Param, Statement};

#[derive(Clone)]
pub struct PgBatchStore {
    pool: PgPool,
}

impl PgBatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BatchStore for PgBatchStore {
    async fn begin(&self) -> Result<Box<dyn BatchTransaction>> {
        let tx = self.pool.begin().await.context("Failed to begin transaction")?;
        debug!("Batch transaction opened");
        Ok(Box::new(PgBatchTransaction::new(tx)))
    }
}

/// Dropping without commit rolls back and returns the connection to the pool.
pub struct PgBatchTransaction {
    tx: Transaction<'static, Postgres>,
    /// Set once savepoint control fails. The server may then be holding an
    /// aborted transaction, and `COMMIT` on one reports success while
    /// actually rolling back.
    poisoned: bool,
}

/// Surface the server's own message for constraint and type errors.
fn database_error(e: sqlx::Error) -> anyhow::Error {
    match e {
        sqlx::Error::Database(db) => anyhow!("{}", db.message()),
        other => anyhow::Error::new(other),
    }
}

impl PgBatchTransaction {
    fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self { tx, poisoned: false }
    }

    async fn savepoint(&mut self, sql: &'static str) -> Result<()> {
        if let Err(e) = sqlx::query(sql).execute(&mut *self.tx).await {
            self.poisoned = true;
            return Err(database_error(e).context(format!("{} failed", sql)));
        }
        Ok(())
    }
}

#[async_trait]
impl BatchTransaction for PgBatchTransaction {
    async fn execute(&mut self, statement: &Statement) -> Result<u64> {
        let sql = statement.sql();
        let mut query = sqlx::query(&sql);
        for param in statement.params() {
            query = match param {
                Param::Text(value) => query.bind(value),
                Param::Int(value) => query.bind(value),
            };
        }

        self.savepoint("SAVEPOINT bulk_row").await?;
        match query.execute(&mut *self.tx).await {
            Ok(result) => {
                self.savepoint("RELEASE SAVEPOINT bulk_row").await?;
                Ok(result.rows_affected())
            }
            Err(e) => {
                self.savepoint("ROLLBACK TO SAVEPOINT bulk_row").await?;
                debug!(table = statement.table(), "Statement failed, rolled back to savepoint");
                Err(database_error(e))
            }
        }
    }

    async fn exists(&mut self, table: &str, column: &str, id: &str) -> Result<bool> {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE {} = $1)", table, column);

        self.savepoint("SAVEPOINT bulk_row").await?;
        match sqlx::query_scalar::<_, bool>(&sql).bind(id).fetch_one(&mut *self.tx).await {
            Ok(found) => {
                self.savepoint("RELEASE SAVEPOINT bulk_row").await?;
                Ok(found)
            }
            Err(e) => {
                self.savepoint("ROLLBACK TO SAVEPOINT bulk_row").await?;
                debug!(table, "Lookup failed, rolled back to savepoint");
                Err(database_error(e))
            }
        }
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        if self.poisoned {
            self.tx.rollback().await.map_err(database_error)?;
            bail!("Transaction was aborted by an earlier database error");
        }
        self.tx.commit().await.map_err(database_error)
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.map_err(database_error)
    }
}
