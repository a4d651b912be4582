//! Postgres database clients.

use std::{mem, sync::Arc};

use tokio::sync::{Mutex, MutexGuard};
use tokio_postgres::{types::ToSql, Row};
use tracerr::Traced;

use crate::infra::database::{
    self,
    postgres::{self, connection, Connection},
};

/// Non-transactional Postgres database client.
///
/// Every operation runs on a connection borrowed from the pool for its own
/// duration only.
#[derive(Clone, Debug)]
pub struct NonTx {
    /// [`connection::Pool`] to borrow connections from.
    pool: connection::Pool,
}

impl NonTx {
    /// Creates a new [`NonTx`] client from the provided [`connection::Pool`].
    #[must_use]
    pub(crate) fn from_pool(pool: connection::Pool) -> Self {
        Self { pool }
    }

    /// Returns the [`connection::Pool`] of this [`NonTx`] client.
    #[must_use]
    pub(crate) fn pool(&self) -> &connection::Pool {
        &self.pool
    }

    /// Borrows a connection from the pool.
    async fn connection(
        &self,
    ) -> Result<connection::NonTx, Traced<database::Error>> {
        self.pool
            .get()
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}

impl Connection for NonTx {
    async fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, Traced<database::Error>> {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .query(sql, params)
            .await
            .map_err(tracerr::wrap!())
    }

    async fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Option<Row>, Traced<database::Error>> {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .query_opt(sql, params)
            .await
            .map_err(tracerr::wrap!())
    }

    async fn exec(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, Traced<database::Error>> {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .exec(sql, params)
            .await
            .map_err(tracerr::wrap!())
    }
}

/// Stage of a [`Tx`] client.
#[derive(Debug, Default)]
enum Stage {
    /// Nothing has been run yet, so no connection is taken.
    #[default]
    Pending,

    /// Transaction is running.
    Begun(connection::Tx),

    /// Transaction is committed.
    Finished,
}

/// Transactional Postgres database client.
///
/// Begins its transaction on a dedicated pooled connection once the first
/// operation runs. Clones share the same transaction, which is rolled back if
/// the last clone is dropped without committing.
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`connection::Pool`] to take the dedicated connection from.
    pool: connection::Pool,

    /// [`Stage`] of the transaction.
    stage: Arc<Mutex<Stage>>,
}

impl Tx {
    /// Creates a new [`Tx`] client taking its connection from the provided
    /// [`connection::Pool`].
    #[must_use]
    pub fn from_pool(pool: connection::Pool) -> Self {
        Self {
            pool,
            stage: Arc::default(),
        }
    }

    /// Returns the running transaction, beginning it if not yet.
    ///
    /// Operations of the same transaction are serialized, as a connection
    /// runs one statement at a time anyway.
    async fn connection(
        &self,
    ) -> Result<
        tokio::sync::MappedMutexGuard<'_, connection::Tx>,
        Traced<database::Error>,
    > {
        let mut stage = self.stage.lock().await;
        if matches!(*stage, Stage::Pending) {
            let conn = self
                .pool
                .get()
                .await
                .map_err(tracerr::from_and_wrap!(=> postgres::Error))
                .map_err(tracerr::map_from)?;
            *stage = Stage::Begun(
                connection::Tx::begin(conn)
                    .await
                    .map_err(tracerr::wrap!())?,
            );
        }
        MutexGuard::try_map(stage, |s| match s {
            Stage::Begun(tx) => Some(tx),
            Stage::Pending | Stage::Finished => None,
        })
        .map_err(|_| {
            tracerr::new!(database::Error::from(postgres::Error::TxFinished))
        })
    }

    /// Commits this [`Tx`] client.
    ///
    /// Committing a transaction that hasn't run anything is a no-op.
    ///
    /// # Errors
    ///
    /// If this [`Tx`] is committed already, or the database fails to commit
    /// it.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        let stage = mem::replace(&mut *self.stage.lock().await, Stage::Finished);
        match stage {
            Stage::Pending => Ok(()),
            Stage::Begun(tx) => tx.commit().await.map_err(tracerr::wrap!()),
            Stage::Finished => Err(tracerr::new!(database::Error::from(
                postgres::Error::TxFinished
            ))),
        }
    }
}

impl Connection for Tx {
    async fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, Traced<database::Error>> {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .query(sql, params)
            .await
            .map_err(tracerr::wrap!())
    }

    async fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Option<Row>, Traced<database::Error>> {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .query_opt(sql, params)
            .await
            .map_err(tracerr::wrap!())
    }

    async fn exec(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, Traced<database::Error>> {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .exec(sql, params)
            .await
            .map_err(tracerr::wrap!())
    }
}
