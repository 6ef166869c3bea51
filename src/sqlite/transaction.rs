use rusqlite::Connection;
use tracing::trace;

use super::connection::{SqliteLease, run_blocking};
use super::params::convert;
use super::query;
use crate::error::QueryError;
use crate::results::{Row, Rows};
use crate::types::RowValues;

/// An open `SQLite` transaction holding the connection lease.
pub(crate) struct SqliteTx {
    lease: Option<SqliteLease>,
}

impl SqliteTx {
    pub(super) async fn begin(lease: SqliteLease) -> Result<Self, QueryError> {
        let (lease, result) = run_blocking(lease, |conn| conn.execute_batch("BEGIN")).await?;
        result?;
        Ok(Self { lease: Some(lease) })
    }

    async fn run<T, F>(&mut self, job: F) -> Result<T, QueryError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        // only empty if an earlier call was cancelled mid-flight; that call rolled back
        let lease = self.lease.take().ok_or_else(|| {
            QueryError::ConnectionLost("sqlite transaction was interrupted".into())
        })?;
        let (lease, result) = run_blocking(lease, job).await?;
        self.lease = Some(lease);
        result
    }

    pub(crate) async fn execute(&mut self, sql: &str, params: &[RowValues]) -> Result<u64, QueryError> {
        trace!(backend = "sqlite", sql, "tx execute");
        let sql = sql.to_owned();
        let params = convert(params);
        self.run(move |conn| query::execute(conn, &sql, &params)).await
    }

    pub(crate) async fn fetch_all(&mut self, sql: &str, params: &[RowValues]) -> Result<Rows, QueryError> {
        trace!(backend = "sqlite", sql, "tx fetch_all");
        let sql = sql.to_owned();
        let params = convert(params);
        self.run(move |conn| query::fetch_rows(conn, &sql, &params, None))
            .await
    }

    pub(crate) async fn fetch_one(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Option<Row>, QueryError> {
        trace!(backend = "sqlite", sql, "tx fetch_one");
        let sql = sql.to_owned();
        let params = convert(params);
        self.run(move |conn| query::fetch_rows(conn, &sql, &params, Some(1)))
            .await
            .map(Rows::into_first)
    }

    pub(crate) async fn execute_batch(&mut self, sql: &str) -> Result<(), QueryError> {
        let sql = sql.to_owned();
        self.run(move |conn| conn.execute_batch(&sql)).await
    }

    pub(crate) async fn commit(mut self) -> Result<(), QueryError> {
        self.finish("COMMIT").await
    }

    pub(crate) async fn rollback(mut self) -> Result<(), QueryError> {
        self.finish("ROLLBACK").await
    }

    async fn finish(&mut self, statement: &'static str) -> Result<(), QueryError> {
        let lease = self.lease.take().ok_or_else(|| {
            QueryError::ConnectionLost("sqlite transaction was interrupted".into())
        })?;
        let (lease, result) = run_blocking(lease, move |conn| {
            let outcome = conn.execute_batch(statement);
            if outcome.is_err() && !conn.is_autocommit() {
                // a failed COMMIT leaves the transaction open
                let _ = conn.execute_batch("ROLLBACK");
            }
            outcome
        })
        .await?;
        drop(lease);
        result
    }
}

impl Drop for SqliteTx {
    fn drop(&mut self) {
        let Some(lease) = self.lease.take() else {
            return;
        };
        // the lease rolls back on drop; keep that file I/O off the async workers
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || drop(lease));
            }
            Err(_) => drop(lease),
        }
    }
}
