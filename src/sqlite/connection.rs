use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rusqlite::Connection;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, trace, warn};

use super::config::open_connection;
use super::errors::map_error;
use super::params::convert;
use super::probe::{AccessProbe, ProbeHold};
use super::query;
use super::transaction::SqliteTx;
use crate::config::SqliteOptions;
use crate::error::{InitError, QueryError, join_error};
use crate::results::{Row, Rows};
use crate::types::RowValues;

/// The single `SQLite` connection, serialized behind an async mutex.
///
/// Every statement runs on the blocking pool while the caller holds the mutex, so the
/// connection is never touched by two callers at once and the async executor never blocks
/// on file I/O.
pub(crate) struct SqliteBinding {
    conn: Arc<Mutex<Option<Connection>>>,
    closed: AtomicBool,
    probe: Arc<AccessProbe>,
}

/// Exclusive access to the connection.
///
/// Releasing a lease while a transaction is still open rolls it back, so a cancelled caller
/// never hands the next caller a connection in the middle of someone else's transaction.
pub(super) struct SqliteLease {
    // declared first so the probe sees the release before the mutex does
    _hold: ProbeHold,
    guard: OwnedMutexGuard<Option<Connection>>,
}

impl SqliteLease {
    fn connection(&self) -> Option<&Connection> {
        self.guard.as_ref()
    }
}

impl Drop for SqliteLease {
    fn drop(&mut self) {
        if let Some(conn) = self.guard.as_ref() {
            if !conn.is_autocommit() {
                debug!("sqlite connection released inside a transaction; rolling back");
                if let Err(e) = conn.execute_batch("ROLLBACK") {
                    warn!(error = %e, "sqlite rollback on release failed");
                }
            }
        }
    }
}

/// Run `job` against the leased connection on the blocking pool and hand the lease back.
pub(super) async fn run_blocking<T, F>(
    lease: SqliteLease,
    job: F,
) -> Result<(SqliteLease, Result<T, QueryError>), QueryError>
where
    T: Send + 'static,
    F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let result = match lease.connection() {
            Some(conn) => job(conn).map_err(map_error),
            None => Err(QueryError::AdapterClosed),
        };
        (lease, result)
    })
    .await
    .map_err(join_error)
}

impl SqliteBinding {
    /// Open the connection described by `opts`.
    ///
    /// # Errors
    /// Returns [`InitError::ConnectionRefused`] when the file cannot be opened or configured.
    pub(crate) async fn connect(opts: &SqliteOptions) -> Result<Self, InitError> {
        let owned = opts.clone();
        let conn = tokio::task::spawn_blocking(move || open_connection(&owned))
            .await
            .map_err(|e| InitError::refused("sqlite", e))??;
        info!(path = %opts.path, "sqlite connection opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            closed: AtomicBool::new(false),
            probe: Arc::default(),
        })
    }

    /// Wait for the connection and take it.
    pub(super) async fn lease(&self) -> Result<SqliteLease, QueryError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(QueryError::AdapterClosed);
        }
        let guard = Arc::clone(&self.conn).lock_owned().await;
        if guard.is_none() {
            return Err(QueryError::AdapterClosed);
        }
        Ok(SqliteLease {
            _hold: self.probe.enter(),
            guard,
        })
    }

    async fn run<T, F>(&self, job: F) -> Result<T, QueryError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let lease = self.lease().await?;
        let (lease, result) = run_blocking(lease, job).await?;
        drop(lease);
        result
    }

    pub(crate) async fn execute(&self, sql: &str, params: &[RowValues]) -> Result<u64, QueryError> {
        trace!(backend = "sqlite", sql, "execute");
        let sql = sql.to_owned();
        let params = convert(params);
        self.run(move |conn| query::execute(conn, &sql, &params))
            .await
    }

    pub(crate) async fn fetch_all(&self, sql: &str, params: &[RowValues]) -> Result<Rows, QueryError> {
        trace!(backend = "sqlite", sql, "fetch_all");
        let sql = sql.to_owned();
        let params = convert(params);
        self.run(move |conn| query::fetch_rows(conn, &sql, &params, None))
            .await
    }

    pub(crate) async fn fetch_one(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Option<Row>, QueryError> {
        trace!(backend = "sqlite", sql, "fetch_one");
        let sql = sql.to_owned();
        let params = convert(params);
        self.run(move |conn| query::fetch_rows(conn, &sql, &params, Some(1)))
            .await
            .map(Rows::into_first)
    }

    pub(crate) async fn execute_batch(&self, sql: &str) -> Result<(), QueryError> {
        trace!(backend = "sqlite", sql, "execute_batch");
        let sql = sql.to_owned();
        self.run(move |conn| conn.execute_batch(&sql)).await
    }

    /// Start a transaction that keeps the connection until it finishes.
    ///
    /// Waits while another scope holds the connection.
    pub(crate) async fn begin(&self) -> Result<SqliteTx, QueryError> {
        let lease = self.lease().await?;
        SqliteTx::begin(lease).await
    }

    /// Refuse further work and close the connection if nobody holds it.
    pub(crate) async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let Ok(mut guard) = Arc::clone(&self.conn).try_lock_owned() else {
            warn!("sqlite connection still in use; it closes when its holder releases it");
            return;
        };
        let Some(conn) = guard.take() else {
            return;
        };
        drop(guard);
        match tokio::task::spawn_blocking(move || conn.close()).await {
            Ok(Ok(())) => info!("sqlite connection closed"),
            Ok(Err((_conn, e))) => warn!(error = %e, "sqlite close reported an error"),
            Err(e) => warn!(error = %e, "sqlite close task failed"),
        }
    }

    #[cfg(test)]
    pub(crate) fn probe(&self) -> &Arc<AccessProbe> {
        &self.probe
    }
}
