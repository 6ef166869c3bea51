use std::time::Duration;

use deadpool::managed::{Manager, Object, Pool};
use tracing::{info, trace, warn};

use super::config::build_pool;
use super::errors::{map_error, map_pool_error, timed_out};
use super::native::NativeManager;
use super::query::{Reply, Request, perform};
use super::transaction::MssqlTx;
use super::worker::WorkerManager;
use crate::config::MssqlOptions;
use crate::error::{InitError, QueryError};
use crate::results::{Row, Rows};
use crate::types::RowValues;

/// The two driver paths share one pool interface.
pub(super) enum MssqlPool {
    Native(Pool<NativeManager>),
    Blocking(Pool<WorkerManager>),
}

/// A pooled object that leaves its pool for good when dropped with a request in flight.
///
/// A cancelled caller drops the lease between `start` and `finish`; the client may then be
/// mid-response, so it is detached instead of going back to the idle queue.
pub(super) struct Lease<M: Manager> {
    object: Option<Object<M>>,
    in_flight: bool,
}

impl<M: Manager> Lease<M> {
    fn new(object: Object<M>) -> Self {
        Self {
            object: Some(object),
            in_flight: false,
        }
    }

    /// Mark a request as started. A lease whose previous request never finished is detached
    /// and reported as lost.
    fn start(&mut self) -> Result<&mut M::Type, QueryError> {
        if self.in_flight {
            self.detach();
        }
        match self.object.as_mut() {
            Some(object) => {
                self.in_flight = true;
                Ok(&mut **object)
            }
            None => Err(QueryError::ConnectionLost(
                "mssql connection was interrupted mid-request".into(),
            )),
        }
    }

    fn finish(&mut self) {
        self.in_flight = false;
    }

    fn detach(&mut self) {
        self.in_flight = false;
        if let Some(object) = self.object.take() {
            drop(Object::take(object));
        }
    }
}

impl<M: Manager> Drop for Lease<M> {
    fn drop(&mut self) {
        if self.in_flight {
            warn!("mssql request cancelled mid-flight; discarding its connection");
            self.detach();
        }
    }
}

/// One checked-out connection from either path.
pub(super) enum MssqlConn {
    Native(Lease<NativeManager>),
    Worker(Lease<WorkerManager>),
}

impl MssqlPool {
    pub(super) async fn checkout(&self) -> Result<MssqlConn, QueryError> {
        match self {
            MssqlPool::Native(pool) => pool
                .get()
                .await
                .map(|client| MssqlConn::Native(Lease::new(client)))
                .map_err(|e| map_pool_error(e, map_error)),
            MssqlPool::Blocking(pool) => pool
                .get()
                .await
                .map(|handle| MssqlConn::Worker(Lease::new(handle)))
                .map_err(|e| map_pool_error(e, |e| e)),
        }
    }

    fn close(&self) {
        match self {
            MssqlPool::Native(pool) => pool.close(),
            MssqlPool::Blocking(pool) => pool.close(),
        }
    }
}

impl MssqlConn {
    /// Run `request`, bounded by `limit` on both paths.
    pub(super) async fn perform(&mut self, request: Request, limit: Duration) -> Result<Reply, QueryError> {
        match self {
            MssqlConn::Native(lease) => {
                let client = lease.start()?;
                let result = tokio::time::timeout(limit, perform(client, &request))
                    .await
                    .map_err(|_| timed_out(limit))
                    .and_then(|reply| reply);
                lease.finish();
                result
            }
            MssqlConn::Worker(lease) => {
                let handle = lease.start()?;
                let result = handle.call(request, limit).await;
                lease.finish();
                result
            }
        }
    }

    /// `true` when a request on this connection was abandoned before it finished.
    pub(super) fn is_interrupted(&self) -> bool {
        match self {
            MssqlConn::Native(lease) => lease.in_flight,
            MssqlConn::Worker(lease) => lease.in_flight,
        }
    }

    /// Drop the connection instead of returning it to the pool.
    pub(super) fn discard(self) {
        match self {
            MssqlConn::Native(mut lease) => lease.detach(),
            MssqlConn::Worker(mut lease) => lease.detach(),
        }
    }
}

/// SQL Server pool (native or worker-backed) with a per-call timeout.
pub(crate) struct MssqlBinding {
    pool: MssqlPool,
    timeout: Duration,
}

impl MssqlBinding {
    pub(crate) async fn connect(opts: &MssqlOptions) -> Result<Self, InitError> {
        Ok(Self {
            pool: build_pool(opts).await?,
            timeout: opts.query_timeout(),
        })
    }

    async fn run(&self, request: Request) -> Result<Reply, QueryError> {
        trace!(backend = "mssql", sql = request.sql(), "dispatch");
        let mut conn = self.pool.checkout().await?;
        let result = conn.perform(request, self.timeout).await;
        match &result {
            Err(err) if err.poisons_connection() => {
                warn!(error = %err, "discarding mssql connection");
                conn.discard();
            }
            _ => drop(conn),
        }
        result
    }

    pub(crate) async fn execute(&self, sql: &str, params: &[RowValues]) -> Result<u64, QueryError> {
        self.run(Request::Execute {
            sql: sql.to_owned(),
            params: params.to_vec(),
        })
        .await?
        .into_affected()
    }

    pub(crate) async fn fetch_all(&self, sql: &str, params: &[RowValues]) -> Result<Rows, QueryError> {
        self.run(Request::FetchAll {
            sql: sql.to_owned(),
            params: params.to_vec(),
        })
        .await?
        .into_rows()
    }

    pub(crate) async fn fetch_one(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Option<Row>, QueryError> {
        self.run(Request::FetchOne {
            sql: sql.to_owned(),
            params: params.to_vec(),
        })
        .await?
        .into_row()
    }

    pub(crate) async fn execute_batch(&self, sql: &str) -> Result<(), QueryError> {
        self.run(Request::Batch {
            sql: sql.to_owned(),
        })
        .await?
        .into_done()
    }

    pub(crate) async fn begin(&self) -> Result<MssqlTx, QueryError> {
        let conn = self.pool.checkout().await?;
        MssqlTx::begin(conn, self.timeout).await
    }

    pub(crate) fn close(&self) {
        self.pool.close();
        info!("mssql pool closed");
    }
}

#[cfg(test)]
mod tests {
    use std::future::pending;

    use deadpool::managed::{Metrics, RecycleResult};

    use super::*;

    struct Counter;

    impl Manager for Counter {
        type Type = u32;
        type Error = QueryError;

        async fn create(&self) -> Result<u32, QueryError> {
            Ok(7)
        }

        async fn recycle(&self, _obj: &mut u32, _metrics: &Metrics) -> RecycleResult<QueryError> {
            Ok(())
        }
    }

    fn pool() -> Pool<Counter> {
        Pool::builder(Counter).max_size(1).build().unwrap()
    }

    #[tokio::test]
    async fn finished_lease_returns_to_the_pool() {
        let pool = pool();
        let mut lease = Lease::new(pool.get().await.unwrap());
        assert_eq!(*lease.start().unwrap(), 7);
        lease.finish();
        drop(lease);

        let status = pool.status();
        assert_eq!(status.size, 1);
        assert_eq!(status.available, 1);
    }

    #[tokio::test]
    async fn cancelled_request_detaches_the_object() {
        let pool = pool();
        let lease = Lease::new(pool.get().await.unwrap());
        let outcome = tokio::time::timeout(Duration::from_millis(20), async move {
            let mut lease = lease;
            let _value = lease.start().unwrap();
            pending::<()>().await;
        })
        .await;
        assert!(outcome.is_err());

        assert_eq!(pool.status().size, 0);
    }

    #[tokio::test]
    async fn restarting_an_interrupted_lease_reports_it_lost() {
        let pool = pool();
        let mut lease = Lease::new(pool.get().await.unwrap());
        let _ = tokio::time::timeout(Duration::from_millis(20), async {
            let _value = lease.start().unwrap();
            pending::<()>().await;
        })
        .await;
        assert!(lease.in_flight);

        let err = lease.start().unwrap_err();
        assert!(err.poisons_connection());
        assert_eq!(pool.status().size, 0);
    }
}
