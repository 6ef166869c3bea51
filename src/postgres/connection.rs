use deadpool_postgres::{Object, Pool};
use tracing::{info, trace, warn};

use super::config::build_pool;
use super::errors::map_pool_error;
use super::query;
use super::transaction::PostgresTx;
use crate::config::PostgresOptions;
use crate::error::{InitError, QueryError};
use crate::results::{Row, Rows};
use crate::types::RowValues;

/// Bounded pool of tokio-postgres clients; each call checks one out and returns it.
pub(crate) struct PostgresBinding {
    pool: Pool,
}

/// Detach `client` from the pool when `result` says the connection can't be trusted.
fn settle<T>(client: Object, result: &Result<T, QueryError>) {
    if let Err(err) = result {
        if err.poisons_connection() {
            warn!(error = %err, "discarding postgres connection");
            drop(Object::take(client));
        }
    }
}

impl PostgresBinding {
    pub(crate) async fn connect(opts: &PostgresOptions) -> Result<Self, InitError> {
        Ok(Self {
            pool: build_pool(opts).await?,
        })
    }

    async fn client(&self) -> Result<Object, QueryError> {
        self.pool.get().await.map_err(map_pool_error)
    }

    pub(crate) async fn execute(&self, sql: &str, params: &[RowValues]) -> Result<u64, QueryError> {
        trace!(backend = "postgres", sql, "execute");
        let client = self.client().await?;
        let result = query::execute(&client, sql, params).await;
        settle(client, &result);
        result
    }

    pub(crate) async fn fetch_all(&self, sql: &str, params: &[RowValues]) -> Result<Rows, QueryError> {
        trace!(backend = "postgres", sql, "fetch_all");
        let client = self.client().await?;
        let result = query::fetch_all(&client, sql, params).await;
        settle(client, &result);
        result
    }

    pub(crate) async fn fetch_one(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Option<Row>, QueryError> {
        self.fetch_all(sql, params).await.map(Rows::into_first)
    }

    pub(crate) async fn execute_batch(&self, sql: &str) -> Result<(), QueryError> {
        trace!(backend = "postgres", sql, "execute_batch");
        let client = self.client().await?;
        let result = query::execute_batch(&client, sql).await;
        settle(client, &result);
        result
    }

    pub(crate) async fn begin(&self) -> Result<PostgresTx, QueryError> {
        let client = self.client().await?;
        PostgresTx::begin(client).await
    }

    /// Stop handing out clients; idle ones are dropped now, busy ones when returned.
    pub(crate) fn close(&self) {
        let status = self.pool.status();
        self.pool.close();
        info!(
            size = status.size,
            available = status.available,
            "postgres pool closed"
        );
    }
}
