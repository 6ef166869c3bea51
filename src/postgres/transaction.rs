use deadpool_postgres::Object;
use tracing::{trace, warn};

use super::errors::map_error;
use super::query;
use crate::error::QueryError;
use crate::results::{Row, Rows};
use crate::types::RowValues;

/// An open transaction on one pooled client.
///
/// `BEGIN`/`COMMIT`/`ROLLBACK` are issued by hand so the client itself can be owned by the
/// scope instead of borrowed by a `tokio_postgres::Transaction`.
pub(crate) struct PostgresTx {
    client: Option<Object>,
}

impl PostgresTx {
    pub(super) async fn begin(client: Object) -> Result<Self, QueryError> {
        if let Err(err) = client.batch_execute("BEGIN").await {
            let err = map_error(err);
            if err.poisons_connection() {
                drop(Object::take(client));
            }
            return Err(err);
        }
        Ok(Self {
            client: Some(client),
        })
    }

    fn client(&self) -> Result<&Object, QueryError> {
        self.client.as_ref().ok_or(QueryError::TransactionClosed)
    }

    /// Pass `result` through, dropping the client from the pool if it was poisoned.
    fn check<T>(&mut self, result: Result<T, QueryError>) -> Result<T, QueryError> {
        if let Err(err) = &result {
            if err.poisons_connection() {
                if let Some(client) = self.client.take() {
                    warn!(error = %err, "discarding postgres connection mid-transaction");
                    drop(Object::take(client));
                }
            }
        }
        result
    }

    pub(crate) async fn execute(&mut self, sql: &str, params: &[RowValues]) -> Result<u64, QueryError> {
        trace!(backend = "postgres", sql, "tx execute");
        let result = query::execute(self.client()?, sql, params).await;
        self.check(result)
    }

    pub(crate) async fn fetch_all(&mut self, sql: &str, params: &[RowValues]) -> Result<Rows, QueryError> {
        trace!(backend = "postgres", sql, "tx fetch_all");
        let result = query::fetch_all(self.client()?, sql, params).await;
        self.check(result)
    }

    pub(crate) async fn fetch_one(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Option<Row>, QueryError> {
        self.fetch_all(sql, params).await.map(Rows::into_first)
    }

    pub(crate) async fn execute_batch(&mut self, sql: &str) -> Result<(), QueryError> {
        let result = query::execute_batch(self.client()?, sql).await;
        self.check(result)
    }

    pub(crate) async fn commit(mut self) -> Result<(), QueryError> {
        self.finish("COMMIT").await
    }

    pub(crate) async fn rollback(mut self) -> Result<(), QueryError> {
        self.finish("ROLLBACK").await
    }

    async fn finish(&mut self, statement: &str) -> Result<(), QueryError> {
        let client = self.client.take().ok_or(QueryError::TransactionClosed)?;
        match client.batch_execute(statement).await {
            Ok(()) => Ok(()),
            Err(err) => {
                // the server-side state is unknown; never return this client to the pool
                drop(Object::take(client));
                Err(map_error(err))
            }
        }
    }
}

impl Drop for PostgresTx {
    fn drop(&mut self) {
        let Some(client) = self.client.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = client.batch_execute("ROLLBACK").await {
                        warn!(error = %e, "postgres rollback of dropped scope failed");
                        drop(Object::take(client));
                    }
                });
            }
            Err(_) => drop(Object::take(client)),
        }
    }
}
