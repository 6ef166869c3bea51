use std::time::Duration;

use tracing::{trace, warn};

use super::connection::MssqlConn;
use super::query::{Reply, Request};
use crate::error::QueryError;
use crate::results::{Row, Rows};
use crate::types::RowValues;

/// An open SQL Server transaction on one checked-out connection.
pub(crate) struct MssqlTx {
    conn: Option<MssqlConn>,
    timeout: Duration,
}

fn batch(sql: &str) -> Request {
    Request::Batch {
        sql: sql.to_owned(),
    }
}

impl MssqlTx {
    pub(super) async fn begin(mut conn: MssqlConn, timeout: Duration) -> Result<Self, QueryError> {
        match conn.perform(batch("BEGIN TRANSACTION"), timeout).await {
            Ok(_) => Ok(Self {
                conn: Some(conn),
                timeout,
            }),
            Err(err) => {
                if err.poisons_connection() {
                    conn.discard();
                }
                Err(err)
            }
        }
    }

    async fn run(&mut self, request: Request) -> Result<Reply, QueryError> {
        trace!(backend = "mssql", sql = request.sql(), "tx dispatch");
        let conn = self.conn.as_mut().ok_or(QueryError::TransactionClosed)?;
        let result = conn.perform(request, self.timeout).await;
        if let Err(err) = &result {
            if err.poisons_connection() {
                if let Some(conn) = self.conn.take() {
                    warn!(error = %err, "discarding mssql connection mid-transaction");
                    conn.discard();
                }
            }
        }
        result
    }

    pub(crate) async fn execute(&mut self, sql: &str, params: &[RowValues]) -> Result<u64, QueryError> {
        self.run(Request::Execute {
            sql: sql.to_owned(),
            params: params.to_vec(),
        })
        .await?
        .into_affected()
    }

    pub(crate) async fn fetch_all(&mut self, sql: &str, params: &[RowValues]) -> Result<Rows, QueryError> {
        self.run(Request::FetchAll {
            sql: sql.to_owned(),
            params: params.to_vec(),
        })
        .await?
        .into_rows()
    }

    pub(crate) async fn fetch_one(
        &mut self,
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

    pub(crate) async fn execute_batch(&mut self, sql: &str) -> Result<(), QueryError> {
        self.run(batch(sql)).await?.into_done()
    }

    pub(crate) async fn commit(mut self) -> Result<(), QueryError> {
        self.finish("COMMIT TRANSACTION").await
    }

    pub(crate) async fn rollback(mut self) -> Result<(), QueryError> {
        self.finish("ROLLBACK TRANSACTION").await
    }

    async fn finish(&mut self, statement: &str) -> Result<(), QueryError> {
        let mut conn = self.conn.take().ok_or(QueryError::TransactionClosed)?;
        match conn.perform(batch(statement), self.timeout).await {
            Ok(_) => Ok(()),
            Err(err) => {
                // @@TRANCOUNT is unknown now; never hand this connection to another caller
                conn.discard();
                Err(err)
            }
        }
    }
}

impl Drop for MssqlTx {
    fn drop(&mut self) {
        let Some(mut conn) = self.conn.take() else {
            return;
        };
        if conn.is_interrupted() {
            // detached on drop; the server rolls back when the session closes
            return;
        }
        let timeout = self.timeout;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = conn.perform(batch("ROLLBACK TRANSACTION"), timeout).await {
                        warn!(error = %e, "mssql rollback of dropped scope failed");
                        conn.discard();
                    }
                });
            }
            Err(_) => conn.discard(),
        }
    }
}
