#[cfg(feature = "mssql")]
use crate::mssql::MssqlTx;
#[cfg(feature = "postgres")]
use crate::postgres::PostgresTx;
#[cfg(feature = "sqlite")]
use crate::sqlite::SqliteTx;

use crate::error::QueryError;
use crate::results::{Row, Rows};
use crate::types::RowValues;

/// A connection checked out for one transaction, with `BEGIN` already issued.
///
/// Dropping it without `commit`/`rollback` rolls the transaction back on the backend.
pub(crate) enum TxConnection {
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteTx),
    #[cfg(feature = "postgres")]
    Postgres(PostgresTx),
    #[cfg(feature = "mssql")]
    Mssql(MssqlTx),
}

impl TxConnection {
    pub(crate) async fn execute(&mut self, sql: &str, params: &[RowValues]) -> Result<u64, QueryError> {
        match self {
            #[cfg(feature = "sqlite")]
            TxConnection::Sqlite(tx) => tx.execute(sql, params).await,
            #[cfg(feature = "postgres")]
            TxConnection::Postgres(tx) => tx.execute(sql, params).await,
            #[cfg(feature = "mssql")]
            TxConnection::Mssql(tx) => tx.execute(sql, params).await,
        }
    }

    pub(crate) async fn fetch_all(&mut self, sql: &str, params: &[RowValues]) -> Result<Rows, QueryError> {
        match self {
            #[cfg(feature = "sqlite")]
            TxConnection::Sqlite(tx) => tx.fetch_all(sql, params).await,
            #[cfg(feature = "postgres")]
            TxConnection::Postgres(tx) => tx.fetch_all(sql, params).await,
            #[cfg(feature = "mssql")]
            TxConnection::Mssql(tx) => tx.fetch_all(sql, params).await,
        }
    }

    pub(crate) async fn fetch_one(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Option<Row>, QueryError> {
        match self {
            #[cfg(feature = "sqlite")]
            TxConnection::Sqlite(tx) => tx.fetch_one(sql, params).await,
            #[cfg(feature = "postgres")]
            TxConnection::Postgres(tx) => tx.fetch_one(sql, params).await,
            #[cfg(feature = "mssql")]
            TxConnection::Mssql(tx) => tx.fetch_one(sql, params).await,
        }
    }

    pub(crate) async fn execute_batch(&mut self, sql: &str) -> Result<(), QueryError> {
        match self {
            #[cfg(feature = "sqlite")]
            TxConnection::Sqlite(tx) => tx.execute_batch(sql).await,
            #[cfg(feature = "postgres")]
            TxConnection::Postgres(tx) => tx.execute_batch(sql).await,
            #[cfg(feature = "mssql")]
            TxConnection::Mssql(tx) => tx.execute_batch(sql).await,
        }
    }

    pub(crate) async fn commit(self) -> Result<(), QueryError> {
        match self {
            #[cfg(feature = "sqlite")]
            TxConnection::Sqlite(tx) => tx.commit().await,
            #[cfg(feature = "postgres")]
            TxConnection::Postgres(tx) => tx.commit().await,
            #[cfg(feature = "mssql")]
            TxConnection::Mssql(tx) => tx.commit().await,
        }
    }

    pub(crate) async fn rollback(self) -> Result<(), QueryError> {
        match self {
            #[cfg(feature = "sqlite")]
            TxConnection::Sqlite(tx) => tx.rollback().await,
            #[cfg(feature = "postgres")]
            TxConnection::Postgres(tx) => tx.rollback().await,
            #[cfg(feature = "mssql")]
            TxConnection::Mssql(tx) => tx.rollback().await,
        }
    }
}
