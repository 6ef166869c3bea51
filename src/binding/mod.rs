mod connection;

pub(crate) use connection::TxConnection;

#[cfg(feature = "mssql")]
use crate::mssql::MssqlBinding;
#[cfg(feature = "postgres")]
use crate::postgres::PostgresBinding;
#[cfg(feature = "sqlite")]
use crate::sqlite::SqliteBinding;

use crate::config::ConnectionConfig;
use crate::disabled::DisabledBinding;
use crate::error::{InitError, QueryError};
use crate::results::{Row, Rows};
use crate::types::{BackendKind, RowValues};

/// The one live backend behind an adapter.
///
/// Chosen once at init from [`ConnectionConfig`]; every call dispatches on the variant.
pub(crate) enum Binding {
    /// Single `SQLite` connection
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteBinding),
    /// `PostgreSQL` connection pool
    #[cfg(feature = "postgres")]
    Postgres(PostgresBinding),
    /// SQL Server connection pool
    #[cfg(feature = "mssql")]
    Mssql(MssqlBinding),
    /// No database
    Disabled(DisabledBinding),
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Binding").field(&self.kind()).finish()
    }
}

fn unavailable(kind: BackendKind) -> InitError {
    InitError::DriverUnavailable(format!(
        "{kind} support is not compiled in; enable the `{kind}` cargo feature"
    ))
}

impl Binding {
    /// Validate `config` and open the backend it names.
    pub(crate) async fn connect(config: &ConnectionConfig) -> Result<Self, InitError> {
        config.validate()?;
        match config {
            #[cfg(feature = "sqlite")]
            ConnectionConfig::Sqlite(opts) => Ok(Binding::Sqlite(SqliteBinding::connect(opts).await?)),
            #[cfg(feature = "postgres")]
            ConnectionConfig::Postgres(opts) => {
                Ok(Binding::Postgres(PostgresBinding::connect(opts).await?))
            }
            #[cfg(feature = "mssql")]
            ConnectionConfig::Mssql(opts) => Ok(Binding::Mssql(MssqlBinding::connect(opts).await?)),
            ConnectionConfig::Disabled => Ok(Binding::Disabled(DisabledBinding::new())),
            #[allow(unreachable_patterns)]
            other => Err(unavailable(other.kind())),
        }
    }

    pub(crate) fn kind(&self) -> BackendKind {
        match self {
            #[cfg(feature = "sqlite")]
            Binding::Sqlite(_) => BackendKind::Sqlite,
            #[cfg(feature = "postgres")]
            Binding::Postgres(_) => BackendKind::Postgres,
            #[cfg(feature = "mssql")]
            Binding::Mssql(_) => BackendKind::Mssql,
            Binding::Disabled(_) => BackendKind::Disabled,
        }
    }

    pub(crate) async fn execute(&self, sql: &str, params: &[RowValues]) -> Result<u64, QueryError> {
        match self {
            #[cfg(feature = "sqlite")]
            Binding::Sqlite(db) => db.execute(sql, params).await,
            #[cfg(feature = "postgres")]
            Binding::Postgres(db) => db.execute(sql, params).await,
            #[cfg(feature = "mssql")]
            Binding::Mssql(db) => db.execute(sql, params).await,
            Binding::Disabled(db) => db.execute(sql, params).await,
        }
    }

    pub(crate) async fn fetch_all(&self, sql: &str, params: &[RowValues]) -> Result<Rows, QueryError> {
        match self {
            #[cfg(feature = "sqlite")]
            Binding::Sqlite(db) => db.fetch_all(sql, params).await,
            #[cfg(feature = "postgres")]
            Binding::Postgres(db) => db.fetch_all(sql, params).await,
            #[cfg(feature = "mssql")]
            Binding::Mssql(db) => db.fetch_all(sql, params).await,
            Binding::Disabled(db) => db.fetch_all(sql, params).await,
        }
    }

    pub(crate) async fn fetch_one(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Option<Row>, QueryError> {
        match self {
            #[cfg(feature = "sqlite")]
            Binding::Sqlite(db) => db.fetch_one(sql, params).await,
            #[cfg(feature = "postgres")]
            Binding::Postgres(db) => db.fetch_one(sql, params).await,
            #[cfg(feature = "mssql")]
            Binding::Mssql(db) => db.fetch_one(sql, params).await,
            Binding::Disabled(db) => db.fetch_one(sql, params).await,
        }
    }

    pub(crate) async fn execute_batch(&self, sql: &str) -> Result<(), QueryError> {
        match self {
            #[cfg(feature = "sqlite")]
            Binding::Sqlite(db) => db.execute_batch(sql).await,
            #[cfg(feature = "postgres")]
            Binding::Postgres(db) => db.execute_batch(sql).await,
            #[cfg(feature = "mssql")]
            Binding::Mssql(db) => db.execute_batch(sql).await,
            Binding::Disabled(db) => db.execute_batch(sql).await,
        }
    }

    /// Check out a connection and issue `BEGIN` on it.
    pub(crate) async fn begin(&self) -> Result<TxConnection, QueryError> {
        match self {
            #[cfg(feature = "sqlite")]
            Binding::Sqlite(db) => db.begin().await.map(TxConnection::Sqlite),
            #[cfg(feature = "postgres")]
            Binding::Postgres(db) => db.begin().await.map(TxConnection::Postgres),
            #[cfg(feature = "mssql")]
            Binding::Mssql(db) => db.begin().await.map(TxConnection::Mssql),
            Binding::Disabled(db) => Err(db.begin()),
        }
    }

    pub(crate) async fn close(&self) {
        match self {
            #[cfg(feature = "sqlite")]
            Binding::Sqlite(db) => db.close().await,
            #[cfg(feature = "postgres")]
            Binding::Postgres(db) => db.close(),
            #[cfg(feature = "mssql")]
            Binding::Mssql(db) => db.close(),
            Binding::Disabled(_) => {}
        }
    }

    #[cfg(all(test, feature = "sqlite"))]
    pub(crate) fn sqlite(&self) -> Option<&SqliteBinding> {
        match self {
            Binding::Sqlite(db) => Some(db),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }
}
