//! Backend-aware schema helpers.
//!
//! Every helper is generic over [`QueryExecutor`], so it runs the same way against the adapter
//! (`&adapter`) or inside a transaction (`&mut scope`). Table names are limited to the
//! default schema (`public` on `PostgreSQL`, `dbo` by default on SQL Server).

use tracing::debug;

use crate::error::QueryError;
use crate::executor::QueryExecutor;
use crate::types::{BackendKind, RowValues};

const SQLITE_TABLES: &str =
    "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name";
const POSTGRES_TABLES: &str = "SELECT table_name::text AS name FROM information_schema.tables \
     WHERE table_schema = 'public' AND table_type = 'BASE TABLE' ORDER BY table_name";
const MSSQL_TABLES: &str = "SELECT name FROM sys.tables ORDER BY name";

const SQLITE_COLUMNS: &str = "SELECT name, type AS data_type FROM pragma_table_info(?) ORDER BY cid";
const POSTGRES_COLUMNS: &str = "SELECT column_name::text AS name, data_type::text AS data_type \
     FROM information_schema.columns \
     WHERE table_schema = 'public' AND table_name::text = ? ORDER BY ordinal_position";
const MSSQL_COLUMNS: &str = "SELECT c.name AS name, t.name AS data_type FROM sys.columns c \
     JOIN sys.types t ON c.user_type_id = t.user_type_id \
     WHERE c.object_id = OBJECT_ID(?) ORDER BY c.column_id";

/// Quote an identifier for `kind`.
#[must_use]
pub fn quote_identifier(name: &str, kind: BackendKind) -> String {
    match kind {
        BackendKind::Mssql => format!("[{}]", name.replace(']', "]]")),
        BackendKind::Sqlite | BackendKind::Postgres | BackendKind::Disabled => {
            format!("\"{}\"", name.replace('"', "\"\""))
        }
    }
}

fn text_column(row: &crate::results::Row, column: &str) -> Result<String, QueryError> {
    row.get(column)
        .and_then(RowValues::as_text)
        .map(str::to_owned)
        .ok_or_else(|| QueryError::unknown(format!("catalog row is missing text column `{column}`")))
}

/// User table names, sorted.
///
/// # Errors
/// [`QueryError::DatabaseDisabled`] in disabled mode; otherwise any query failure.
pub async fn list_tables<E: QueryExecutor>(mut exec: E) -> Result<Vec<String>, QueryError> {
    let sql = match exec.backend().await? {
        BackendKind::Sqlite => SQLITE_TABLES,
        BackendKind::Postgres => POSTGRES_TABLES,
        BackendKind::Mssql => MSSQL_TABLES,
        BackendKind::Disabled => return Err(QueryError::DatabaseDisabled),
    };
    exec.fetch_all(sql, &[])
        .await?
        .iter()
        .map(|row| text_column(row, "name"))
        .collect()
}

/// Columns of `table` as `(name, declared type)` in ordinal order. Unknown tables yield an
/// empty list.
///
/// # Errors
/// Same as [`list_tables`].
pub async fn table_schema<E: QueryExecutor>(
    mut exec: E,
    table: &str,
) -> Result<Vec<(String, String)>, QueryError> {
    let sql = match exec.backend().await? {
        BackendKind::Sqlite => SQLITE_COLUMNS,
        BackendKind::Postgres => POSTGRES_COLUMNS,
        BackendKind::Mssql => MSSQL_COLUMNS,
        BackendKind::Disabled => return Err(QueryError::DatabaseDisabled),
    };
    exec.fetch_all(sql, &[RowValues::from(table)])
        .await?
        .iter()
        .map(|row| Ok((text_column(row, "name")?, text_column(row, "data_type")?)))
        .collect()
}

/// Drop every user table. Returns the dropped names.
///
/// On `SQLite` foreign keys are switched off for the drops (or deferred, inside a transaction
/// where `foreign_keys` cannot change) and put back to their previous setting afterwards,
/// whether or not a drop failed.
///
/// # Errors
/// Same as [`list_tables`]. Tables dropped before a failure stay dropped unless `exec` is a
/// transaction scope that is rolled back.
pub async fn drop_all_tables<E: QueryExecutor>(mut exec: E) -> Result<Vec<String>, QueryError> {
    let kind = exec.backend().await?;
    let tables = list_tables(&mut exec).await?;
    if kind != BackendKind::Sqlite || tables.is_empty() {
        drop_each(&mut exec, kind, &tables).await?;
        return Ok(tables);
    }

    let enforced = sqlite_pragma(&mut exec, "foreign_keys").await?;
    let deferred = sqlite_pragma(&mut exec, "defer_foreign_keys").await?;
    exec.execute_batch("PRAGMA foreign_keys = OFF; PRAGMA defer_foreign_keys = ON")
        .await?;
    let dropped = drop_each(&mut exec, kind, &tables).await;
    let restored = exec
        .execute_batch(&format!(
            "PRAGMA defer_foreign_keys = {}; PRAGMA foreign_keys = {}",
            u8::from(deferred),
            u8::from(enforced)
        ))
        .await;
    dropped?;
    restored?;
    Ok(tables)
}

async fn drop_each<E: QueryExecutor>(
    exec: &mut E,
    kind: BackendKind,
    tables: &[String],
) -> Result<(), QueryError> {
    for table in tables {
        let quoted = quote_identifier(table, kind);
        let sql = match kind {
            BackendKind::Postgres => format!("DROP TABLE IF EXISTS public.{quoted} CASCADE"),
            BackendKind::Mssql => format!(
                "IF OBJECT_ID('{}', 'U') IS NOT NULL DROP TABLE {quoted}",
                table.replace('\'', "''")
            ),
            _ => format!("DROP TABLE IF EXISTS {quoted}"),
        };
        debug!(table = %table, "dropping table");
        exec.execute_batch(&sql).await?;
    }
    Ok(())
}

/// Current value of a boolean `SQLite` pragma.
async fn sqlite_pragma<E: QueryExecutor>(exec: &mut E, name: &str) -> Result<bool, QueryError> {
    let row = exec.fetch_one(&format!("PRAGMA {name}"), &[]).await?;
    Ok(row
        .as_ref()
        .and_then(|row| row.get(name))
        .and_then(RowValues::as_int)
        .is_some_and(|value| *value != 0))
}

/// Delete every row from every user table, keeping the tables.
///
/// # Errors
/// Same as [`list_tables`].
pub async fn clear_all_tables<E: QueryExecutor>(mut exec: E) -> Result<u64, QueryError> {
    let kind = exec.backend().await?;
    let mut removed = 0;
    for table in list_tables(&mut exec).await? {
        let sql = format!("DELETE FROM {}", quote_identifier(&table, kind));
        removed += exec.execute(&sql, &[]).await?;
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_quoted_per_backend() {
        assert_eq!(quote_identifier("users", BackendKind::Sqlite), "\"users\"");
        assert_eq!(quote_identifier("we\"ird", BackendKind::Postgres), "\"we\"\"ird\"");
        assert_eq!(quote_identifier("a]b", BackendKind::Mssql), "[a]]b]");
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn sqlite_catalog_round_trip() {
        use crate::adapter::Adapter;
        use crate::config::ConnectionConfig;

        let db = Adapter::new();
        db.init(ConnectionConfig::sqlite(":memory:")).await.unwrap();
        db.execute_batch(
            "CREATE TABLE b (id INTEGER PRIMARY KEY, label TEXT NOT NULL);
             CREATE TABLE a (id INTEGER PRIMARY KEY, b_id INTEGER REFERENCES b(id));
             INSERT INTO b (id, label) VALUES (1, 'x'), (2, 'y');
             INSERT INTO a (id, b_id) VALUES (1, 1);",
        )
        .await
        .unwrap();

        assert_eq!(list_tables(&db).await.unwrap(), vec!["a", "b"]);
        assert_eq!(
            table_schema(&db, "b").await.unwrap(),
            vec![
                ("id".to_owned(), "INTEGER".to_owned()),
                ("label".to_owned(), "TEXT".to_owned())
            ]
        );
        assert!(table_schema(&db, "missing").await.unwrap().is_empty());

        assert_eq!(clear_all_tables(&db).await.unwrap(), 3);
        assert_eq!(list_tables(&db).await.unwrap().len(), 2);

        let dropped = drop_all_tables(&db).await.unwrap();
        assert_eq!(dropped, vec!["a", "b"]);
        assert!(list_tables(&db).await.unwrap().is_empty());
    }

    #[cfg(feature = "sqlite")]
    async fn parent_and_child(db: &crate::adapter::Adapter) {
        db.execute_batch(
            "CREATE TABLE a (id INTEGER PRIMARY KEY);
             CREATE TABLE z (id INTEGER PRIMARY KEY, a_id INTEGER REFERENCES a(id));
             INSERT INTO a (id) VALUES (1);
             INSERT INTO z (id, a_id) VALUES (1, 1);",
        )
        .await
        .unwrap();
    }

    #[cfg(feature = "sqlite")]
    async fn foreign_keys_on(db: &crate::adapter::Adapter) -> bool {
        let mut exec = db;
        sqlite_pragma(&mut exec, "foreign_keys").await.unwrap()
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn sqlite_drop_inside_scope_defers_foreign_keys() {
        use crate::adapter::Adapter;
        use crate::config::ConnectionConfig;

        let db = Adapter::new();
        db.init(ConnectionConfig::sqlite(":memory:")).await.unwrap();
        parent_and_child(&db).await;
        assert!(foreign_keys_on(&db).await);

        let mut tx = db.transaction().await.unwrap();
        assert_eq!(drop_all_tables(&mut tx).await.unwrap(), vec!["a", "z"]);
        tx.commit().await.unwrap();

        assert!(list_tables(&db).await.unwrap().is_empty());
        assert!(foreign_keys_on(&db).await);
    }

    /// Delegates to an adapter but fails any batch that mentions `needle`.
    #[cfg(feature = "sqlite")]
    struct FailingBatch<'a> {
        inner: &'a crate::adapter::Adapter,
        needle: &'static str,
    }

    #[cfg(feature = "sqlite")]
    #[async_trait::async_trait]
    impl QueryExecutor for FailingBatch<'_> {
        async fn backend(&mut self) -> Result<BackendKind, QueryError> {
            QueryExecutor::backend(&mut self.inner).await
        }

        async fn execute(&mut self, query: &str, params: &[RowValues]) -> Result<u64, QueryError> {
            self.inner.execute(query, params).await
        }

        async fn fetch_one(
            &mut self,
            query: &str,
            params: &[RowValues],
        ) -> Result<Option<crate::results::Row>, QueryError> {
            self.inner.fetch_one(query, params).await
        }

        async fn fetch_all(
            &mut self,
            query: &str,
            params: &[RowValues],
        ) -> Result<crate::results::Rows, QueryError> {
            self.inner.fetch_all(query, params).await
        }

        async fn execute_batch(&mut self, sql: &str) -> Result<(), QueryError> {
            if sql.contains(self.needle) {
                return Err(QueryError::unknown("injected failure"));
            }
            self.inner.execute_batch(sql).await
        }
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn sqlite_drop_failure_restores_foreign_keys() {
        use crate::adapter::Adapter;
        use crate::config::ConnectionConfig;

        let db = Adapter::new();
        db.init(ConnectionConfig::sqlite(":memory:")).await.unwrap();
        parent_and_child(&db).await;

        let failing = FailingBatch {
            inner: &db,
            needle: "DROP TABLE IF EXISTS \"z\"",
        };
        assert!(drop_all_tables(failing).await.is_err());
        assert!(foreign_keys_on(&db).await);
        assert_eq!(list_tables(&db).await.unwrap(), vec!["z"]);
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn sqlite_drop_keeps_foreign_keys_off_when_configured_off() {
        use crate::adapter::Adapter;
        use crate::config::{ConnectionConfig, SqliteOptions};

        let db = Adapter::new();
        db.init(ConnectionConfig::Sqlite(SqliteOptions {
            foreign_keys: false,
            ..SqliteOptions::new(":memory:")
        }))
        .await
        .unwrap();
        parent_and_child(&db).await;

        drop_all_tables(&db).await.unwrap();
        assert!(!foreign_keys_on(&db).await);
    }
}
