use async_trait::async_trait;

use crate::adapter::Adapter;
use crate::error::QueryError;
use crate::results::{Row, Rows};
use crate::transaction::TransactionScope;
use crate::translation::bind_named_for;
use crate::types::{BackendKind, RowValues};

/// Anything that can run neutral `?` queries: the adapter itself or an open transaction
/// scope.
///
/// Helpers written against this trait work both inside and outside a transaction:
/// ```rust,no_run
/// use sql_adapter::prelude::*;
///
/// async fn count_users<E: QueryExecutor>(mut exec: E) -> Result<i64, QueryError> {
///     let row = exec.fetch_one("SELECT COUNT(*) AS n FROM users", &[]).await?;
///     Ok(row.and_then(|r| r.get("n").and_then(RowValues::as_int).copied()).unwrap_or(0))
/// }
///
/// # async fn demo(db: &Adapter) -> Result<(), QueryError> {
/// count_users(db).await?;
/// let mut tx = db.transaction().await?;
/// count_users(&mut tx).await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait QueryExecutor: Send {
    /// Backend the queries will run against.
    async fn backend(&mut self) -> Result<BackendKind, QueryError>;

    async fn execute(&mut self, query: &str, params: &[RowValues]) -> Result<u64, QueryError>;

    async fn fetch_one(&mut self, query: &str, params: &[RowValues]) -> Result<Option<Row>, QueryError>;

    async fn fetch_all(&mut self, query: &str, params: &[RowValues]) -> Result<Rows, QueryError>;

    async fn execute_batch(&mut self, sql: &str) -> Result<(), QueryError>;

    /// `execute` with `:name` placeholders.
    async fn execute_named(
        &mut self,
        query: &str,
        named: &[(&str, RowValues)],
    ) -> Result<u64, QueryError> {
        let kind = self.backend().await?;
        let (sql, params) = bind_named_for(query, kind, named)?;
        self.execute(&sql, &params).await
    }

    async fn fetch_one_named(
        &mut self,
        query: &str,
        named: &[(&str, RowValues)],
    ) -> Result<Option<Row>, QueryError> {
        let kind = self.backend().await?;
        let (sql, params) = bind_named_for(query, kind, named)?;
        self.fetch_one(&sql, &params).await
    }

    async fn fetch_all_named(
        &mut self,
        query: &str,
        named: &[(&str, RowValues)],
    ) -> Result<Rows, QueryError> {
        let kind = self.backend().await?;
        let (sql, params) = bind_named_for(query, kind, named)?;
        self.fetch_all(&sql, &params).await
    }
}

#[async_trait]
impl<'a> QueryExecutor for &'a Adapter {
    async fn backend(&mut self) -> Result<BackendKind, QueryError> {
        self.live_backend()
    }

    async fn execute(&mut self, query: &str, params: &[RowValues]) -> Result<u64, QueryError> {
        Adapter::execute(self, query, params).await
    }

    async fn fetch_one(&mut self, query: &str, params: &[RowValues]) -> Result<Option<Row>, QueryError> {
        Adapter::fetch_one(self, query, params).await
    }

    async fn fetch_all(&mut self, query: &str, params: &[RowValues]) -> Result<Rows, QueryError> {
        Adapter::fetch_all(self, query, params).await
    }

    async fn execute_batch(&mut self, sql: &str) -> Result<(), QueryError> {
        Adapter::execute_batch(self, sql).await
    }
}

#[async_trait]
impl QueryExecutor for TransactionScope {
    async fn backend(&mut self) -> Result<BackendKind, QueryError> {
        if self.is_open() {
            Ok(TransactionScope::backend(self))
        } else {
            Err(QueryError::TransactionClosed)
        }
    }

    async fn execute(&mut self, query: &str, params: &[RowValues]) -> Result<u64, QueryError> {
        TransactionScope::execute(self, query, params).await
    }

    async fn fetch_one(&mut self, query: &str, params: &[RowValues]) -> Result<Option<Row>, QueryError> {
        TransactionScope::fetch_one(self, query, params).await
    }

    async fn fetch_all(&mut self, query: &str, params: &[RowValues]) -> Result<Rows, QueryError> {
        TransactionScope::fetch_all(self, query, params).await
    }

    async fn execute_batch(&mut self, sql: &str) -> Result<(), QueryError> {
        TransactionScope::execute_batch(self, sql).await
    }
}

#[async_trait]
impl<T> QueryExecutor for &mut T
where
    T: QueryExecutor + ?Sized,
{
    async fn backend(&mut self) -> Result<BackendKind, QueryError> {
        (**self).backend().await
    }

    async fn execute(&mut self, query: &str, params: &[RowValues]) -> Result<u64, QueryError> {
        (**self).execute(query, params).await
    }

    async fn fetch_one(&mut self, query: &str, params: &[RowValues]) -> Result<Option<Row>, QueryError> {
        (**self).fetch_one(query, params).await
    }

    async fn fetch_all(&mut self, query: &str, params: &[RowValues]) -> Result<Rows, QueryError> {
        (**self).fetch_all(query, params).await
    }

    async fn execute_batch(&mut self, sql: &str) -> Result<(), QueryError> {
        (**self).execute_batch(sql).await
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::config::ConnectionConfig;

    async fn names<E: QueryExecutor>(mut exec: E) -> Vec<String> {
        exec.fetch_all_named("SELECT name FROM people WHERE age >= :min ORDER BY name", &[(
            "min",
            RowValues::Int(18),
        )])
        .await
        .unwrap()
        .into_iter()
        .filter_map(|row| row.get("name").and_then(RowValues::as_text).map(str::to_owned))
        .collect()
    }

    #[tokio::test]
    async fn the_same_helper_runs_on_adapter_and_scope() {
        let db = Adapter::new();
        db.init(ConnectionConfig::sqlite(":memory:")).await.unwrap();
        db.execute_batch("CREATE TABLE people (name TEXT, age INTEGER)")
            .await
            .unwrap();
        db.execute_named(
            "INSERT INTO people (name, age) VALUES (:name, :age)",
            &[("name", RowValues::from("ann")), ("age", RowValues::Int(30))],
        )
        .await
        .unwrap();

        assert_eq!(names(&db).await, vec!["ann".to_owned()]);

        let mut tx = db.transaction().await.unwrap();
        tx.execute("INSERT INTO people (name, age) VALUES (?, ?)", &[
            RowValues::from("bob"),
            RowValues::Int(40),
        ])
        .await
        .unwrap();
        assert_eq!(names(&mut tx).await, vec!["ann".to_owned(), "bob".to_owned()]);
        assert_eq!(QueryExecutor::backend(&mut tx).await.unwrap(), BackendKind::Sqlite);
        tx.rollback().await.unwrap();

        assert!(matches!(
            QueryExecutor::backend(&mut tx).await,
            Err(QueryError::TransactionClosed)
        ));
        assert_eq!(names(&db).await, vec!["ann".to_owned()]);
    }
}
