//! The `none` backend: the full adapter contract with no database behind it.
//!
//! Lifecycle calls succeed so an application can boot without a database; every query
//! operation fails with [`QueryError::DatabaseDisabled`] and nothing touches the network or
//! the filesystem.

use tracing::info;

use crate::error::QueryError;
use crate::results::{Row, Rows};
use crate::types::RowValues;

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct DisabledBinding;

impl DisabledBinding {
    pub(crate) fn new() -> Self {
        info!("database disabled; queries will be rejected");
        Self
    }

    #[allow(clippy::unused_async)]
    pub(crate) async fn execute(&self, _sql: &str, _params: &[RowValues]) -> Result<u64, QueryError> {
        Err(QueryError::DatabaseDisabled)
    }

    #[allow(clippy::unused_async)]
    pub(crate) async fn fetch_all(&self, _sql: &str, _params: &[RowValues]) -> Result<Rows, QueryError> {
        Err(QueryError::DatabaseDisabled)
    }

    #[allow(clippy::unused_async)]
    pub(crate) async fn fetch_one(
        &self,
        _sql: &str,
        _params: &[RowValues],
    ) -> Result<Option<Row>, QueryError> {
        Err(QueryError::DatabaseDisabled)
    }

    #[allow(clippy::unused_async)]
    pub(crate) async fn execute_batch(&self, _sql: &str) -> Result<(), QueryError> {
        Err(QueryError::DatabaseDisabled)
    }

    pub(crate) fn begin(&self) -> QueryError {
        QueryError::DatabaseDisabled
    }
}
