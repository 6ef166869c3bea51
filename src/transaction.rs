use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tracing::{debug, warn};

use crate::binding::TxConnection;
use crate::error::{QueryError, TransactionError};
use crate::results::{Row, Rows};
use crate::translation::{check_arity, translate};
use crate::types::{BackendKind, RowValues};

/// Where a [`TransactionScope`] is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Open,
    Committed,
    RolledBack,
}

/// Counts scopes for one adapter lifecycle.
#[derive(Debug, Default)]
pub(crate) struct ScopeLedger {
    open: AtomicUsize,
    implicit_rollbacks: AtomicU64,
    next_id: AtomicU64,
}

impl ScopeLedger {
    fn opened(&self) -> u64 {
        self.open.fetch_add(1, Ordering::AcqRel);
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn closed(&self) {
        self.open.fetch_sub(1, Ordering::AcqRel);
    }

    fn rolled_back_on_drop(&self) {
        self.implicit_rollbacks.fetch_add(1, Ordering::Relaxed);
        self.closed();
    }

    pub(crate) fn open_scopes(&self) -> usize {
        self.open.load(Ordering::Acquire)
    }

    pub(crate) fn implicit_rollbacks(&self) -> u64 {
        self.implicit_rollbacks.load(Ordering::Relaxed)
    }
}

/// A database transaction holding one connection until it is committed, rolled back, or
/// dropped.
///
/// Statements issued through the scope run on its connection in issue order. Dropping an
/// open scope (early `?` return, panic, or plain forgetfulness) rolls it back:
/// ```rust,no_run
/// # use sql_adapter::prelude::*;
/// # async fn demo(adapter: &Adapter) -> Result<(), Box<dyn std::error::Error>> {
/// let mut tx = adapter.transaction().await?;
/// tx.execute("INSERT INTO users (name) VALUES (?)", &[RowValues::from("a")]).await?;
/// tx.commit().await?;
/// # Ok(())
/// # }
/// ```
/// On `SQLite` the scope owns the only connection, so calling the adapter itself while a
/// scope is open from the same task waits for that scope to end.
pub struct TransactionScope {
    conn: Option<TxConnection>,
    state: TxState,
    kind: BackendKind,
    ledger: Arc<ScopeLedger>,
    id: u64,
}

impl std::fmt::Debug for TransactionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionScope")
            .field("id", &self.id)
            .field("backend", &self.kind)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl TransactionScope {
    pub(crate) fn new(conn: TxConnection, kind: BackendKind, ledger: Arc<ScopeLedger>) -> Self {
        let id = ledger.opened();
        debug!(scope = id, backend = %kind, "transaction begun");
        Self {
            conn: Some(conn),
            state: TxState::Open,
            kind,
            ledger,
            id,
        }
    }

    #[must_use]
    pub fn state(&self) -> TxState {
        self.state
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == TxState::Open
    }

    #[must_use]
    pub fn backend(&self) -> BackendKind {
        self.kind
    }

    fn end(&mut self, state: TxState) {
        self.state = state;
        self.conn = None;
        self.ledger.closed();
        debug!(scope = self.id, ?state, "transaction finished");
    }

    /// Validate and translate `query`, returning the live connection.
    fn prepare(&mut self, query: &str, provided: usize) -> Result<(&mut TxConnection, String), QueryError> {
        if self.state != TxState::Open {
            return Err(QueryError::TransactionClosed);
        }
        check_arity(query, self.kind, provided)?;
        let sql = translate(query, self.kind).into_owned();
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| QueryError::ConnectionLost("transaction connection was lost".into()))?;
        Ok((conn, sql))
    }

    /// A connection-level failure ends the scope; the binding already dropped or rolled back
    /// its connection.
    fn observe<T>(&mut self, result: Result<T, QueryError>) -> Result<T, QueryError> {
        if let Err(err) = &result {
            if err.poisons_connection() && self.state == TxState::Open {
                warn!(scope = self.id, error = %err, "transaction aborted by connection failure");
                self.end(TxState::RolledBack);
            }
        }
        result
    }

    /// Run a statement inside the transaction.
    ///
    /// # Errors
    /// [`QueryError::TransactionClosed`] once the scope has finished, plus every error the
    /// adapter's `execute` can return.
    pub async fn execute(&mut self, query: &str, params: &[RowValues]) -> Result<u64, QueryError> {
        let (conn, sql) = self.prepare(query, params.len())?;
        let result = conn.execute(&sql, params).await;
        self.observe(result)
    }

    /// # Errors
    /// Same as [`TransactionScope::execute`].
    pub async fn fetch_one(
        &mut self,
        query: &str,
        params: &[RowValues],
    ) -> Result<Option<Row>, QueryError> {
        let (conn, sql) = self.prepare(query, params.len())?;
        let result = conn.fetch_one(&sql, params).await;
        self.observe(result)
    }

    /// # Errors
    /// Same as [`TransactionScope::execute`].
    pub async fn fetch_all(&mut self, query: &str, params: &[RowValues]) -> Result<Rows, QueryError> {
        let (conn, sql) = self.prepare(query, params.len())?;
        let result = conn.fetch_all(&sql, params).await;
        self.observe(result)
    }

    /// Run a parameterless multi-statement script inside the transaction.
    ///
    /// # Errors
    /// Same as [`TransactionScope::execute`].
    pub async fn execute_batch(&mut self, sql: &str) -> Result<(), QueryError> {
        let (conn, _) = self.prepare("", 0)?;
        let result = conn.execute_batch(sql).await;
        self.observe(result)
    }

    fn take_open(&mut self) -> Result<TxConnection, TransactionError> {
        if self.state != TxState::Open {
            return Err(TransactionError::AlreadyClosed);
        }
        match self.conn.take() {
            Some(conn) => Ok(conn),
            None => {
                self.end(TxState::RolledBack);
                Err(QueryError::ConnectionLost("transaction connection was lost".into()).into())
            }
        }
    }

    /// Commit and release the connection.
    ///
    /// # Errors
    /// [`TransactionError::AlreadyClosed`] if the scope already finished; a driver failure
    /// during `COMMIT` leaves the scope rolled back and is returned as
    /// [`TransactionError::Query`].
    pub async fn commit(&mut self) -> Result<(), TransactionError> {
        let conn = self.take_open()?;
        match conn.commit().await {
            Ok(()) => {
                self.end(TxState::Committed);
                Ok(())
            }
            Err(err) => {
                self.end(TxState::RolledBack);
                Err(err.into())
            }
        }
    }

    /// Roll back and release the connection.
    ///
    /// # Errors
    /// [`TransactionError::AlreadyClosed`] if the scope already finished.
    pub async fn rollback(&mut self) -> Result<(), TransactionError> {
        let conn = self.take_open()?;
        let result = conn.rollback().await;
        self.end(TxState::RolledBack);
        result.map_err(Into::into)
    }
}

impl Drop for TransactionScope {
    fn drop(&mut self) {
        if self.state != TxState::Open {
            return;
        }
        self.state = TxState::RolledBack;
        self.ledger.rolled_back_on_drop();
        warn!(
            scope = self.id,
            backend = %self.kind,
            "transaction scope dropped while open; rolling back"
        );
        // the backend connection rolls itself back when dropped
        drop(self.conn.take());
    }
}
