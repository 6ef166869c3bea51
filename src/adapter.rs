use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use tracing::{info, trace, warn};

use crate::binding::Binding;
use crate::config::ConnectionConfig;
use crate::error::{CloseError, InitError, QueryError, TransactionError};
use crate::results::{Row, Rows};
use crate::transaction::{ScopeLedger, TransactionScope};
use crate::translation::{bind_named_for, check_arity, translate};
use crate::types::{BackendKind, RowValues};

static GLOBAL: LazyLock<Adapter> = LazyLock::new(Adapter::new);

#[derive(Debug, Clone)]
struct Live {
    binding: Arc<Binding>,
    ledger: Arc<ScopeLedger>,
}

#[derive(Debug)]
enum AdapterState {
    Uninitialized,
    /// `init` is doing connect I/O with the lock released.
    Connecting,
    Ready(Live),
    Closed,
}

/// Snapshot of a live adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterStats {
    pub backend: BackendKind,
    pub open_scopes: usize,
    pub implicit_rollbacks: u64,
}

/// Backend-agnostic database handle.
///
/// An adapter owns at most one backend binding at a time, chosen by the
/// [`ConnectionConfig`] handed to [`Adapter::init`]. Queries use neutral `?` placeholders
/// and are translated for the live backend before dispatch.
///
/// ```rust,no_run
/// use sql_adapter::prelude::*;
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let db = Adapter::global();
/// db.init(ConnectionConfig::from_env()?).await?;
/// db.execute("INSERT INTO users (name) VALUES (?)", &[RowValues::from("a")]).await?;
/// let row = db.fetch_one("SELECT name FROM users WHERE name = ?", &params!["a"]).await?;
/// assert!(row.is_some());
/// db.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Adapter {
    state: RwLock<AdapterState>,
}

impl Default for Adapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Puts the pre-`init` state back if connecting fails or the `init` future is dropped.
struct ConnectingGuard<'a> {
    adapter: &'a Adapter,
    previous: Option<AdapterState>,
}

impl ConnectingGuard<'_> {
    fn finish(mut self, live: Live) {
        self.previous = None;
        *self.adapter.write() = AdapterState::Ready(live);
    }
}

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            *self.adapter.write() = previous;
        }
    }
}

impl Adapter {
    /// An uninitialized adapter. Nothing connects until [`Adapter::init`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: RwLock::new(AdapterState::Uninitialized),
        }
    }

    /// The process-wide adapter.
    pub fn global() -> &'static Adapter {
        &GLOBAL
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, AdapterState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, AdapterState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn live(&self) -> Result<Live, QueryError> {
        match &*self.read() {
            AdapterState::Ready(live) => Ok(live.clone()),
            AdapterState::Uninitialized | AdapterState::Connecting => Err(QueryError::NotInitialized),
            AdapterState::Closed => Err(QueryError::AdapterClosed),
        }
    }

    /// Validate `config`, open its backend, and make the adapter ready.
    ///
    /// Pooled backends prewarm their minimum number of connections here. An adapter that was
    /// closed may be initialized again.
    ///
    /// # Errors
    /// - [`InitError::AlreadyInitialized`] while the adapter is live or another `init` is
    ///   still connecting
    /// - [`InitError::InvalidConfig`] when validation fails
    /// - [`InitError::DriverUnavailable`] when the backend's cargo feature is off
    /// - [`InitError::ConnectionRefused`] when the first connection cannot be opened
    pub async fn init(&self, config: ConnectionConfig) -> Result<(), InitError> {
        let guard = {
            let mut state = self.write();
            match &*state {
                AdapterState::Ready(_) | AdapterState::Connecting => {
                    return Err(InitError::AlreadyInitialized);
                }
                AdapterState::Uninitialized | AdapterState::Closed => {}
            }
            let previous = std::mem::replace(&mut *state, AdapterState::Connecting);
            ConnectingGuard {
                adapter: self,
                previous: Some(previous),
            }
        };

        let binding = Binding::connect(&config).await?;
        info!(backend = %binding.kind(), "database adapter initialized");
        guard.finish(Live {
            binding: Arc::new(binding),
            ledger: Arc::new(ScopeLedger::default()),
        });
        Ok(())
    }

    /// Release the backend. Later queries fail with [`QueryError::AdapterClosed`].
    ///
    /// Scopes still open keep their connection until they end.
    ///
    /// # Errors
    /// [`CloseError::AlreadyClosed`] when the adapter is not live.
    pub async fn close(&self) -> Result<(), CloseError> {
        let live = {
            let mut state = self.write();
            match std::mem::replace(&mut *state, AdapterState::Closed) {
                AdapterState::Ready(live) => live,
                other => {
                    *state = other;
                    return Err(CloseError::AlreadyClosed);
                }
            }
        };

        let open = live.ledger.open_scopes();
        if open > 0 {
            warn!(open, "closing adapter with open transaction scopes");
        }
        live.binding.close().await;
        info!(backend = %live.binding.kind(), "database adapter closed");
        Ok(())
    }

    pub(crate) fn live_backend(&self) -> Result<BackendKind, QueryError> {
        self.live().map(|live| live.binding.kind())
    }

    /// The live backend, if any.
    #[must_use]
    pub fn backend(&self) -> Option<BackendKind> {
        match &*self.read() {
            AdapterState::Ready(live) => Some(live.binding.kind()),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        matches!(&*self.read(), AdapterState::Ready(_))
    }

    #[must_use]
    pub fn stats(&self) -> Option<AdapterStats> {
        match &*self.read() {
            AdapterState::Ready(live) => Some(AdapterStats {
                backend: live.binding.kind(),
                open_scopes: live.ledger.open_scopes(),
                implicit_rollbacks: live.ledger.implicit_rollbacks(),
            }),
            _ => None,
        }
    }

    /// Fail while any transaction scope from this lifecycle is still open.
    ///
    /// # Errors
    /// [`TransactionError::ScopeLeaked`] with the number of open scopes.
    pub fn audit_scopes(&self) -> Result<(), TransactionError> {
        let open = self.stats().map_or(0, |stats| stats.open_scopes);
        if open == 0 {
            Ok(())
        } else {
            Err(TransactionError::ScopeLeaked { open })
        }
    }

    /// Arity check and translation for one statement, before any I/O.
    fn prepare(&self, query: &str, provided: usize) -> Result<(Live, String), QueryError> {
        let live = self.live()?;
        check_arity(query, live.binding.kind(), provided)?;
        let sql = translate(query, live.binding.kind()).into_owned();
        trace!(backend = %live.binding.kind(), sql = %sql, "dispatch");
        Ok((live, sql))
    }

    /// Run a statement that returns no rows; yields the affected row count.
    ///
    /// # Errors
    /// [`QueryError::ParameterArityMismatch`] before any I/O when `params` does not match the
    /// placeholders in `query`; lifecycle errors; and mapped driver failures.
    pub async fn execute(&self, query: &str, params: &[RowValues]) -> Result<u64, QueryError> {
        let (live, sql) = self.prepare(query, params.len())?;
        live.binding.execute(&sql, params).await
    }

    /// First row of the result, or `None`.
    ///
    /// # Errors
    /// Same as [`Adapter::execute`].
    pub async fn fetch_one(&self, query: &str, params: &[RowValues]) -> Result<Option<Row>, QueryError> {
        let (live, sql) = self.prepare(query, params.len())?;
        live.binding.fetch_one(&sql, params).await
    }

    /// Every row of the result, in backend order.
    ///
    /// # Errors
    /// Same as [`Adapter::execute`].
    pub async fn fetch_all(&self, query: &str, params: &[RowValues]) -> Result<Rows, QueryError> {
        let (live, sql) = self.prepare(query, params.len())?;
        live.binding.fetch_all(&sql, params).await
    }

    /// Run a parameterless multi-statement script.
    ///
    /// # Errors
    /// Lifecycle errors and mapped driver failures.
    pub async fn execute_batch(&self, sql: &str) -> Result<(), QueryError> {
        let live = self.live()?;
        trace!(backend = %live.binding.kind(), sql, "dispatch batch");
        live.binding.execute_batch(sql).await
    }

    /// Begin a transaction on a dedicated connection.
    ///
    /// On `SQLite` this waits until the single connection is free.
    ///
    /// # Errors
    /// Lifecycle errors, [`QueryError::DatabaseDisabled`], and failures issuing `BEGIN`.
    pub async fn transaction(&self) -> Result<TransactionScope, QueryError> {
        let live = self.live()?;
        let conn = live.binding.begin().await?;
        Ok(TransactionScope::new(conn, live.binding.kind(), live.ledger))
    }

    /// [`Adapter::execute`] with `:name` placeholders.
    ///
    /// # Errors
    /// [`QueryError::MissingParameter`] plus everything `execute` returns.
    pub async fn execute_named(&self, query: &str, named: &[(&str, RowValues)]) -> Result<u64, QueryError> {
        let (sql, params) = bind_named_for(query, self.live_backend()?, named)?;
        self.execute(&sql, &params).await
    }

    /// # Errors
    /// Same as [`Adapter::execute_named`].
    pub async fn fetch_one_named(
        &self,
        query: &str,
        named: &[(&str, RowValues)],
    ) -> Result<Option<Row>, QueryError> {
        let (sql, params) = bind_named_for(query, self.live_backend()?, named)?;
        self.fetch_one(&sql, &params).await
    }

    /// # Errors
    /// Same as [`Adapter::execute_named`].
    pub async fn fetch_all_named(
        &self,
        query: &str,
        named: &[(&str, RowValues)],
    ) -> Result<Rows, QueryError> {
        let (sql, params) = bind_named_for(query, self.live_backend()?, named)?;
        self.fetch_all(&sql, &params).await
    }

    #[cfg(all(test, feature = "sqlite"))]
    fn binding(&self) -> Option<Arc<Binding>> {
        self.live().ok().map(|live| live.binding)
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::config::SqliteOptions;

    fn memory() -> ConnectionConfig {
        ConnectionConfig::sqlite(":memory:")
    }

    #[tokio::test]
    async fn arity_mismatch_never_reaches_the_connection() {
        let db = Adapter::new();
        db.init(memory()).await.unwrap();
        let binding = db.binding().unwrap();
        let probe = binding.sqlite().unwrap().probe();
        let before = probe.acquisitions();

        let err = db
            .execute("INSERT INTO t (a, b) VALUES (?, ?)", &[RowValues::Int(1)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            QueryError::ParameterArityMismatch {
                expected: 2,
                provided: 1
            }
        ));
        assert!(db.fetch_all("SELECT ?", &[]).await.is_err());
        assert_eq!(probe.acquisitions(), before);
    }

    #[tokio::test]
    async fn queries_before_init_report_not_initialized() {
        let db = Adapter::new();
        assert!(matches!(
            db.execute("SELECT 1", &[]).await,
            Err(QueryError::NotInitialized)
        ));
        assert!(matches!(db.transaction().await, Err(QueryError::NotInitialized)));
        assert!(db.stats().is_none());
        assert!(db.backend().is_none());
    }

    #[tokio::test]
    async fn failed_init_leaves_adapter_uninitialized() {
        let db = Adapter::new();
        let bad = ConnectionConfig::Sqlite(SqliteOptions::new(""));
        assert!(matches!(db.init(bad).await, Err(InitError::InvalidConfig(_))));
        assert!(!db.is_initialized());
        db.init(memory()).await.unwrap();
        assert_eq!(db.backend(), Some(BackendKind::Sqlite));
    }

    #[tokio::test]
    async fn stats_track_scopes_and_implicit_rollbacks() {
        let db = Adapter::new();
        db.init(memory()).await.unwrap();

        let scope = db.transaction().await.unwrap();
        assert_eq!(db.stats().unwrap().open_scopes, 1);
        assert!(matches!(
            db.audit_scopes(),
            Err(TransactionError::ScopeLeaked { open: 1 })
        ));
        drop(scope);

        let stats = db.stats().unwrap();
        assert_eq!(stats.open_scopes, 0);
        assert_eq!(stats.implicit_rollbacks, 1);
        assert!(db.audit_scopes().is_ok());
    }
}
