use thiserror::Error;

/// Boxed driver error carried by [`QueryError::Unknown`].
pub type DriverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures raised while bringing an adapter up.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("adapter is already initialized; call close() first")]
    AlreadyInitialized,

    #[error("invalid database configuration: {0}")]
    InvalidConfig(String),

    #[error("could not connect to {backend}: {reason}")]
    ConnectionRefused { backend: String, reason: String },

    #[error("driver unavailable: {0}")]
    DriverUnavailable(String),
}

impl InitError {
    pub(crate) fn refused(backend: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        InitError::ConnectionRefused {
            backend: backend.into(),
            reason: reason.to_string(),
        }
    }
}

/// Failures raised by `execute`, `fetch_one`, `fetch_all`, and `transaction`.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query expects {expected} parameter(s) but {provided} were supplied")]
    ParameterArityMismatch { expected: usize, provided: usize },

    #[error("adapter is closed")]
    AdapterClosed,

    #[error("adapter has not been initialized")]
    NotInitialized,

    #[error("database is disabled (backend = none)")]
    DatabaseDisabled,

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("connection lost: {0}")]
    ConnectionLost(String),

    #[error("transaction scope is already closed")]
    TransactionClosed,

    #[error("no value supplied for named parameter :{0}")]
    MissingParameter(String),

    #[error("database error: {0}")]
    Unknown(#[source] DriverError),
}

impl QueryError {
    /// Wrap any driver error that has no dedicated kind.
    pub fn unknown<E>(err: E) -> Self
    where
        E: Into<DriverError>,
    {
        QueryError::Unknown(err.into())
    }

    /// `true` when the connection that produced this error must not be reused.
    #[must_use]
    pub fn poisons_connection(&self) -> bool {
        matches!(self, QueryError::Timeout(_) | QueryError::ConnectionLost(_))
    }
}

/// Failures raised by [`TransactionScope`](crate::TransactionScope) completion.
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("transaction scope is already closed")]
    AlreadyClosed,

    #[error("{open} transaction scope(s) were never committed or rolled back")]
    ScopeLeaked { open: usize },

    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Failures raised by [`Adapter::close`](crate::Adapter::close).
#[derive(Debug, Error)]
pub enum CloseError {
    #[error("adapter is already closed")]
    AlreadyClosed,
}

/// Error produced when a spawned blocking job never reports back.
pub(crate) fn join_error(err: tokio::task::JoinError) -> QueryError {
    if err.is_cancelled() {
        QueryError::ConnectionLost(format!("blocking task cancelled: {err}"))
    } else {
        QueryError::unknown(format!("blocking task panicked: {err}"))
    }
}
