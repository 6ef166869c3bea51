use std::time::Duration;

use deadpool::managed::PoolError;
use tiberius::error::Error as TiberiusError;

use crate::error::QueryError;

/// Unique index, primary key, foreign key, and NOT NULL violations.
const CONSTRAINT_ERRORS: [u32; 4] = [2627, 2601, 547, 515];

/// Classify a tiberius failure into the shared taxonomy.
pub(crate) fn map_error(err: TiberiusError) -> QueryError {
    match &err {
        TiberiusError::Server(token) if CONSTRAINT_ERRORS.contains(&token.code()) => {
            QueryError::ConstraintViolation(token.message().to_owned())
        }
        TiberiusError::Io { .. } | TiberiusError::Tls(_) | TiberiusError::Routing { .. } => {
            QueryError::ConnectionLost(err.to_string())
        }
        _ => QueryError::unknown(err),
    }
}

/// A call that outlived the configured query timeout.
pub(crate) fn timed_out(limit: Duration) -> QueryError {
    QueryError::Timeout(format!("mssql query exceeded {:.1}s", limit.as_secs_f64()))
}

/// Classify a pool checkout failure; `backend` maps the manager's own error type.
pub(crate) fn map_pool_error<E>(err: PoolError<E>, backend: impl FnOnce(E) -> QueryError) -> QueryError
where
    E: std::fmt::Display,
{
    match err {
        PoolError::Timeout(kind) => {
            QueryError::Timeout(format!("waiting for a pooled mssql connection ({kind:?})"))
        }
        PoolError::Backend(e) => match backend(e) {
            QueryError::Unknown(e) => QueryError::ConnectionLost(e.to_string()),
            other => other,
        },
        PoolError::Closed => QueryError::AdapterClosed,
        other => QueryError::ConnectionLost(other.to_string()),
    }
}
