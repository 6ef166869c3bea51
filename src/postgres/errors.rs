use deadpool_postgres::PoolError;

use crate::error::QueryError;

const QUERY_CANCELED: &str = "57014";
const ADMIN_SHUTDOWN: &str = "57P01";

/// Classify a tokio-postgres failure into the shared taxonomy.
pub(crate) fn map_error(err: tokio_postgres::Error) -> QueryError {
    if let Some(db) = err.as_db_error() {
        let code = db.code().code();
        let detail = match db.detail() {
            Some(detail) => format!("{}: {detail}", db.message()),
            None => db.message().to_owned(),
        };
        if code.starts_with("23") {
            return QueryError::ConstraintViolation(detail);
        }
        if code == QUERY_CANCELED {
            return QueryError::Timeout(detail);
        }
        if code.starts_with("08") || code == ADMIN_SHUTDOWN {
            return QueryError::ConnectionLost(detail);
        }
        return QueryError::unknown(err);
    }

    if err.is_closed() || source_is_io(&err) {
        return QueryError::ConnectionLost(err.to_string());
    }
    QueryError::unknown(err)
}

/// Classify a failure to check a client out of the pool.
pub(crate) fn map_pool_error(err: PoolError) -> QueryError {
    match err {
        PoolError::Timeout(kind) => {
            QueryError::Timeout(format!("waiting for a pooled postgres connection ({kind:?})"))
        }
        PoolError::Backend(e) => match map_error(e) {
            QueryError::Unknown(e) => QueryError::ConnectionLost(e.to_string()),
            other => other,
        },
        PoolError::Closed => QueryError::AdapterClosed,
        other => QueryError::unknown(other),
    }
}

fn source_is_io(err: &tokio_postgres::Error) -> bool {
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        if cause.is::<std::io::Error>() {
            return true;
        }
        source = cause.source();
    }
    false
}
