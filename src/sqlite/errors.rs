use rusqlite::ErrorCode;

use crate::error::{InitError, QueryError};

/// Classify a rusqlite failure into the shared taxonomy.
pub(crate) fn map_error(err: rusqlite::Error) -> QueryError {
    if let rusqlite::Error::SqliteFailure(failure, message) = &err {
        let detail = message
            .clone()
            .unwrap_or_else(|| failure.to_string());
        match failure.code {
            ErrorCode::ConstraintViolation => return QueryError::ConstraintViolation(detail),
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                return QueryError::Timeout(format!("sqlite: {detail}"));
            }
            ErrorCode::CannotOpen | ErrorCode::NotADatabase | ErrorCode::SystemIoFailure => {
                return QueryError::ConnectionLost(format!("sqlite: {detail}"));
            }
            _ => {}
        }
    }
    QueryError::unknown(err)
}

pub(crate) fn map_init_error(err: rusqlite::Error) -> InitError {
    InitError::refused("sqlite", err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_is_constraint() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY); INSERT INTO t VALUES (1);")
            .unwrap();
        let err = conn.execute("INSERT INTO t VALUES (1)", []).unwrap_err();
        assert!(matches!(map_error(err), QueryError::ConstraintViolation(_)));
    }

    #[test]
    fn syntax_errors_stay_unknown() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let err = conn.execute_batch("SELEC 1").unwrap_err();
        let mapped = map_error(err);
        assert!(matches!(mapped, QueryError::Unknown(_)));
        assert!(!mapped.poisons_connection());
    }
}
