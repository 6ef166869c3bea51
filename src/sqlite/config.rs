use std::path::Path;

use rusqlite::Connection;
use tracing::debug;

use super::errors::map_init_error;
use crate::config::SqliteOptions;
use crate::error::InitError;

/// Open the connection and apply the pragmas every session expects.
///
/// Runs on the blocking pool; file-backed databases get their parent directory created.
pub(super) fn open_connection(opts: &SqliteOptions) -> Result<Connection, InitError> {
    if opts.is_file_path() {
        if let Some(parent) = Path::new(&opts.path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    InitError::refused(
                        "sqlite",
                        format!("cannot create directory {}: {e}", parent.display()),
                    )
                })?;
            }
        }
    }

    let conn = Connection::open(&opts.path).map_err(map_init_error)?;
    conn.busy_timeout(opts.busy_timeout())
        .map_err(map_init_error)?;
    if opts.foreign_keys {
        conn.pragma_update(None, "foreign_keys", true)
            .map_err(map_init_error)?;
    }
    if opts.wal && opts.is_file_path() {
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(map_init_error)?;
        debug!(path = %opts.path, journal_mode = %mode, "sqlite journal mode set");
    }
    Ok(conn)
}
