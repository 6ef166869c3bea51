// SQLite binding - one rusqlite connection shared by every caller
//
// - config: opening the connection and applying pragmas
// - connection: the binding, its lease, and blocking-pool dispatch
// - errors: rusqlite error classification
// - params: RowValues to rusqlite values
// - query: statement execution and row extraction
// - transaction: a lease held for the life of a transaction scope

mod config;
mod connection;
pub(crate) mod errors;
mod params;
mod probe;
mod query;
mod transaction;

pub(crate) use connection::SqliteBinding;
pub(crate) use transaction::SqliteTx;
