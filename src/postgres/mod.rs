// PostgreSQL binding - a deadpool-postgres pool of tokio-postgres clients
//
// - config: pool construction and prewarming
// - connection: the binding and per-call acquire/release
// - errors: SQLSTATE and pool error classification
// - params: RowValues as tokio-postgres parameters
// - query: prepared execution and row extraction
// - transaction: a pooled client held for the life of a scope

mod config;
mod connection;
pub(crate) mod errors;
mod params;
mod query;
mod transaction;

pub(crate) use connection::PostgresBinding;
pub(crate) use transaction::PostgresTx;
