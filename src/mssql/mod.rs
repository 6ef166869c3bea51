// SQL Server binding via Tiberius
//
// - client: TCP + TDS connection setup
// - config: DSN parsing and pool construction for both driver paths
// - connection: the binding, its pools, and per-call checkout
// - errors: server error number classification
// - native: deadpool manager for async clients
// - params: RowValues bound onto tiberius queries
// - query: the request/reply vocabulary shared by both paths
// - transaction: a checked-out connection held for the life of a scope
// - worker: dedicated threads each owning one client and a private runtime

mod client;
mod config;
mod connection;
pub(crate) mod errors;
mod native;
mod params;
mod query;
mod transaction;
mod worker;

pub(crate) use connection::MssqlBinding;
pub(crate) use transaction::MssqlTx;
