//! Runtime-switchable database access over `SQLite`, `PostgreSQL`, SQL Server, or no
//! database at all.
//!
//! One [`Adapter`] owns exactly one backend, picked by a [`ConnectionConfig`] at
//! [`Adapter::init`]. Queries are written once with neutral `?` placeholders and translated
//! for whichever backend is live.
//!
//! ```rust,no_run
//! use sql_adapter::prelude::*;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Adapter::new();
//! db.init(ConnectionConfig::sqlite(":memory:")).await?;
//! db.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)").await?;
//!
//! let mut tx = db.transaction().await?;
//! tx.execute("INSERT INTO users (name) VALUES (?)", &params!["a"]).await?;
//! tx.commit().await?;
//!
//! let row = db.fetch_one("SELECT name FROM users WHERE id = ?", &params![1]).await?;
//! assert_eq!(row.unwrap().get("name").and_then(RowValues::as_text), Some("a"));
//! db.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Backends are cargo features: `sqlite` and `postgres` are on by default, `mssql` is opt-in.

#[cfg(not(any(feature = "sqlite", feature = "postgres", feature = "mssql")))]
compile_error!("enable at least one of the `sqlite`, `postgres`, or `mssql` features");

pub mod prelude;

mod adapter;
mod binding;
pub mod config;
mod disabled;
pub mod error;
mod executor;
pub mod introspection;
pub mod results;
mod transaction;
pub mod translation;
pub mod types;

#[cfg(feature = "mssql")]
mod mssql;
#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use adapter::{Adapter, AdapterStats};
pub use config::{ConnectionConfig, MssqlDriver, MssqlOptions, PostgresOptions, SqliteOptions};
pub use error::{CloseError, InitError, QueryError, TransactionError};
pub use executor::QueryExecutor;
pub use results::{Row, Rows};
pub use transaction::{TransactionScope, TxState};
pub use translation::{bind_named, bind_named_for, translate};
pub use types::{BackendKind, RowValues};
