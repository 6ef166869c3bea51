//! Convenient imports for common functionality.
//!
//! ```rust
//! use sql_adapter::prelude::*;
//! ```

pub use crate::adapter::{Adapter, AdapterStats};
pub use crate::config::{ConnectionConfig, MssqlDriver, MssqlOptions, PostgresOptions, SqliteOptions};
pub use crate::error::{CloseError, InitError, QueryError, TransactionError};
pub use crate::executor::QueryExecutor;
pub use crate::introspection::{clear_all_tables, drop_all_tables, list_tables, table_schema};
pub use crate::params;
pub use crate::results::{Row, Rows};
pub use crate::transaction::{TransactionScope, TxState};
pub use crate::translation::{PlaceholderStyle, bind_named, bind_named_for, translate};
pub use crate::types::{BackendKind, RowValues};
