//! Connection configuration and its environment resolver.
//!
//! The JSON shape mirrors the environment layout:
//! ```rust
//! use sql_adapter::config::ConnectionConfig;
//!
//! let cfg = ConnectionConfig::from_json(r#"{ "backend": "sqlite", "path": ":memory:" }"#)?;
//! assert_eq!(cfg.kind(), sql_adapter::BackendKind::Sqlite);
//! # Ok::<(), sql_adapter::InitError>(())
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::InitError;
use crate::types::BackendKind;

const DEFAULT_SQLITE_PATH: &str = "./data/app.db";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_POOL_MIN: usize = 1;
const DEFAULT_POOL_MAX: usize = 10;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MSSQL_QUERY_TIMEOUT_SECS: u64 = 30;

/// Backend selector plus the parameters of that backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum ConnectionConfig {
    #[serde(alias = "sqlite3")]
    Sqlite(SqliteOptions),
    #[serde(alias = "postgresql", alias = "pg")]
    Postgres(PostgresOptions),
    #[serde(alias = "sqlserver")]
    Mssql(MssqlOptions),
    #[serde(rename = "none", alias = "disabled")]
    Disabled,
}

/// Options for the `SQLite` binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteOptions {
    /// File path, `:memory:`, or a `file:` URI.
    pub path: String,
    pub busy_timeout_ms: u64,
    pub wal: bool,
    pub foreign_keys: bool,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            path: DEFAULT_SQLITE_PATH.to_owned(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            wal: true,
            foreign_keys: true,
        }
    }
}

impl SqliteOptions {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// In-memory databases and URIs have no directory to create.
    #[must_use]
    pub fn is_file_path(&self) -> bool {
        self.path != ":memory:" && !self.path.starts_with("file:")
    }
}

/// Options for the `PostgreSQL` binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresOptions {
    /// Full `postgres://` URL; when set, the discrete fields below are ignored.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub dbname: Option<String>,
    pub user: String,
    pub password: Option<String>,
    /// Connections opened at `init`. This is a prewarm only: the pool does not refill
    /// toward it after broken connections are discarded, it just opens new ones on demand.
    pub pool_min: usize,
    pub pool_max: usize,
    pub acquire_timeout_secs: u64,
}

impl Default for PostgresOptions {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_owned(),
            port: 5432,
            dbname: None,
            user: "postgres".to_owned(),
            password: None,
            pool_min: DEFAULT_POOL_MIN,
            pool_max: DEFAULT_POOL_MAX,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PostgresOptions {
    #[must_use]
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

/// Which SQL Server driver path the binding uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MssqlDriver {
    /// Async `tiberius` clients pooled on the caller's runtime.
    #[default]
    Native,
    /// Dedicated worker threads, each with its own connection and runtime.
    Blocking,
}

impl std::str::FromStr for MssqlDriver {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" | "async" | "true" | "1" => Ok(MssqlDriver::Native),
            "blocking" | "fallback" | "sync" | "false" | "0" => Ok(MssqlDriver::Blocking),
            other => Err(format!("unknown MSSQL driver `{other}`")),
        }
    }
}

/// Options for the SQL Server binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MssqlOptions {
    /// ADO.NET connection string, e.g. `server=tcp:localhost,1433;user=sa;password=...`.
    pub dsn: String,
    /// Connections opened at `init`; like the Postgres setting it is never topped up later.
    pub pool_min: usize,
    pub pool_max: usize,
    pub query_timeout_secs: u64,
    pub driver: MssqlDriver,
}

impl Default for MssqlOptions {
    fn default() -> Self {
        Self {
            dsn: String::new(),
            pool_min: DEFAULT_POOL_MIN,
            pool_max: DEFAULT_POOL_MAX,
            query_timeout_secs: DEFAULT_MSSQL_QUERY_TIMEOUT_SECS,
            driver: MssqlDriver::Native,
        }
    }
}

impl MssqlOptions {
    #[must_use]
    pub fn new(dsn: impl Into<String>) -> Self {
        Self {
            dsn: dsn.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

impl ConnectionConfig {
    /// Shorthand for an in-process `SQLite` database at `path`.
    #[must_use]
    pub fn sqlite(path: impl Into<String>) -> Self {
        ConnectionConfig::Sqlite(SqliteOptions::new(path))
    }

    #[must_use]
    pub fn kind(&self) -> BackendKind {
        match self {
            ConnectionConfig::Sqlite(_) => BackendKind::Sqlite,
            ConnectionConfig::Postgres(_) => BackendKind::Postgres,
            ConnectionConfig::Mssql(_) => BackendKind::Mssql,
            ConnectionConfig::Disabled => BackendKind::Disabled,
        }
    }

    /// Parse the JSON form (`{"backend": "...", ...}`).
    ///
    /// # Errors
    /// Returns [`InitError::InvalidConfig`] for malformed JSON or unknown backends.
    pub fn from_json(json: &str) -> Result<Self, InitError> {
        serde_json::from_str(json).map_err(|e| InitError::InvalidConfig(e.to_string()))
    }

    /// Resolve configuration from the process environment.
    ///
    /// # Errors
    /// Returns [`InitError::InvalidConfig`] when a variable is present but malformed.
    pub fn from_env() -> Result<Self, InitError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from any key lookup (the environment in production).
    ///
    /// # Errors
    /// Returns [`InitError::InvalidConfig`] when a value is present but malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, InitError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(&lookup);
        let kind: BackendKind = env.parse("DB_TYPE")?.unwrap_or(BackendKind::Sqlite);

        let config = match kind {
            BackendKind::Sqlite => {
                let defaults = SqliteOptions::default();
                ConnectionConfig::Sqlite(SqliteOptions {
                    path: env.get("SQLITE_PATH").unwrap_or(defaults.path),
                    busy_timeout_ms: env
                        .parse("SQLITE_BUSY_TIMEOUT_MS")?
                        .unwrap_or(defaults.busy_timeout_ms),
                    ..defaults
                })
            }
            BackendKind::Postgres => {
                let defaults = PostgresOptions::default();
                ConnectionConfig::Postgres(PostgresOptions {
                    url: env.get("POSTGRES_URL"),
                    host: env.get("POSTGRES_HOST").unwrap_or(defaults.host),
                    port: env.parse("POSTGRES_PORT")?.unwrap_or(defaults.port),
                    dbname: env.get("POSTGRES_DB"),
                    user: env.get("POSTGRES_USER").unwrap_or(defaults.user),
                    password: env.get("POSTGRES_PASS"),
                    pool_min: env.parse("POSTGRES_POOL_MIN")?.unwrap_or(defaults.pool_min),
                    pool_max: env.parse("POSTGRES_POOL_MAX")?.unwrap_or(defaults.pool_max),
                    acquire_timeout_secs: env
                        .parse("POSTGRES_ACQUIRE_TIMEOUT")?
                        .unwrap_or(defaults.acquire_timeout_secs),
                })
            }
            BackendKind::Mssql => {
                let defaults = MssqlOptions::default();
                ConnectionConfig::Mssql(MssqlOptions {
                    dsn: env.get("MSSQL_DSN").unwrap_or_default(),
                    pool_min: env.parse("MSSQL_POOL_MIN")?.unwrap_or(defaults.pool_min),
                    pool_max: env.parse("MSSQL_POOL_MAX")?.unwrap_or(defaults.pool_max),
                    query_timeout_secs: env
                        .parse("MSSQL_QUERY_TIMEOUT")?
                        .unwrap_or(defaults.query_timeout_secs),
                    driver: env.parse("MSSQL_DRIVER")?.unwrap_or(defaults.driver),
                })
            }
            BackendKind::Disabled => ConnectionConfig::Disabled,
        };
        Ok(config)
    }

    /// Reject configurations that can never produce a working binding.
    ///
    /// # Errors
    /// Returns [`InitError::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> Result<(), InitError> {
        match self {
            ConnectionConfig::Sqlite(opts) => {
                if opts.path.trim().is_empty() {
                    return Err(invalid("SQLite path is empty"));
                }
                Ok(())
            }
            ConnectionConfig::Postgres(opts) => {
                if opts.url.is_none() && opts.dbname.as_deref().is_none_or(str::is_empty) {
                    return Err(invalid("Postgres database name is required"));
                }
                if opts.url.is_none() && opts.host.trim().is_empty() {
                    return Err(invalid("Postgres host is required"));
                }
                validate_pool_bounds("Postgres", opts.pool_min, opts.pool_max)?;
                if opts.acquire_timeout_secs == 0 {
                    return Err(invalid("Postgres acquire timeout must be positive"));
                }
                Ok(())
            }
            ConnectionConfig::Mssql(opts) => {
                if opts.dsn.trim().is_empty() {
                    return Err(invalid("MSSQL DSN is required"));
                }
                validate_pool_bounds("MSSQL", opts.pool_min, opts.pool_max)?;
                if opts.query_timeout_secs == 0 {
                    return Err(invalid("MSSQL query timeout must be positive"));
                }
                Ok(())
            }
            ConnectionConfig::Disabled => Ok(()),
        }
    }
}

fn validate_pool_bounds(backend: &str, min: usize, max: usize) -> Result<(), InitError> {
    if max == 0 {
        return Err(invalid(format!("{backend} pool max must be at least 1")));
    }
    if min > max {
        return Err(invalid(format!(
            "{backend} pool min ({min}) exceeds pool max ({max})"
        )));
    }
    Ok(())
}

fn invalid(msg: impl Into<String>) -> InitError {
    InitError::InvalidConfig(msg.into())
}

struct Lookup<'a, F>(&'a F);

impl<F> Lookup<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn parse<T>(&self, key: &str) -> Result<Option<T>, InitError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|raw| {
                raw.trim()
                    .parse::<T>()
                    .map_err(|e| invalid(format!("{key}={raw:?}: {e}")))
            })
            .transpose()
    }
}
