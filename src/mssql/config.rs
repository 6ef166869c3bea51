use deadpool::Runtime;
use deadpool::managed::Pool;
use tracing::{debug, info};

use super::connection::MssqlPool;
use super::native::NativeManager;
use super::worker::WorkerManager;
use crate::config::{MssqlDriver, MssqlOptions};
use crate::error::InitError;

/// Parse an ADO.NET connection string (`server=tcp:host,1433;user=...;password=...`).
pub(super) fn parse_dsn(dsn: &str) -> Result<tiberius::Config, InitError> {
    tiberius::Config::from_ado_string(dsn)
        .map_err(|e| InitError::InvalidConfig(format!("mssql dsn: {e}")))
}

/// Build the pool for the configured driver path and open `pool_min` connections.
pub(super) async fn build_pool(opts: &MssqlOptions) -> Result<MssqlPool, InitError> {
    let config = parse_dsn(&opts.dsn)?;
    let limit = Some(opts.query_timeout());

    let pool = match opts.driver {
        MssqlDriver::Native => MssqlPool::Native(
            Pool::builder(NativeManager::new(config))
                .max_size(opts.pool_max)
                .wait_timeout(limit)
                .create_timeout(limit)
                .recycle_timeout(limit)
                .runtime(Runtime::Tokio1)
                .build()
                .map_err(|e| InitError::InvalidConfig(format!("mssql pool: {e}")))?,
        ),
        MssqlDriver::Blocking => MssqlPool::Blocking(
            Pool::builder(WorkerManager::new(config))
                .max_size(opts.pool_max)
                .wait_timeout(limit)
                .create_timeout(limit)
                .recycle_timeout(limit)
                .runtime(Runtime::Tokio1)
                .build()
                .map_err(|e| InitError::InvalidConfig(format!("mssql pool: {e}")))?,
        ),
    };

    let count = opts.pool_min.max(1);
    let mut warm = Vec::with_capacity(count);
    for _ in 0..count {
        warm.push(
            pool.checkout()
                .await
                .map_err(|e| InitError::refused("mssql", e))?,
        );
    }
    debug!(connections = warm.len(), "mssql pool prewarmed");
    drop(warm);

    info!(
        driver = ?opts.driver,
        min = opts.pool_min,
        max = opts.pool_max,
        "mssql pool ready"
    );
    Ok(pool)
}
