use deadpool_postgres::{Config as PgConfig, Pool, PoolConfig, Runtime, Timeouts};
use tokio_postgres::NoTls;
use tracing::{debug, info};

use crate::config::PostgresOptions;
use crate::error::InitError;

/// Build the pool and open `pool_min` connections up front.
///
/// A URL wins over the discrete host/port/user fields; the two are never merged.
pub(super) async fn build_pool(opts: &PostgresOptions) -> Result<Pool, InitError> {
    let mut cfg = PgConfig::new();
    if let Some(url) = &opts.url {
        cfg.url = Some(url.clone());
    } else {
        cfg.host = Some(opts.host.clone());
        cfg.port = Some(opts.port);
        cfg.dbname.clone_from(&opts.dbname);
        cfg.user = Some(opts.user.clone());
        cfg.password.clone_from(&opts.password);
    }

    let wait = opts.acquire_timeout();
    cfg.pool = Some(PoolConfig {
        max_size: opts.pool_max,
        timeouts: Timeouts {
            wait: Some(wait),
            create: Some(wait),
            recycle: Some(wait),
        },
        ..PoolConfig::default()
    });

    let pool = cfg
        .create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| InitError::InvalidConfig(format!("postgres pool: {e}")))?;

    prewarm(&pool, opts.pool_min.max(1)).await?;
    info!(
        min = opts.pool_min,
        max = opts.pool_max,
        "postgres pool ready"
    );
    Ok(pool)
}

/// Hold `count` clients at once so the pool really opens that many connections.
async fn prewarm(pool: &Pool, count: usize) -> Result<(), InitError> {
    let mut warm = Vec::with_capacity(count);
    for _ in 0..count {
        let client = pool
            .get()
            .await
            .map_err(|e| InitError::refused("postgres", e))?;
        warm.push(client);
    }
    debug!(connections = warm.len(), "postgres pool prewarmed");
    Ok(())
}
