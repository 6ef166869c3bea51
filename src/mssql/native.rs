use std::fmt;

use deadpool::managed::{Manager, Metrics, RecycleError, RecycleResult};

use super::client::{MssqlClient, connect};

/// Manager for async SQL Server clients (used with Deadpool)
pub(super) struct NativeManager {
    config: tiberius::Config,
}

impl NativeManager {
    pub(super) fn new(config: tiberius::Config) -> Self {
        Self { config }
    }
}

impl fmt::Debug for NativeManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeManager")
            .field("addr", &self.config.get_addr())
            .finish()
    }
}

impl Manager for NativeManager {
    type Type = MssqlClient;
    type Error = tiberius::error::Error;

    async fn create(&self) -> Result<MssqlClient, tiberius::error::Error> {
        connect(&self.config).await
    }

    async fn recycle(
        &self,
        client: &mut MssqlClient,
        _metrics: &Metrics,
    ) -> RecycleResult<tiberius::error::Error> {
        // a connection that can't answer SELECT 1 goes back to create()
        client
            .simple_query("SELECT 1")
            .await
            .map_err(RecycleError::Backend)?
            .into_results()
            .await
            .map_err(RecycleError::Backend)?;
        Ok(())
    }
}
