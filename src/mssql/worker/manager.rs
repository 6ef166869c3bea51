use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::Duration;

use deadpool::managed::{Manager, Metrics, RecycleError, RecycleResult};
use tokio::sync::oneshot;
use tracing::debug;

use super::channel::Command;
use super::dispatcher::run_mssql_worker;
use crate::error::QueryError;
use crate::mssql::errors::timed_out;
use crate::mssql::query::{Reply, Request};

/// Extra time the caller waits beyond the worker's own timeout before giving up on it.
const REPLY_GRACE: Duration = Duration::from_secs(1);

/// Handle to one worker thread; dropping it shuts the thread down.
pub(in crate::mssql) struct WorkerHandle {
    sender: Sender<Command>,
    id: usize,
}

impl WorkerHandle {
    fn send(&self, command: Command) -> Result<(), QueryError> {
        self.sender
            .send(command)
            .map_err(|_| worker_gone(self.id))
    }

    pub(in crate::mssql) async fn call(&self, request: Request, timeout: Duration) -> Result<Reply, QueryError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Run {
            request,
            timeout,
            respond_to: tx,
        })?;
        match tokio::time::timeout(timeout + REPLY_GRACE, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Err(worker_gone(self.id)),
            Err(_) => Err(timed_out(timeout)),
        }
    }

    async fn ping(&self) -> Result<(), QueryError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Ping { respond_to: tx })?;
        rx.await.map_err(|_| worker_gone(self.id))?
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        let _ = self.sender.send(Command::Shutdown);
    }
}

fn worker_gone(id: usize) -> QueryError {
    QueryError::ConnectionLost(format!("mssql worker {id} exited"))
}

/// Manager for worker threads (used with Deadpool)
pub(in crate::mssql) struct WorkerManager {
    config: tiberius::Config,
    next_id: AtomicUsize,
}

impl WorkerManager {
    pub(in crate::mssql) fn new(config: tiberius::Config) -> Self {
        Self {
            config,
            next_id: AtomicUsize::new(1),
        }
    }
}

impl fmt::Debug for WorkerManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerManager")
            .field("addr", &self.config.get_addr())
            .field("spawned", &self.next_id.load(Ordering::Relaxed).saturating_sub(1))
            .finish()
    }
}

impl Manager for WorkerManager {
    type Type = WorkerHandle;
    type Error = QueryError;

    async fn create(&self) -> Result<WorkerHandle, QueryError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel::<Command>();
        let (ready_tx, ready_rx) = oneshot::channel();
        let config = self.config.clone();
        thread::Builder::new()
            .name(format!("mssql-worker-{id}"))
            .spawn(move || run_mssql_worker(id, &config, ready_tx, &receiver))
            .map_err(|err| {
                QueryError::ConnectionLost(format!("failed to spawn mssql worker thread: {err}"))
            })?;

        ready_rx.await.map_err(|_| worker_gone(id))??;
        debug!(worker = id, "mssql worker connected");
        Ok(WorkerHandle { sender, id })
    }

    async fn recycle(&self, handle: &mut WorkerHandle, _metrics: &Metrics) -> RecycleResult<QueryError> {
        handle.ping().await.map_err(RecycleError::Backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_server_fails_creation() {
        let mut config = tiberius::Config::new();
        config.host("127.0.0.1");
        config.port(1);
        let manager = WorkerManager::new(config);
        let err = manager.create().await.err().expect("nothing listens on port 1");
        assert!(err.poisons_connection(), "unexpected error: {err}");
    }
}
