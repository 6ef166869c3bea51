use std::sync::mpsc::Receiver;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::channel::Command;
use crate::error::QueryError;
use crate::mssql::client::connect;
use crate::mssql::errors::{map_error, timed_out};
use crate::mssql::query::{Request, perform};

/// Worker thread body: connect, report readiness, then serve commands until shutdown.
pub(super) fn run_mssql_worker(
    worker: usize,
    config: &tiberius::Config,
    ready: oneshot::Sender<Result<(), QueryError>>,
    receiver: &Receiver<Command>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            let _ = ready.send(Err(QueryError::ConnectionLost(format!(
                "mssql worker runtime: {e}"
            ))));
            return;
        }
    };

    let mut client = match runtime.block_on(connect(config)) {
        Ok(client) => client,
        Err(e) => {
            let _ = ready.send(Err(map_error(e)));
            return;
        }
    };
    if ready.send(Ok(())).is_err() {
        // the pool gave up waiting for us
        return;
    }

    while let Ok(command) = receiver.recv() {
        match command {
            Command::Shutdown => break,
            Command::Run {
                request,
                timeout,
                respond_to,
            } => {
                let outcome =
                    runtime.block_on(tokio::time::timeout(timeout, perform(&mut client, &request)));
                match outcome {
                    Ok(reply) => {
                        let _ = respond_to.send(reply);
                    }
                    Err(_) => {
                        warn!(worker, "mssql worker query timed out; closing its connection");
                        let _ = respond_to.send(Err(timed_out(timeout)));
                        break;
                    }
                }
            }
            Command::Ping { respond_to } => {
                let ping = Request::Batch {
                    sql: "SELECT 1".to_owned(),
                };
                let result = runtime
                    .block_on(perform(&mut client, &ping))
                    .map(|_| ());
                let _ = respond_to.send(result);
            }
        }
    }
    debug!(worker, "mssql worker exiting");
}
