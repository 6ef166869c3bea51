use std::time::Duration;

use tokio::sync::oneshot;

use crate::error::QueryError;
use crate::mssql::query::{Reply, Request};

pub(super) enum Command {
    Run {
        request: Request,
        timeout: Duration,
        respond_to: oneshot::Sender<Result<Reply, QueryError>>,
    },
    Ping {
        respond_to: oneshot::Sender<Result<(), QueryError>>,
    },
    Shutdown,
}
