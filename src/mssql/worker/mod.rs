// Blocking fallback: each pooled object is a thread that owns one tiberius client and a
// current-thread runtime. Callers talk to it over a channel, so slow driver calls never
// run on the caller's executor.

mod channel;
mod dispatcher;
mod manager;

pub(super) use manager::WorkerManager;
