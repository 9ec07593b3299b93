//! The handle a worker receives for the job it is executing.

use crate::error::Result;
use crate::job::{Job, Params, Stats};
use crate::storage::{SharedStoredJob, Storage};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::Span;

/// Per-execution context passed to a [`Worker`](crate::Worker).
///
/// Parameters and stats are copied when the context is created and are not
/// refreshed afterwards.
pub struct Context {
    storage: Arc<dyn Storage>,
    stored_job: SharedStoredJob,
    params: Params,
    stats: Stats,
    next_interval: Option<Duration>,
    span: Span,
}

impl Context {
    pub fn new(storage: Arc<dyn Storage>, stored_job: SharedStoredJob, job: &Job) -> Self {
        let span = tracing::info_span!("job", id = stored_job.id(), worker = job.worker_name());

        Self {
            storage,
            params: job.worker_params().clone(),
            stats: stored_job.stats().clone(),
            stored_job,
            next_interval: None,
            span,
        }
    }

    /// Gets a parameter, or `None` when the job was submitted without it.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Gets a parameter, falling back to `default` when it is absent.
    pub fn param_or<'a>(&'a self, name: &str, default: &'a Value) -> &'a Value {
        self.params.get(name).unwrap_or(default)
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn stored_job(&self) -> &SharedStoredJob {
        &self.stored_job
    }

    /// Submits a follow-up job to the storage the current job came from.
    pub async fn add_job(&self, job: Job) -> Result<()> {
        self.storage.add_job(job).await
    }

    /// Keeps the current job alive by resetting its time to run.
    pub async fn ping_job(&self) -> Result<()> {
        self.storage.ping_job(&self.stored_job).await
    }

    /// The pause requested before the next job is polled, if any.
    pub fn next_interval(&self) -> Option<Duration> {
        self.next_interval
    }

    pub fn set_next_interval(&mut self, interval: Duration) {
        self.next_interval = Some(interval);
    }

    /// The span the job executes in. Events recorded inside it are tagged
    /// with the job id and worker name.
    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("job_id", &self.stored_job.id())
            .field("params", &self.params)
            .field("stats", &self.stats)
            .field("next_interval", &self.next_interval)
            .finish()
    }
}
