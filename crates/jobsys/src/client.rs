use crate::context::Context;
use crate::error::{JobError, Result};
use crate::memory::{MemoryProbe, ProcessMemory};
use crate::options::ClientOptions;
use crate::storage::{SharedStoredJob, Storage};
use crate::strategy::RescheduleStrategy;
use crate::worker::WorkerRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::Instrument;

/// Called with the client and the error whenever a job fails or the run loop
/// aborts.
pub type ExceptionListener = Box<dyn Fn(&Client, &JobError) + Send + Sync>;

/// Polls a storage and runs every job it hands out, one at a time.
pub struct Client {
    options: ClientOptions,
    storage: Arc<dyn Storage>,
    workers: Arc<dyn WorkerRegistry>,
    exception_listeners: Vec<ExceptionListener>,
    memory_probe: Arc<dyn MemoryProbe>,
}

impl Client {
    pub fn new(
        options: ClientOptions,
        storage: Arc<dyn Storage>,
        workers: Arc<dyn WorkerRegistry>,
    ) -> Self {
        Self {
            options,
            storage,
            workers,
            exception_listeners: Vec::new(),
            memory_probe: Arc::new(ProcessMemory::new()),
        }
    }

    /// Replace how memory usage is measured for the maximum memory limit.
    pub fn with_memory_probe(mut self, probe: Arc<dyn MemoryProbe>) -> Self {
        self.memory_probe = probe;
        self
    }

    /// Register a listener for failed jobs and fatal errors.
    ///
    /// Listeners run in registration order and must not panic.
    pub fn add_exception_listener<F>(&mut self, listener: F)
    where
        F: Fn(&Client, &JobError) + Send + Sync + 'static,
    {
        self.exception_listeners.push(Box::new(listener));
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Run until the lifetime or memory limit is reached.
    ///
    /// Returns the process exit code: `0` when the client stopped on its own,
    /// `1` when polling the storage failed.
    pub async fn run(&self) -> i32 {
        let started = Instant::now();
        tracing::info!(
            lifetime_secs = self.options.lifetime().as_secs(),
            interval_us = self.options.interval().as_micros() as u64,
            "Client started"
        );

        loop {
            let pause = match self.process_next_job().await {
                Ok(next_interval) => next_interval.unwrap_or(self.options.interval()),
                Err(e) => {
                    self.report(&e);
                    return 1;
                }
            };

            // Allow the storage to breathe
            tokio::time::sleep(pause).await;

            if !self.should_keep_running(started) {
                break;
            }
        }

        tracing::info!(
            elapsed_secs = started.elapsed().as_secs(),
            "Client stopped"
        );
        0
    }

    /// Retrieve and process a single job, if one is ready.
    ///
    /// A job that fails is rescheduled or marked as failed and does not make
    /// this return an error; only storage failures do. On success, returns
    /// the pause the worker asked for before the next poll, if any.
    pub async fn process_next_job(&self) -> Result<Option<Duration>> {
        match self.storage.retrieve_job().await? {
            Some(stored) => self.process_job(stored).await,
            None => Ok(None),
        }
    }

    fn should_keep_running(&self, started: Instant) -> bool {
        if started.elapsed() >= self.options.lifetime() {
            return false;
        }

        match self.options.maximum_memory_usage() {
            Some(maximum) => self.memory_probe.current_usage() < maximum,
            None => true,
        }
    }

    async fn process_job(&self, stored: SharedStoredJob) -> Result<Option<Duration>> {
        let mut next_interval = None;

        match self.execute_job(&stored, &mut next_interval).await {
            Ok(()) => {}
            Err(err @ JobError::Recoverable { .. }) => {
                self.report(&err);

                let strategy = err
                    .reschedule_strategy()
                    .or(self.options.reschedule_strategy());
                self.reschedule_job(&stored, strategy, &err).await?;
            }
            Err(err) => {
                self.fail_job(&stored, &err).await?;
                self.report(&err);
            }
        }

        Ok(next_interval)
    }

    async fn execute_job(
        &self,
        stored: &SharedStoredJob,
        next_interval: &mut Option<Duration>,
    ) -> Result<()> {
        let job = stored.job()?;
        let params = serde_json::to_string(job.worker_params())?;

        tracing::info!(
            job_id = stored.id(),
            worker = job.worker_name(),
            params = %params,
            "[#{}] Job \"{}\" started",
            stored.id(),
            job.worker_name()
        );

        if !self.workers.has(job.worker_name()) {
            return Err(JobError::UnknownWorker(job.worker_name().to_string()));
        }
        let worker = self
            .workers
            .get(job.worker_name())
            .ok_or_else(|| JobError::UnknownWorker(job.worker_name().to_string()))?;

        let mut ctx = Context::new(Arc::clone(&self.storage), Arc::clone(stored), &job);
        let span = ctx.span().clone();
        let outcome = worker.run(&mut ctx).instrument(span).await;
        *next_interval = ctx.next_interval();
        outcome?;

        self.storage.delete_job(stored).await?;

        tracing::info!(
            job_id = stored.id(),
            "[#{}] Finished and successfully deleted job",
            stored.id()
        );
        Ok(())
    }

    async fn reschedule_job(
        &self,
        stored: &SharedStoredJob,
        strategy: Option<&Arc<dyn RescheduleStrategy>>,
        error: &JobError,
    ) -> Result<()> {
        tracing::error!(
            job_id = stored.id(),
            "[#{}] Rescheduling job: {}",
            stored.id(),
            error
        );

        let delay = strategy.map(|s| s.determine_delay(&**stored));
        let priority = strategy.map(|s| s.determine_priority(&**stored));

        self.storage.reschedule_job(stored, delay, priority).await
    }

    async fn fail_job(&self, stored: &SharedStoredJob, error: &JobError) -> Result<()> {
        tracing::error!(
            job_id = stored.id(),
            "[#{}] Job failed: {}",
            stored.id(),
            error
        );

        self.storage.fail_job(stored).await
    }

    fn report(&self, error: &JobError) {
        tracing::error!(error = ?error, "{}", error);

        for listener in &self.exception_listeners {
            listener(self, error);
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("options", &self.options)
            .field("exception_listeners", &self.exception_listeners.len())
            .finish_non_exhaustive()
    }
}
