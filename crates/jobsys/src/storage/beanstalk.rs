//! Storage on top of a beanstalk-like work queue.
//!
//! The queue itself is reached through [`BeanstalkConnection`], which exposes
//! the handful of primitives the adapter needs: put into a tube, reserve with a
//! timeout, delete, bury, release and touch. Jobs travel as a JSON document
//! `{"type": <worker>, "time": <unix seconds>, "data": <params>}`; the queue
//! name, delay, time to run and priority are recovered from the job stats the
//! server reports.
//!
//! Native priorities are "lower runs sooner" around [`DEFAULT_PRIORITY`]; job
//! priorities are "higher runs sooner", so the two are mirrored around it.

use super::{SharedStoredJob, Storage, StoredJob};
use crate::error::{JobError, Result};
use crate::job::{Job, Params, Stats};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_TUBE: &str = "default";
pub const DEFAULT_PRIORITY: u32 = 1024;
pub const DEFAULT_DELAY: u32 = 0;
pub const DEFAULT_TTR: u32 = 60;

/// Extra delay (in seconds) added when a job is rescheduled without one.
pub const RESCHEDULE_DELAY: u32 = 60;

/// A job reserved from the queue server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedJob {
    pub id: u64,
    pub data: String,
}

/// The queue server operations used by [`BeanstalkStorage`].
#[async_trait]
pub trait BeanstalkConnection: Send + Sync {
    /// Submit a job and return its id.
    async fn put_in_tube(
        &self,
        tube: &str,
        data: &str,
        priority: u32,
        delay: u32,
        ttr: u32,
    ) -> Result<u64>;

    /// Wait up to `timeout` for a ready job.
    async fn reserve(&self, timeout: Duration) -> Result<Option<ReservedJob>>;

    async fn delete(&self, id: u64) -> Result<()>;

    async fn bury(&self, id: u64) -> Result<()>;

    async fn release(&self, id: u64, priority: u32, delay: u32) -> Result<()>;

    async fn touch(&self, id: u64) -> Result<()>;

    /// Server statistics of a job (`tube`, `pri`, `delay`, `ttr`, `releases`, ...).
    async fn stats_job(&self, id: u64) -> Result<Stats>;
}

#[derive(Serialize)]
struct Envelope<'a> {
    #[serde(rename = "type")]
    worker: &'a str,
    time: f64,
    data: &'a Params,
}

/// A reserved job whose payload is decoded lazily.
#[derive(Debug, Clone)]
pub struct BeanstalkStoredJob {
    id: u64,
    data: String,
    stats: Stats,
}

impl BeanstalkStoredJob {
    pub fn new(id: u64, data: impl Into<String>, stats: Stats) -> Self {
        Self {
            id,
            data: data.into(),
            stats,
        }
    }

    /// The raw payload as stored on the server.
    pub fn data(&self) -> &str {
        &self.data
    }

    fn invalid(&self, reason: &str) -> JobError {
        JobError::InvalidPayload(format!("{} in \"{}\"", reason, self.data))
    }

    fn stat_u32(&self, key: &str) -> Option<u32> {
        self.stat_u64(key).and_then(|v| u32::try_from(v).ok())
    }
}

impl StoredJob for BeanstalkStoredJob {
    fn id(&self) -> u64 {
        self.id
    }

    fn job(&self) -> Result<Job> {
        let payload = match serde_json::from_str::<Value>(&self.data) {
            Ok(Value::Object(payload)) => payload,
            _ => {
                return Err(JobError::InvalidPayload(format!(
                    "Invalid JSON, got \"{}\"",
                    self.data
                )))
            }
        };

        let worker = match payload.get("type") {
            Some(Value::String(worker)) => worker.clone(),
            Some(_) => return Err(self.invalid("Invalid \"type\" field")),
            None => return Err(self.invalid("Missing \"type\" field")),
        };

        let params = match payload.get("data") {
            Some(Value::Object(params)) => params.clone(),
            // an empty parameter list may have been encoded as an array
            Some(Value::Array(items)) if items.is_empty() => Params::new(),
            Some(_) => return Err(self.invalid("Invalid \"data\" field")),
            None => return Err(self.invalid("Missing \"data\" field")),
        };

        let mut job = Job::new(worker, params);
        if let Some(tube) = self.stats.get("tube").and_then(Value::as_str) {
            job = job.with_queue(tube);
        }
        job.set_delay(self.stat_u32("delay"));
        job.set_time_to_run(self.stat_u32("ttr"));
        if let Some(pri) = self.stat_u64("pri") {
            job.set_priority(job_priority(pri));
        }

        Ok(job)
    }

    fn stats(&self) -> &Stats {
        &self.stats
    }
}

/// Storage backed by a beanstalk-like queue server.
#[derive(Debug, Clone)]
pub struct BeanstalkStorage<C> {
    connection: C,
    reserve_timeout: Duration,
}

impl<C: BeanstalkConnection> BeanstalkStorage<C> {
    /// Wraps a connection with a reserve timeout of one second.
    pub fn new(connection: C) -> Self {
        Self::with_reserve_timeout(connection, Duration::from_secs(1))
    }

    pub fn with_reserve_timeout(connection: C, reserve_timeout: Duration) -> Self {
        Self {
            connection,
            reserve_timeout,
        }
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// How long [`Storage::retrieve_job`] waits for a job.
    pub fn reserve_timeout(&self) -> Duration {
        self.reserve_timeout
    }

    pub fn set_reserve_timeout(&mut self, reserve_timeout: Duration) {
        self.reserve_timeout = reserve_timeout;
    }
}

#[async_trait]
impl<C: BeanstalkConnection> Storage for BeanstalkStorage<C> {
    async fn add_job(&self, job: Job) -> Result<()> {
        let tube = job.queue_name().unwrap_or(DEFAULT_TUBE);
        let data = serde_json::to_string(&Envelope {
            worker: job.worker_name(),
            time: chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0,
            data: job.worker_params(),
        })?;

        let id = self
            .connection
            .put_in_tube(
                tube,
                &data,
                native_priority(job.priority()),
                job.delay().unwrap_or(DEFAULT_DELAY),
                job.time_to_run()
                    .filter(|&ttr| ttr > 0)
                    .unwrap_or(DEFAULT_TTR),
            )
            .await?;

        tracing::debug!(job_id = id, tube, "Job submitted");
        Ok(())
    }

    async fn retrieve_job(&self) -> Result<Option<SharedStoredJob>> {
        let Some(reserved) = self.connection.reserve(self.reserve_timeout).await? else {
            return Ok(None);
        };

        let stats = self.connection.stats_job(reserved.id).await?;
        Ok(Some(Arc::new(BeanstalkStoredJob::new(
            reserved.id,
            reserved.data,
            stats,
        ))))
    }

    async fn delete_job(&self, job: &SharedStoredJob) -> Result<()> {
        self.connection.delete(job.id()).await
    }

    async fn fail_job(&self, job: &SharedStoredJob) -> Result<()> {
        self.connection.bury(job.id()).await
    }

    async fn reschedule_job(
        &self,
        job: &SharedStoredJob,
        delay: Option<u32>,
        priority: Option<i32>,
    ) -> Result<()> {
        let logical = job.job()?;
        let priority = priority.unwrap_or_else(|| logical.priority());
        let delay = delay.unwrap_or_else(|| {
            logical
                .delay()
                .unwrap_or(DEFAULT_DELAY)
                .saturating_add(RESCHEDULE_DELAY)
        });

        self.connection
            .release(job.id(), native_priority(priority), delay)
            .await
    }

    async fn ping_job(&self, job: &SharedStoredJob) -> Result<()> {
        self.connection.touch(job.id()).await
    }
}

fn native_priority(priority: i32) -> u32 {
    let native = i64::from(DEFAULT_PRIORITY) - i64::from(priority);
    native.clamp(0, i64::from(u32::MAX)) as u32
}

fn job_priority(native: u64) -> i32 {
    let native = i64::try_from(native).unwrap_or(i64::MAX);
    let priority = i64::from(DEFAULT_PRIORITY).saturating_sub(native);
    priority.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
