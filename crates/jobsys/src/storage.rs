use crate::error::Result;
use crate::job::{Job, Stats};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;

pub mod beanstalk;
pub mod memory;
pub mod null;

pub use beanstalk::{BeanstalkConnection, BeanstalkStorage, BeanstalkStoredJob, ReservedJob};
pub use memory::{InMemoryStorage, MemoryStoredJob};
pub use null::NullStorage;

/// A job once it has been admitted into a storage.
pub trait StoredJob: Debug + Send + Sync {
    /// The identifier of the job, unique within its storage.
    fn id(&self) -> u64;

    /// Recreates the logical job. Backends holding an encoded payload decode
    /// it here, so malformed payloads surface as errors at this point.
    fn job(&self) -> Result<Job>;

    fn stats(&self) -> &Stats;

    /// Reads a numeric stat. Backends may report numbers either as JSON
    /// numbers or as decimal strings.
    fn stat_u64(&self, key: &str) -> Option<u64> {
        match self.stats().get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// A stored job as handed out by [`Storage::retrieve_job`].
pub type SharedStoredJob = Arc<dyn StoredJob>;

/// Backend storage for jobs
#[async_trait]
pub trait Storage: Send + Sync {
    /// Admit a new job. May be called by a worker while another job runs.
    async fn add_job(&self, job: Job) -> Result<()>;

    /// Retrieve the next job that is ready, or `None` if there is nothing to do.
    async fn retrieve_job(&self) -> Result<Option<SharedStoredJob>>;

    /// Remove a job that completed successfully.
    async fn delete_job(&self, job: &SharedStoredJob) -> Result<()>;

    /// Mark a job as failed. It is never retrieved again.
    async fn fail_job(&self, job: &SharedStoredJob) -> Result<()>;

    /// Make the job available again after `delay` seconds.
    ///
    /// `None` lets the backend pick its own default delay or priority.
    async fn reschedule_job(
        &self,
        job: &SharedStoredJob,
        delay: Option<u32>,
        priority: Option<i32>,
    ) -> Result<()>;

    /// Extend the time a long running job may take before it is considered
    /// abandoned.
    async fn ping_job(&self, job: &SharedStoredJob) -> Result<()>;
}
