use super::{SharedStoredJob, Storage};
use crate::error::Result;
use crate::job::Job;
use async_trait::async_trait;

/// A storage that accepts everything and never has a job to hand out.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStorage;

#[async_trait]
impl Storage for NullStorage {
    async fn add_job(&self, _job: Job) -> Result<()> {
        Ok(())
    }

    async fn retrieve_job(&self) -> Result<Option<SharedStoredJob>> {
        Ok(None)
    }

    async fn delete_job(&self, _job: &SharedStoredJob) -> Result<()> {
        Ok(())
    }

    async fn fail_job(&self, _job: &SharedStoredJob) -> Result<()> {
        Ok(())
    }

    async fn reschedule_job(
        &self,
        _job: &SharedStoredJob,
        _delay: Option<u32>,
        _priority: Option<i32>,
    ) -> Result<()> {
        Ok(())
    }

    async fn ping_job(&self, _job: &SharedStoredJob) -> Result<()> {
        Ok(())
    }
}
