use super::{SharedStoredJob, Storage, StoredJob};
use crate::error::{JobError, Result};
use crate::job::{Job, Stats};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// A job held by [`InMemoryStorage`].
///
/// Rescheduling creates a new record with the same id and an incremented
/// `releases` stat; existing records are never mutated.
#[derive(Debug, Clone)]
pub struct MemoryStoredJob {
    id: u64,
    job: Job,
    stats: Stats,
}

impl MemoryStoredJob {
    pub(crate) fn new(id: u64, job: Job) -> Self {
        Self::with_releases(id, job, 0)
    }

    fn with_releases(id: u64, job: Job, releases: u64) -> Self {
        let mut stats = Stats::new();
        stats.insert("id".into(), id.into());
        stats.insert(
            "queue".into(),
            job.queue_name().unwrap_or("default").into(),
        );
        stats.insert("releases".into(), releases.into());

        Self { id, job, stats }
    }
}

impl StoredJob for MemoryStoredJob {
    fn id(&self) -> u64 {
        self.id
    }

    fn job(&self) -> Result<Job> {
        Ok(self.job.clone())
    }

    fn stats(&self) -> &Stats {
        &self.stats
    }
}

#[derive(Debug)]
struct DelayedJob {
    stored: SharedStoredJob,
    ready_at: Instant,
}

impl DelayedJob {
    fn new(stored: SharedStoredJob, delay: u32) -> Self {
        Self {
            stored,
            ready_at: Instant::now() + Duration::from_secs(u64::from(delay)),
        }
    }

    fn is_ready(&self) -> bool {
        self.ready_at <= Instant::now()
    }
}

#[derive(Debug, Default)]
struct Queues {
    last_id: u64,
    ready: VecDeque<SharedStoredJob>,
    failed: VecDeque<SharedStoredJob>,
    /// Rescheduled jobs, in reschedule order
    delayed: VecDeque<DelayedJob>,
    /// Jobs added with a delay, sorted by ready-at time
    scheduled: VecDeque<DelayedJob>,
}

impl Queues {
    fn schedule(&mut self, job: DelayedJob) {
        let index = self
            .scheduled
            .partition_point(|queued| queued.ready_at <= job.ready_at);
        self.scheduled.insert(index, job);
    }

    /// Moves scheduled jobs whose delay has elapsed to the back of the ready
    /// queue.
    fn promote_scheduled(&mut self) {
        let now = Instant::now();
        let due = self.scheduled.partition_point(|queued| queued.ready_at <= now);
        self.ready
            .extend(self.scheduled.drain(..due).map(|queued| queued.stored));
    }
}

/// In-memory job storage (not persistent, single process only).
///
/// Rescheduled jobs are kept in reschedule order: only the head of that
/// queue is checked for readiness and priorities never reorder it. Jobs added
/// with a delay wait separately and join the ready queue once due.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    queues: Arc<Mutex<Queues>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jobs that have been marked as failed, oldest first.
    pub fn failed_jobs(&self) -> Result<Vec<SharedStoredJob>> {
        Ok(self.queues()?.failed.iter().cloned().collect())
    }

    /// Number of jobs that have not been handed out yet, delayed ones included.
    pub fn pending(&self) -> Result<usize> {
        let queues = self.queues()?;
        Ok(queues.ready.len() + queues.delayed.len() + queues.scheduled.len())
    }

    fn queues(&self) -> Result<MutexGuard<'_, Queues>> {
        self.queues
            .lock()
            .map_err(|_| JobError::Backend("Lock poisoned".to_string()))
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn add_job(&self, job: Job) -> Result<()> {
        let mut q = self.queues()?;
        q.promote_scheduled();
        q.last_id += 1;
        let delay = job.delay().unwrap_or(0);
        let stored: SharedStoredJob = Arc::new(MemoryStoredJob::new(q.last_id, job));

        if delay > 0 {
            q.schedule(DelayedJob::new(stored, delay));
        } else {
            q.ready.push_back(stored);
        }
        Ok(())
    }

    async fn retrieve_job(&self) -> Result<Option<SharedStoredJob>> {
        let mut q = self.queues()?;
        q.promote_scheduled();

        if q.delayed.front().is_some_and(DelayedJob::is_ready) {
            return Ok(q.delayed.pop_front().map(|delayed| delayed.stored));
        }

        Ok(q.ready.pop_front())
    }

    async fn delete_job(&self, job: &SharedStoredJob) -> Result<()> {
        let id = job.id();
        let mut q = self.queues()?;

        if let Some(index) = q.ready.iter().position(|j| j.id() == id) {
            q.ready.remove(index);
        } else if let Some(index) = q.failed.iter().position(|j| j.id() == id) {
            q.failed.remove(index);
        } else if let Some(index) = q.delayed.iter().position(|d| d.stored.id() == id) {
            q.delayed.remove(index);
        } else if let Some(index) = q.scheduled.iter().position(|d| d.stored.id() == id) {
            q.scheduled.remove(index);
        }
        Ok(())
    }

    async fn fail_job(&self, job: &SharedStoredJob) -> Result<()> {
        self.queues()?.failed.push_back(Arc::clone(job));
        Ok(())
    }

    async fn reschedule_job(
        &self,
        job: &SharedStoredJob,
        delay: Option<u32>,
        priority: Option<i32>,
    ) -> Result<()> {
        let mut logical = job.job()?;
        if let Some(priority) = priority {
            logical.set_priority(priority);
        }
        let releases = job.stat_u64("releases").unwrap_or(0);

        let readmitted: SharedStoredJob = Arc::new(MemoryStoredJob::with_releases(
            job.id(),
            logical,
            releases + 1,
        ));

        self.queues()?
            .delayed
            .push_back(DelayedJob::new(readmitted, delay.unwrap_or(0)));
        Ok(())
    }

    async fn ping_job(&self, _job: &SharedStoredJob) -> Result<()> {
        // No lease to extend
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Params;
    use proptest::prelude::*;
    use serde_json::json;

    fn job(name: &str) -> Job {
        Job::new(name, Params::new())
    }

    async fn next_name(storage: &InMemoryStorage) -> Option<String> {
        storage
            .retrieve_job()
            .await
            .unwrap()
            .map(|stored| stored.job().unwrap().worker_name().to_string())
    }

    #[tokio::test]
    async fn test_empty_storage_returns_none() {
        let storage = InMemoryStorage::new();
        assert!(storage.retrieve_job().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let storage = InMemoryStorage::new();
        storage.add_job(job("a")).await.unwrap();
        storage.add_job(job("b")).await.unwrap();

        let first = storage.retrieve_job().await.unwrap().unwrap();
        let second = storage.retrieve_job().await.unwrap().unwrap();
        assert_eq!(first.id(), 1);
        assert_eq!(second.id(), 2);
        assert_eq!(first.stats()["releases"], json!(0));
        assert_eq!(first.stats()["queue"], json!("default"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_job_waits_for_its_delay() {
        let storage = InMemoryStorage::new();
        storage.add_job(job("later").with_delay(10)).await.unwrap();
        storage.add_job(job("now")).await.unwrap();

        assert_eq!(next_name(&storage).await.as_deref(), Some("now"));
        assert_eq!(next_name(&storage).await, None);

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(next_name(&storage).await, None);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(next_name(&storage).await.as_deref(), Some("later"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_delayed_job_goes_before_ready_queue() {
        let storage = InMemoryStorage::new();
        storage.add_job(job("retry")).await.unwrap();
        let stored = storage.retrieve_job().await.unwrap().unwrap();
        storage.add_job(job("fresh")).await.unwrap();

        storage.reschedule_job(&stored, Some(5), None).await.unwrap();
        assert_eq!(next_name(&storage).await.as_deref(), Some("fresh"));

        storage.add_job(job("fresh-2")).await.unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(next_name(&storage).await.as_deref(), Some("retry"));
        assert_eq!(next_name(&storage).await.as_deref(), Some("fresh-2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_add_does_not_hold_back_reschedules() {
        let storage = InMemoryStorage::new();
        storage.add_job(job("retry")).await.unwrap();
        let stored = storage.retrieve_job().await.unwrap().unwrap();

        storage.add_job(job("later").with_delay(3600)).await.unwrap();
        storage.reschedule_job(&stored, Some(0), None).await.unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;

        assert_eq!(next_name(&storage).await.as_deref(), Some("retry"));
        assert_eq!(next_name(&storage).await, None);
        assert_eq!(storage.pending().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_adds_become_ready_by_delay() {
        let storage = InMemoryStorage::new();
        storage.add_job(job("slow").with_delay(20)).await.unwrap();
        storage.add_job(job("fast").with_delay(10)).await.unwrap();

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(next_name(&storage).await.as_deref(), Some("fast"));
        assert_eq!(next_name(&storage).await, None);

        tokio::time::advance(Duration::from_secs(10)).await;
        storage.add_job(job("now")).await.unwrap();
        assert_eq!(next_name(&storage).await.as_deref(), Some("slow"));
        assert_eq!(next_name(&storage).await.as_deref(), Some("now"));
    }

    #[tokio::test]
    async fn test_reschedule_without_delay_is_ready_immediately() {
        let storage = InMemoryStorage::new();
        storage.add_job(job("a").with_priority(1)).await.unwrap();
        let stored = storage.retrieve_job().await.unwrap().unwrap();

        storage.reschedule_job(&stored, None, Some(9)).await.unwrap();

        let again = storage.retrieve_job().await.unwrap().unwrap();
        assert_eq!(again.id(), stored.id());
        assert_eq!(again.stats()["releases"], json!(1));
        assert_eq!(again.job().unwrap().priority(), 9);
        // the original record is left untouched
        assert_eq!(stored.stats()["releases"], json!(0));
        assert_eq!(stored.job().unwrap().priority(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_queue_ignores_priority() {
        let storage = InMemoryStorage::new();
        storage.add_job(job("low")).await.unwrap();
        storage.add_job(job("high")).await.unwrap();
        let low = storage.retrieve_job().await.unwrap().unwrap();
        let high = storage.retrieve_job().await.unwrap().unwrap();

        storage.reschedule_job(&low, Some(1), Some(0)).await.unwrap();
        storage.reschedule_job(&high, Some(1), Some(100)).await.unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;

        assert_eq!(next_name(&storage).await.as_deref(), Some("low"));
        assert_eq!(next_name(&storage).await.as_deref(), Some("high"));
    }

    #[tokio::test]
    async fn test_failed_job_is_never_retrieved() {
        let storage = InMemoryStorage::new();
        storage.add_job(job("broken")).await.unwrap();
        let stored = storage.retrieve_job().await.unwrap().unwrap();

        storage.fail_job(&stored).await.unwrap();

        assert!(storage.retrieve_job().await.unwrap().is_none());
        let failed = storage.failed_jobs().unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].id(), stored.id());
    }

    #[tokio::test]
    async fn test_delete_removes_from_any_queue() {
        let storage = InMemoryStorage::new();
        storage.add_job(job("a")).await.unwrap();
        storage.add_job(job("b")).await.unwrap();
        let a = storage.retrieve_job().await.unwrap().unwrap();

        storage.fail_job(&a).await.unwrap();
        storage.delete_job(&a).await.unwrap();
        assert!(storage.failed_jobs().unwrap().is_empty());

        storage.reschedule_job(&a, Some(60), None).await.unwrap();
        assert_eq!(storage.pending().unwrap(), 2);
        storage.delete_job(&a).await.unwrap();
        assert_eq!(storage.pending().unwrap(), 1);

        assert_eq!(next_name(&storage).await.as_deref(), Some("b"));
        assert_eq!(next_name(&storage).await, None);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_jobs_without_delay_are_fifo(names in prop::collection::vec("[a-z]{1,8}", 1..20)) {
            tokio::runtime::Runtime::new().unwrap().block_on(async {
                let storage = InMemoryStorage::new();
                for name in &names {
                    storage.add_job(job(name)).await.unwrap();
                }

                let mut retrieved = Vec::new();
                while let Some(name) = next_name(&storage).await {
                    retrieved.push(name);
                }

                prop_assert_eq!(retrieved, names);
                Ok(())
            })?;
        }

        #[test]
        fn prop_deleted_jobs_never_reappear(count in 1usize..10, deleted in 0usize..10) {
            tokio::runtime::Runtime::new().unwrap().block_on(async {
                let storage = InMemoryStorage::new();
                for i in 0..count {
                    storage.add_job(job(&format!("job-{}", i))).await.unwrap();
                }

                let mut seen = Vec::new();
                while let Some(stored) = storage.retrieve_job().await.unwrap() {
                    if seen.len() == deleted % count {
                        storage.delete_job(&stored).await.unwrap();
                    } else {
                        storage.fail_job(&stored).await.unwrap();
                    }
                    seen.push(stored.id());
                }

                prop_assert_eq!(seen.len(), count);
                prop_assert!(storage.retrieve_job().await.unwrap().is_none());
                Ok(())
            })?;
        }
    }
}
