//! Policies deciding when and how urgently a failed job runs again.

use crate::storage::StoredJob;
use std::fmt::Debug;

/// Determines the delay (in seconds) and priority used to reschedule a job.
pub trait RescheduleStrategy: Debug + Send + Sync {
    fn determine_delay(&self, job: &dyn StoredJob) -> u32;

    fn determine_priority(&self, job: &dyn StoredJob) -> i32;
}

/// Always reschedules with the same delay and priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fixed {
    delay: u32,
    priority: i32,
}

impl Fixed {
    pub fn new(delay: u32, priority: i32) -> Self {
        Self { delay, priority }
    }
}

impl RescheduleStrategy for Fixed {
    fn determine_delay(&self, _job: &dyn StoredJob) -> u32 {
        self.delay
    }

    fn determine_priority(&self, _job: &dyn StoredJob) -> i32 {
        self.priority
    }
}

/// Grows the delay linearly with the number of earlier reschedules.
///
/// The count is read from the `releases` stat of the stored job; a job
/// without that stat is treated as never rescheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Linear {
    delay: u32,
    priority: i32,
}

impl Linear {
    pub fn new(delay: u32, priority: i32) -> Self {
        Self { delay, priority }
    }
}

impl RescheduleStrategy for Linear {
    fn determine_delay(&self, job: &dyn StoredJob) -> u32 {
        let releases = job.stat_u64("releases").unwrap_or(0);
        let factor = u32::try_from(releases.saturating_add(1)).unwrap_or(u32::MAX);
        self.delay.saturating_mul(factor)
    }

    fn determine_priority(&self, _job: &dyn StoredJob) -> i32 {
        self.priority
    }
}
