use crate::strategy::RescheduleStrategy;
use std::sync::Arc;
use thiserror::Error;

const RECOVERABLE_MESSAGE: &str = "A job failed and needs to be rescheduled.";

#[derive(Debug, Error)]
pub enum JobError {
    /// The job failed but may run again later.
    ///
    /// When `strategy` is set it takes precedence over the client's default
    /// reschedule strategy.
    #[error("{message}")]
    Recoverable {
        message: String,
        strategy: Option<Arc<dyn RescheduleStrategy>>,
    },

    #[error("The worker \"{0}\" is not a valid worker.")]
    UnknownWorker(String),

    #[error("{0}")]
    InvalidPayload(String),

    #[error("Job serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl JobError {
    /// A recoverable error which leaves the delay and priority to the client.
    pub fn recoverable(message: impl Into<String>) -> Self {
        Self::Recoverable {
            message: message.into(),
            strategy: None,
        }
    }

    /// A recoverable error carrying its own reschedule strategy.
    pub fn recoverable_with_strategy(strategy: Arc<dyn RescheduleStrategy>) -> Self {
        Self::Recoverable {
            message: RECOVERABLE_MESSAGE.to_string(),
            strategy: Some(strategy),
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable { .. })
    }

    /// The strategy override carried by a recoverable error, if any.
    pub fn reschedule_strategy(&self) -> Option<&Arc<dyn RescheduleStrategy>> {
        match self {
            Self::Recoverable { strategy, .. } => strategy.as_ref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, JobError>;
