//! Client options and their serializable configuration form.

use crate::strategy::{Fixed, Linear, RescheduleStrategy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Pause between two polls of the storage.
pub const DEFAULT_INTERVAL: Duration = Duration::from_micros(500);

/// How long a client runs before it stops on its own.
pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(3600);

/// Options controlling a [`Client`](crate::Client) run.
///
/// Lifetime and memory usage are soft limits: they are only checked between
/// two jobs, never while a worker runs.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    interval: Duration,
    lifetime: Duration,
    maximum_memory_usage: Option<u64>,
    reschedule_strategy: Option<Arc<dyn RescheduleStrategy>>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            lifetime: DEFAULT_LIFETIME,
            maximum_memory_usage: None,
            reschedule_strategy: None,
        }
    }
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Stop the client once the process uses `bytes` or more.
    pub fn with_maximum_memory_usage(mut self, bytes: u64) -> Self {
        self.maximum_memory_usage = Some(bytes);
        self
    }

    /// The strategy used when a recoverable error carries none.
    pub fn with_reschedule_strategy(mut self, strategy: Arc<dyn RescheduleStrategy>) -> Self {
        self.reschedule_strategy = Some(strategy);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// `None` means unbounded.
    pub fn maximum_memory_usage(&self) -> Option<u64> {
        self.maximum_memory_usage
    }

    pub fn reschedule_strategy(&self) -> Option<&Arc<dyn RescheduleStrategy>> {
        self.reschedule_strategy.as_ref()
    }
}

/// A reschedule strategy as written in a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum RescheduleConfig {
    Fixed {
        delay: u32,
        #[serde(default)]
        priority: i32,
    },
    Linear {
        delay: u32,
        #[serde(default)]
        priority: i32,
    },
}

impl RescheduleConfig {
    pub fn build(self) -> Arc<dyn RescheduleStrategy> {
        match self {
            Self::Fixed { delay, priority } => Arc::new(Fixed::new(delay, priority)),
            Self::Linear { delay, priority } => Arc::new(Linear::new(delay, priority)),
        }
    }
}

/// Serializable client configuration.
///
/// ```toml
/// interval = 500            # microseconds
/// lifetime = 3600           # seconds
/// maximum_memory_usage = 134217728
///
/// [reschedule]
/// strategy = "linear"
/// delay = 30
/// priority = 0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Microseconds between two polls
    pub interval: u64,
    /// Seconds before the client stops
    pub lifetime: u64,
    /// Bytes of memory after which the client stops
    pub maximum_memory_usage: Option<u64>,
    pub reschedule: Option<RescheduleConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL.as_micros() as u64,
            lifetime: DEFAULT_LIFETIME.as_secs(),
            maximum_memory_usage: None,
            reschedule: None,
        }
    }
}

impl ClientConfig {
    pub fn into_options(self) -> ClientOptions {
        let mut options = ClientOptions::new()
            .with_interval(Duration::from_micros(self.interval))
            .with_lifetime(Duration::from_secs(self.lifetime));

        if let Some(bytes) = self.maximum_memory_usage {
            options = options.with_maximum_memory_usage(bytes);
        }
        if let Some(reschedule) = self.reschedule {
            options = options.with_reschedule_strategy(reschedule.build());
        }
        options
    }
}
