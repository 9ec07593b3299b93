//! Memory usage sampling for the client's resource limit.

use std::sync::Mutex;
use sysinfo::{Pid, System};

/// Reports how much memory the running process uses.
pub trait MemoryProbe: Send + Sync {
    /// Current usage in bytes.
    fn current_usage(&self) -> u64;
}

/// Resident memory of the current process, read through `sysinfo`.
#[derive(Debug)]
pub struct ProcessMemory {
    pid: Pid,
    system: Mutex<System>,
}

impl ProcessMemory {
    pub fn new() -> Self {
        Self {
            pid: Pid::from_u32(std::process::id()),
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for ProcessMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for ProcessMemory {
    fn current_usage(&self) -> u64 {
        let Ok(mut system) = self.system.lock() else {
            tracing::warn!(pid = %self.pid, "Unable to read process memory: lock poisoned");
            return 0;
        };

        if !system.refresh_process(self.pid) {
            tracing::warn!(pid = %self.pid, "Unable to read process memory");
            return 0;
        }
        system.process(self.pid).map_or(0, |process| process.memory())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    #[derive(Clone, Default)]
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn test_poisoned_lock_reports_zero_and_warns() {
        let warnings = WarnCounter::default();
        let subscriber = tracing_subscriber::registry().with(warnings.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let probe = ProcessMemory::new();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _lock = probe.system.lock().unwrap();
            panic!("poison the lock");
        }));
        assert!(probe.system.is_poisoned());

        assert_eq!(probe.current_usage(), 0);
        assert_eq!(warnings.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_current_process_uses_memory() {
        let probe = ProcessMemory::new();
        // unsupported platforms report zero
        if sysinfo::IS_SUPPORTED_SYSTEM {
            assert!(probe.current_usage() > 0);
        }
    }
}
