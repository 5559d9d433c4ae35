//! Test-only modules, split concurrency properties into one file,
//! state-machine/backoff scenarios into another, and named end-to-end
//! scenarios into a third.

mod concurrency;
mod scenarios;
mod state_machine;

/// Shared test scaffolding: a no-op `Host` (nothing in these tests drives
/// real timers or triggers) and a `Registry` builder helper.
mod relay_core_test_support {
    use crate::host::{Host, TimerCallback, TimerHandle, TimerInterval};
    use crate::job::{JobId, LockKey};
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Default)]
    pub struct NoOpHost {
        triggers: std::sync::Mutex<Vec<Option<JobId>>>,
        next_timer: AtomicU64,
    }

    impl NoOpHost {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn triggered_job_ids(&self) -> Vec<Option<JobId>> {
            self.triggers.lock().unwrap().clone()
        }
    }

    impl Host for NoOpHost {
        fn async_trigger(&self, job_id: Option<JobId>) {
            self.triggers.lock().unwrap().push(job_id);
        }

        fn register_timer(&self, _name: &str, _interval: TimerInterval, _callback: TimerCallback) -> TimerHandle {
            TimerHandle(self.next_timer.fetch_add(1, Ordering::Relaxed))
        }

        fn unregister_timer(&self, _handle: TimerHandle) {}

        fn random_token(&self, _bits: u32) -> LockKey {
            LockKey::new()
        }
    }
}
