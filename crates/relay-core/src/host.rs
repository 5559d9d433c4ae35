//! Contracts the embedding host provides (spec §6). The engine core only
//! ever calls through this trait; it never knows whether "trigger a worker
//! soon" means an HTTP self-request, a message bus publish, or — as in the
//! default `TokioHost` below — an in-process channel.

use crate::job::{JobId, LockKey};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Recurring cadence vocabulary the host's timer driver supports. Mirrors
/// the closed set of WordPress-style cron schedules the original host
/// exposes (`every_minute`, `hourly`, `twicedaily`, `daily`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerInterval {
    EveryMinute,
    Hourly,
    TwiceDaily,
    Daily,
}

impl TimerInterval {
    pub fn as_std_duration(self) -> std::time::Duration {
        use std::time::Duration;
        match self {
            TimerInterval::EveryMinute => Duration::from_secs(60),
            TimerInterval::Hourly => Duration::from_secs(3600),
            TimerInterval::TwiceDaily => Duration::from_secs(12 * 3600),
            TimerInterval::Daily => Duration::from_secs(24 * 3600),
        }
    }
}

pub type TimerCallback = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Opaque handle returned by `Host::register_timer`, passed back to
/// `Host::unregister_timer` on shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub u64);

pub trait Host: Send + Sync {
    /// Fire-and-forget hint that the claim engine should run soon.
    fn async_trigger(&self, job_id: Option<JobId>);

    /// Register a periodic callback. Returns a handle for later cancellation.
    fn register_timer(&self, name: &str, interval: TimerInterval, callback: TimerCallback) -> TimerHandle;

    /// Cancel a previously registered timer.
    fn unregister_timer(&self, handle: TimerHandle);

    /// Cryptographically secure random token generator for lock keys.
    fn random_token(&self, bits: u32) -> LockKey;
}

/// Default host: `async_trigger` enqueues onto an in-process mpsc channel
/// serviced by a worker pool (the systems-language replacement for the
/// source's self-HTTP trigger, per spec §9); timers are plain
/// `tokio::time::interval` tasks tracked by handle so they can be aborted.
pub struct TokioHost {
    trigger_tx: mpsc::UnboundedSender<Option<JobId>>,
    trigger_rx: std::sync::Mutex<Option<mpsc::UnboundedReceiver<Option<JobId>>>>,
    timers: dashmap::DashMap<u64, JoinHandle<()>>,
    next_timer_id: AtomicU64,
}

impl TokioHost {
    pub fn new() -> Self {
        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
        Self {
            trigger_tx,
            trigger_rx: std::sync::Mutex::new(Some(trigger_rx)),
            timers: dashmap::DashMap::new(),
            next_timer_id: AtomicU64::new(1),
        }
    }

    /// Take ownership of the trigger receiver. Intended to be called once,
    /// by the worker pool that drains `async_trigger` signals. Panics if
    /// called more than once (the host provides exactly one channel).
    pub fn take_trigger_receiver(&self) -> mpsc::UnboundedReceiver<Option<JobId>> {
        self.trigger_rx
            .lock()
            .expect("trigger receiver mutex poisoned")
            .take()
            .expect("trigger receiver already taken")
    }
}

impl Default for TokioHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for TokioHost {
    fn async_trigger(&self, job_id: Option<JobId>) {
        // Non-blocking by construction: an unbounded send never awaits. A
        // dropped receiver (no worker pool attached) just means the signal
        // is discarded: async_trigger is a hint, not a delivery guarantee.
        let _ = self.trigger_tx.send(job_id);
    }

    fn register_timer(&self, name: &str, interval: TimerInterval, callback: TimerCallback) -> TimerHandle {
        let id = self.next_timer_id.fetch_add(1, Ordering::Relaxed);
        let name = name.to_string();
        let period = interval.as_std_duration();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                tracing::debug!(timer = %name, "timer fired");
                (callback)().await;
            }
        });
        self.timers.insert(id, handle);
        TimerHandle(id)
    }

    fn unregister_timer(&self, handle: TimerHandle) {
        if let Some((_, join_handle)) = self.timers.remove(&handle.0) {
            join_handle.abort();
        }
    }

    fn random_token(&self, _bits: u32) -> LockKey {
        LockKey::new()
    }
}
