//! Producer-facing API (spec §4.2): `enqueue` and `schedule_recurring`.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

use crate::clock::Clock;
use crate::error::EngineError;
use crate::host::{Host, TimerHandle, TimerInterval};
use crate::job::{JobId, NewJob, MAX_PRIORITY, MIN_PRIORITY};
use crate::registry::Registry;
use crate::store::Store;

/// Recurring cadence accepted by `schedule_recurring`. A restriction of
/// `TimerInterval` to the three cadences spec §4.2 names; `every_minute` is
/// a host/dispatcher-internal cadence, not something a producer schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurringInterval {
    Hourly,
    TwiceDaily,
    Daily,
}

impl From<RecurringInterval> for TimerInterval {
    fn from(value: RecurringInterval) -> Self {
        match value {
            RecurringInterval::Hourly => TimerInterval::Hourly,
            RecurringInterval::TwiceDaily => TimerInterval::TwiceDaily,
            RecurringInterval::Daily => TimerInterval::Daily,
        }
    }
}

pub struct Producer {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    host: Arc<dyn Host>,
    registry: Registry,
    high_priority_threshold: i32,
    recurring: DashMap<String, TimerHandle>,
}

impl Producer {
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        host: Arc<dyn Host>,
        registry: Registry,
        high_priority_threshold: i32,
    ) -> Self {
        Self {
            store,
            clock,
            host,
            registry,
            high_priority_threshold,
            recurring: DashMap::new(),
        }
    }

    /// Enqueue one job. Rejects unknown handler names; clamps priority into
    /// `[1, 10]`; computes `scheduled_at` from `delay_seconds`; fires the
    /// host's async-trigger hint immediately when the job is both
    /// high-priority and due now.
    pub async fn enqueue(
        &self,
        job_name: &str,
        payload: Value,
        delay_seconds: i64,
        priority: i32,
    ) -> Result<JobId, EngineError> {
        if !self.registry.contains(job_name) {
            return Err(EngineError::UnknownHandler(job_name.to_string()));
        }

        let priority = priority.clamp(MIN_PRIORITY, MAX_PRIORITY);
        let scheduled_at: DateTime<Utc> = self.clock.now() + chrono::Duration::seconds(delay_seconds);

        let draft = NewJob {
            job_name: job_name.to_string(),
            job_data: payload,
            priority,
            scheduled_at,
        };

        let id = self.store.insert(draft).await?;

        if priority <= self.high_priority_threshold && delay_seconds == 0 {
            self.host.async_trigger(Some(id));
        }

        Ok(id)
    }

    /// Register a timer that repeatedly calls `enqueue` at `interval`.
    /// Idempotent per `job_name`: a second call while a timer is already
    /// registered for that name returns `false` without re-registering.
    pub fn schedule_recurring(
        &self,
        job_name: &str,
        payload: Value,
        interval: RecurringInterval,
        priority: i32,
    ) -> bool {
        if self.recurring.contains_key(job_name) {
            return false;
        }

        let store = self.store.clone();
        let clock = self.clock.clone();
        let host = self.host.clone();
        let registry = self.registry.clone();
        let job_name_owned = job_name.to_string();
        let priority = priority.clamp(MIN_PRIORITY, MAX_PRIORITY);
        let threshold = self.high_priority_threshold;

        let callback: crate::host::TimerCallback = {
            let job_name_owned = job_name_owned.clone();
            Arc::new(move || {
                let store = store.clone();
                let clock = clock.clone();
                let host = host.clone();
                let registry = registry.clone();
                let job_name = job_name_owned.clone();
                let payload = payload.clone();
                Box::pin(async move {
                    let producer = Producer::new(store, clock, host, registry, threshold);
                    if let Err(err) = producer.enqueue(&job_name, payload, 0, priority).await {
                        tracing::warn!(job_name = %job_name, error = %err, "recurring enqueue failed");
                    }
                })
            })
        };

        let handle = self.host.register_timer(&job_name_owned, interval.into(), callback);
        self.recurring.insert(job_name_owned, handle);
        true
    }

    /// Unregister a previously scheduled recurring timer, if any.
    pub fn unschedule_recurring(&self, job_name: &str) {
        if let Some((_, handle)) = self.recurring.remove(job_name) {
            self.host.unregister_timer(handle);
        }
    }
}
