//! Runs one claimed job to completion (spec §4.4): look up the handler,
//! invoke it, interpret the outcome, and apply the retry/backoff state
//! machine. Every terminal write is a `ConditionalUpdate` keyed on
//! `(id, lock_key)` — if another claimant (the reaper, or a second worker
//! after lease expiry) already took the job, this loses the CAS and must
//! not overwrite whatever that claimant wrote.

use tracing::{info, instrument, warn};

use crate::clock::Clock;
use crate::error::EngineError;
use crate::job::{Job, JobPatch, Status, MAX_RETRIES};
use crate::registry::{Outcome, Registry};
use crate::store::Store;

pub struct Executor<'a> {
    pub store: &'a dyn Store,
    pub registry: &'a Registry,
    pub clock: &'a dyn Clock,
    pub max_retries: i32,
}

impl<'a> Executor<'a> {
    pub fn new(store: &'a dyn Store, registry: &'a Registry, clock: &'a dyn Clock) -> Self {
        Self {
            store,
            registry,
            clock,
            max_retries: MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: i32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Execute one already-claimed job and finalize its outcome.
    #[instrument(skip(self, job), fields(job_id = %job.id, job_name = %job.job_name))]
    pub async fn run_once(&self, job: Job) -> Result<(), EngineError> {
        let lock_key = job
            .lock_key
            .expect("executor invoked with an unclaimed job (no lock_key)");

        let Some(handler) = self.registry.get(&job.job_name) else {
            // spec §9 open question: unknown-handler at execute time cannot
            // benefit from the standard retry loop (the name will still be
            // missing next attempt), so it fails immediately rather than
            // consuming a backoff slot.
            warn!(job_name = %job.job_name, "no handler registered for job");
            return self
                .finalize_failed(&job, lock_key, "unknown-handler".to_string())
                .await;
        };

        let outcome = handler.handle(job.job_data.clone(), job.id).await;

        match outcome {
            Outcome::Success => self.finalize_success(&job, lock_key).await,
            Outcome::Failure(message) => self.handle_failure(&job, lock_key, message).await,
        }
    }

    async fn finalize_success(&self, job: &Job, lock_key: crate::job::LockKey) -> Result<(), EngineError> {
        let now = self.clock.now();
        let patch = JobPatch::new()
            .status(Status::Completed)
            .completed_at(now)
            .clear_lock();

        let rows = self.store.conditional_update(job.id, lock_key, patch).await?;
        if rows == 0 {
            warn!(job_id = %job.id, "lease lost before success could be recorded");
            return Err(EngineError::LeaseLost(job.id));
        }
        info!(job_id = %job.id, "job completed");
        Ok(())
    }

    async fn finalize_failed(&self, job: &Job, lock_key: crate::job::LockKey, message: String) -> Result<(), EngineError> {
        let now = self.clock.now();
        let patch = JobPatch::new()
            .status(Status::Failed)
            .completed_at(now)
            .error_message(message.clone())
            .clear_lock();

        let rows = self.store.conditional_update(job.id, lock_key, patch).await?;
        if rows == 0 {
            warn!(job_id = %job.id, "lease lost before failure could be recorded");
            return Err(EngineError::LeaseLost(job.id));
        }
        warn!(job_id = %job.id, error = %message, "job permanently failed");
        Ok(())
    }

    /// `HandleFailure(job, message)` (spec §4.4): compute the next attempt
    /// number, and either reschedule with exponential backoff or transition
    /// to the terminal `failed` state.
    async fn handle_failure(&self, job: &Job, lock_key: crate::job::LockKey, message: String) -> Result<(), EngineError> {
        let attempts = job.retries + 1;

        if attempts < self.max_retries {
            let delay = backoff_delay(attempts);
            let now = self.clock.now();
            let retry_at = now + delay;

            let patch = JobPatch::new()
                .status(Status::Pending)
                .scheduled_at(retry_at)
                .retries(attempts)
                .error_message(message.clone())
                .clear_lock();

            let rows = self.store.conditional_update(job.id, lock_key, patch).await?;
            if rows == 0 {
                warn!(job_id = %job.id, "lease lost before retry could be scheduled");
                return Err(EngineError::LeaseLost(job.id));
            }
            info!(job_id = %job.id, attempts, retry_at = %retry_at, error = %message, "job failed, rescheduled");
            Ok(())
        } else {
            let now = self.clock.now();
            let patch = JobPatch::new()
                .status(Status::Failed)
                .completed_at(now)
                .retries(attempts)
                .error_message(message.clone())
                .clear_lock();

            let rows = self.store.conditional_update(job.id, lock_key, patch).await?;
            if rows == 0 {
                warn!(job_id = %job.id, "lease lost before failure could be recorded");
                return Err(EngineError::LeaseLost(job.id));
            }
            warn!(job_id = %job.id, error = %message, "job permanently failed");
            Ok(())
        }
    }
}

/// `delay = 2^attempts * 60` seconds, per spec §4.4/§9: attempts 1..4
/// reschedule (120/240/480/960s); attempt 5 is never passed here because
/// `handle_failure` routes it to the terminal branch first.
pub fn backoff_delay(attempts: i32) -> chrono::Duration {
    let seconds = 2i64.saturating_pow(attempts.max(0) as u32) * 60;
    chrono::Duration::seconds(seconds)
}
