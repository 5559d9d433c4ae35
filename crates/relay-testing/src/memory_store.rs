//! In-memory `Store` used by `relay-core`'s own test suite and by any
//! downstream crate that wants to exercise the engine without a database.
//! Implements the exact claim predicate and ordering spec'd for the
//! Claim Engine (`priority ASC, scheduled_at ASC, id ASC`) over a
//! `Vec<Job>` guarded by a `tokio::sync::Mutex`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use relay_core::{Job, JobId, JobPatch, LockKey, NewJob, Status, Store, StoreError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::Mutex;

#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<Job>>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn is_claim_candidate(job: &Job, now: DateTime<Utc>) -> bool {
        job.status == Status::Pending
            && job.scheduled_at <= now
            && match (job.lock_key, job.lock_expiration) {
                (None, _) => true,
                (Some(_), Some(expiration)) => expiration < now,
                (Some(_), None) => true,
            }
    }

    fn apply_patch(job: &mut Job, patch: JobPatch) {
        if let Some(status) = patch.status {
            job.status = status;
        }
        if let Some(scheduled_at) = patch.scheduled_at {
            job.scheduled_at = scheduled_at;
        }
        if let Some(started_at) = patch.started_at {
            job.started_at = started_at;
        }
        if let Some(completed_at) = patch.completed_at {
            job.completed_at = completed_at;
        }
        if let Some(retries) = patch.retries {
            job.retries = retries;
        }
        if let Some(error_message) = patch.error_message {
            job.error_message = error_message;
        }
        if let Some(lock_key) = patch.lock_key {
            job.lock_key = lock_key;
        }
        if let Some(lock_expiration) = patch.lock_expiration {
            job.lock_expiration = lock_expiration;
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert(&self, draft: NewJob) -> Result<JobId, StoreError> {
        let id = JobId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let now = Utc::now();
        let job = Job {
            id,
            job_name: draft.job_name,
            job_data: draft.job_data,
            priority: draft.priority,
            status: Status::Pending,
            created_at: now,
            scheduled_at: draft.scheduled_at,
            started_at: None,
            completed_at: None,
            retries: 0,
            error_message: None,
            lock_key: None,
            lock_expiration: None,
        };
        self.rows.lock().await.push(job);
        Ok(id)
    }

    async fn get_by_id(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        Ok(self.rows.lock().await.iter().find(|j| j.id == id).cloned())
    }

    async fn update_by_id(&self, id: JobId, patch: JobPatch) -> Result<u64, StoreError> {
        let mut rows = self.rows.lock().await;
        match rows.iter_mut().find(|j| j.id == id) {
            Some(job) => {
                Self::apply_patch(job, patch);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn claim_next(
        &self,
        now: DateTime<Utc>,
        lock_key: LockKey,
        lease: Duration,
    ) -> Result<Option<Job>, StoreError> {
        let mut rows = self.rows.lock().await;

        let winner_id = rows
            .iter()
            .filter(|j| Self::is_claim_candidate(j, now))
            .min_by(|a, b| {
                a.priority
                    .cmp(&b.priority)
                    .then(a.scheduled_at.cmp(&b.scheduled_at))
                    .then(a.id.cmp(&b.id))
            })
            .map(|j| j.id);

        let Some(winner_id) = winner_id else {
            return Ok(None);
        };

        let job = rows.iter_mut().find(|j| j.id == winner_id).unwrap();
        job.status = Status::Processing;
        job.started_at = Some(now);
        job.lock_key = Some(lock_key);
        job.lock_expiration = Some(now + lease);

        Ok(Some(job.clone()))
    }

    async fn conditional_update(
        &self,
        id: JobId,
        lock_key: LockKey,
        patch: JobPatch,
    ) -> Result<u64, StoreError> {
        let mut rows = self.rows.lock().await;
        match rows.iter_mut().find(|j| j.id == id) {
            Some(job) if job.lock_key == Some(lock_key) => {
                Self::apply_patch(job, patch);
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn delete_older_than(&self, status: Status, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|j| !(j.status == status && j.completed_at.map(|c| c < cutoff).unwrap_or(false)));
        Ok((before - rows.len()) as u64)
    }

    async fn unlock_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut rows = self.rows.lock().await;
        let mut count = 0u64;
        for job in rows.iter_mut() {
            if job.status == Status::Processing {
                if let Some(expiration) = job.lock_expiration {
                    if expiration < now {
                        job.status = Status::Pending;
                        job.lock_key = None;
                        job.lock_expiration = None;
                        count += 1;
                    }
                }
            }
        }
        Ok(count)
    }

    async fn peek_ready(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Job>, StoreError> {
        let rows = self.rows.lock().await;
        let mut ready: Vec<Job> = rows
            .iter()
            .filter(|j| j.status == Status::Pending && j.scheduled_at <= now)
            .cloned()
            .collect();
        ready.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.scheduled_at.cmp(&b.scheduled_at)));
        ready.truncate(limit.max(0) as usize);
        Ok(ready)
    }

    async fn list(&self, status_filter: Option<Status>, limit: i64) -> Result<Vec<Job>, StoreError> {
        let rows = self.rows.lock().await;
        let mut matching: Vec<Job> = rows
            .iter()
            .filter(|j| status_filter.map(|s| j.status == s).unwrap_or(true))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.id.cmp(&a.id));
        matching.truncate(limit.max(0) as usize);
        Ok(matching)
    }

    async fn count_by_status(&self) -> Result<HashMap<Status, i64>, StoreError> {
        let rows = self.rows.lock().await;
        let mut counts = HashMap::new();
        for job in rows.iter() {
            *counts.entry(job.status).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn delete(&self, id: JobId) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().await;
        rows.retain(|j| j.id != id);
        Ok(())
    }
}
