//! The `Store` contract (spec §4.1): the single serialization point for all
//! job mutation. Every concurrent write path — claim, finalize, reap, admin
//! retry/cancel — goes through one of these methods.

use crate::error::StoreError;
use crate::job::{Job, JobId, JobPatch, LockKey, NewJob, Status};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

#[async_trait]
pub trait Store: Send + Sync {
    /// Atomic insert, returning the generated id.
    async fn insert(&self, draft: NewJob) -> Result<JobId, StoreError>;

    async fn get_by_id(&self, id: JobId) -> Result<Option<Job>, StoreError>;

    /// Unconditional update. Returns the number of rows affected (0 or 1).
    async fn update_by_id(&self, id: JobId, patch: JobPatch) -> Result<u64, StoreError>;

    /// Atomically select and lock exactly one dispatchable job (spec §4.3).
    ///
    /// Candidate predicate: `status = pending`, `scheduled_at <= now`,
    /// `lock_key IS NULL OR lock_expiration < now`. Ordered by
    /// `(priority ASC, scheduled_at ASC, id ASC)`, limit 1. On a match, sets
    /// `status = processing`, `started_at = now`, `lock_key = lock_key`,
    /// `lock_expiration = now + lease`, and returns the updated row.
    async fn claim_next(
        &self,
        now: DateTime<Utc>,
        lock_key: LockKey,
        lease: Duration,
    ) -> Result<Option<Job>, StoreError>;

    /// Update only if the row's current `lock_key` matches. Used by the
    /// Executor so a worker whose lease was reaped cannot clobber a job a
    /// later claimant now owns. Returns rows affected (0 or 1); 0 means the
    /// caller lost its lease.
    async fn conditional_update(
        &self,
        id: JobId,
        lock_key: LockKey,
        patch: JobPatch,
    ) -> Result<u64, StoreError>;

    /// Delete terminal rows of `status` older than `cutoff` (by `completed_at`).
    async fn delete_older_than(&self, status: Status, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Reset any `processing` row whose lease has expired back to `pending`,
    /// clearing its lock. Does not touch `retries` (spec §4.6, §9).
    async fn unlock_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Read-only peek at up to `limit` pending jobs eligible for dispatch,
    /// ordered by `(priority, scheduled_at)`. Does not claim; used by the
    /// Dispatcher, which only nudges workers and never locks rows itself.
    async fn peek_ready(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Job>, StoreError>;

    /// Admin query: list jobs, optionally filtered by status, newest first,
    /// up to `limit`.
    async fn list(&self, status_filter: Option<Status>, limit: i64) -> Result<Vec<Job>, StoreError>;

    /// Admin query: count jobs grouped by status.
    async fn count_by_status(&self) -> Result<std::collections::HashMap<Status, i64>, StoreError>;

    /// Admin mutation: hard delete a row regardless of status.
    async fn delete(&self, id: JobId) -> Result<(), StoreError>;
}
