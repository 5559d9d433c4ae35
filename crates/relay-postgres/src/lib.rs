//! PostgreSQL implementation of the `relay-core` job queue `Store` trait.
//!
//! # Features
//!
//! - Atomic claim via `FOR UPDATE SKIP LOCKED` inside a `WITH ... UPDATE`
//!   CTE, so N concurrent claimers against the same backlog never return
//!   the same row.
//! - Lease-based CAS (`conditional_update`) so a worker whose lease was
//!   reaped cannot clobber a later claimant's write.
//! - Exponential backoff retry and a terminal `failed` state, applied by
//!   `relay-core`'s `Executor`; this crate only provides the store half.
//!
//! # Schema
//!
//! See `migrations/0001_jobs.sql` for the table and the indices spec'd for
//! correctness and performance: primary key on `id`; secondary on `status`,
//! `(status, scheduled_at, priority)`, `scheduled_at`, and `job_name`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use relay_postgres::PgStore;
//! use sqlx::PgPool;
//!
//! let pool = PgPool::connect("postgres://localhost/relay").await?;
//! let store = PgStore::new(pool);
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use relay_core::{Job, JobId, JobPatch, LockKey, NewJob, Status, Store, StoreError};
use sqlx::{PgPool, Row};
use std::collections::HashMap;

/// PostgreSQL-backed job store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn status_str(status: Status) -> &'static str {
    match status {
        Status::Pending => "pending",
        Status::Processing => "processing",
        Status::Completed => "completed",
        Status::Failed => "failed",
    }
}

fn parse_status(raw: &str) -> Status {
    match raw {
        "pending" => Status::Pending,
        "processing" => Status::Processing,
        "completed" => Status::Completed,
        "failed" => Status::Failed,
        other => unreachable!("database CHECK constraint should prevent unknown status {other:?}"),
    }
}

fn row_to_job(row: sqlx::postgres::PgRow) -> Job {
    let id: i64 = row.get("id");
    let status: String = row.get("status");
    let lock_key: Option<uuid::Uuid> = row.get("lock_key");
    Job {
        id: JobId(id),
        job_name: row.get("job_name"),
        job_data: row.get("job_data"),
        priority: row.get("priority"),
        status: parse_status(&status),
        created_at: row.get("created_at"),
        scheduled_at: row.get("scheduled_at"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
        retries: row.get("retries"),
        error_message: row.get("error_message"),
        lock_key: lock_key.map(LockKey),
        lock_expiration: row.get("lock_expiration"),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert(&self, draft: NewJob) -> Result<JobId, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO jobs (job_name, job_data, priority, status, scheduled_at)
            VALUES ($1, $2, $3, 'pending', $4)
            RETURNING id
            "#,
        )
        .bind(&draft.job_name)
        .bind(&draft.job_data)
        .bind(draft.priority)
        .bind(draft.scheduled_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.into()))?;

        Ok(JobId(row.get("id")))
    }

    async fn get_by_id(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        let row = sqlx::query("SELECT * FROM jobs WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.into()))?;

        Ok(row.map(row_to_job))
    }

    async fn update_by_id(&self, id: JobId, patch: JobPatch) -> Result<u64, StoreError> {
        apply_patch(&self.pool, "UPDATE jobs SET", id, None, patch).await
    }

    /// Atomic claim: a single `WITH claimable AS (... FOR UPDATE
    /// SKIP LOCKED) UPDATE ... RETURNING` statement, so exactly one
    /// concurrent caller wins the candidate row.
    async fn claim_next(
        &self,
        now: DateTime<Utc>,
        lock_key: LockKey,
        lease: Duration,
    ) -> Result<Option<Job>, StoreError> {
        let lease_expiration = now + lease;

        let row = sqlx::query(
            r#"
            WITH claimable AS (
                SELECT id
                FROM jobs
                WHERE status = 'pending'
                  AND scheduled_at <= $1
                  AND (lock_key IS NULL OR lock_expiration < $1)
                ORDER BY priority ASC, scheduled_at ASC, id ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE jobs
            SET status = 'processing',
                started_at = $1,
                lock_key = $2,
                lock_expiration = $3
            WHERE id IN (SELECT id FROM claimable)
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(lock_key.0)
        .bind(lease_expiration)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.into()))?;

        Ok(row.map(row_to_job))
    }

    async fn conditional_update(
        &self,
        id: JobId,
        lock_key: LockKey,
        patch: JobPatch,
    ) -> Result<u64, StoreError> {
        apply_patch(&self.pool, "UPDATE jobs SET", id, Some(lock_key), patch).await
    }

    async fn delete_older_than(&self, status: Status, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM jobs WHERE status = $1 AND completed_at < $2")
            .bind(status_str(status))
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.into()))?;

        Ok(result.rows_affected())
    }

    async fn unlock_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'pending',
                lock_key = NULL,
                lock_expiration = NULL
            WHERE status = 'processing'
              AND lock_expiration < $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.into()))?;

        Ok(result.rows_affected())
    }

    async fn peek_ready(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Job>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM jobs
            WHERE status = 'pending' AND scheduled_at <= $1
            ORDER BY priority ASC, scheduled_at ASC
            LIMIT $2
            "#,
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.into()))?;

        Ok(rows.into_iter().map(row_to_job).collect())
    }

    async fn list(&self, status_filter: Option<Status>, limit: i64) -> Result<Vec<Job>, StoreError> {
        let rows = match status_filter {
            Some(status) => sqlx::query("SELECT * FROM jobs WHERE status = $1 ORDER BY id DESC LIMIT $2")
                .bind(status_str(status))
                .bind(limit)
                .fetch_all(&self.pool)
                .await,
            None => sqlx::query("SELECT * FROM jobs ORDER BY id DESC LIMIT $1")
                .bind(limit)
                .fetch_all(&self.pool)
                .await,
        }
        .map_err(|e| StoreError::Backend(e.into()))?;

        Ok(rows.into_iter().map(row_to_job).collect())
    }

    async fn count_by_status(&self) -> Result<HashMap<Status, i64>, StoreError> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS n FROM jobs GROUP BY status")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.into()))?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let status: String = row.get("status");
                let n: i64 = row.get("n");
                (parse_status(&status), n)
            })
            .collect())
    }

    async fn delete(&self, id: JobId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.into()))?;

        Ok(())
    }
}

/// Shared sparse-`UPDATE` builder for `update_by_id`/`conditional_update`.
/// When `lock_key_guard` is `Some`, an `AND lock_key = $n` predicate is
/// appended, giving `conditional_update` its CAS semantics.
async fn apply_patch(
    pool: &PgPool,
    prefix: &str,
    id: JobId,
    lock_key_guard: Option<LockKey>,
    patch: JobPatch,
) -> Result<u64, StoreError> {
    let mut query = sqlx::QueryBuilder::new(prefix);
    query.push(" ");

    let mut first = true;
    macro_rules! set_clause {
        ($col:literal, $value:expr) => {{
            if !first {
                query.push(", ");
            }
            query.push(concat!($col, " = "));
            query.push_bind($value);
            first = false;
        }};
    }

    if let Some(status) = patch.status {
        set_clause!("status", status_str(status));
    }
    if let Some(scheduled_at) = patch.scheduled_at {
        set_clause!("scheduled_at", scheduled_at);
    }
    if let Some(started_at) = patch.started_at {
        set_clause!("started_at", started_at);
    }
    if let Some(completed_at) = patch.completed_at {
        set_clause!("completed_at", completed_at);
    }
    if let Some(retries) = patch.retries {
        set_clause!("retries", retries);
    }
    if let Some(error_message) = patch.error_message {
        set_clause!("error_message", error_message);
    }
    if let Some(lock_key) = patch.lock_key {
        set_clause!("lock_key", lock_key.map(|k| k.0));
    }
    if let Some(lock_expiration) = patch.lock_expiration {
        set_clause!("lock_expiration", lock_expiration);
    }

    if first {
        // Nothing to change; avoid emitting `UPDATE jobs SET WHERE ...`.
        return Ok(0);
    }

    query.push(" WHERE id = ");
    query.push_bind(id.0);

    if let Some(lock_key) = lock_key_guard {
        query.push(" AND lock_key = ");
        query.push_bind(lock_key.0);
    }

    let result = query
        .build()
        .execute(pool)
        .await
        .map_err(|e| StoreError::Backend(e.into()))?;

    Ok(result.rows_affected())
}
