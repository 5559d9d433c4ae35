//! The job record: the sole persistent entity the engine operates on.
//!
//! ```text
//! CREATE TABLE jobs (
//!     id              BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
//!     job_name        TEXT NOT NULL,
//!     job_data        JSONB NOT NULL,
//!     priority        INTEGER NOT NULL DEFAULT 5,
//!     status          TEXT NOT NULL DEFAULT 'pending'
//!                         CHECK (status IN ('pending', 'processing', 'completed', 'failed')),
//!     created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     scheduled_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     started_at      TIMESTAMPTZ,
//!     completed_at    TIMESTAMPTZ,
//!     retries         INTEGER NOT NULL DEFAULT 0,
//!     error_message   TEXT,
//!     lock_key        UUID,
//!     lock_expiration TIMESTAMPTZ
//! );
//! ```
//!
//! See `relay-postgres`'s migrations for the indices this schema requires.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Upper bound for `retries` (spec: `MAX_RETRIES`).
pub const MAX_RETRIES: i32 = 5;

/// Lowest (most urgent) and highest (least urgent) priority values.
pub const MIN_PRIORITY: i32 = 1;
pub const MAX_PRIORITY: i32 = 10;

/// Opaque job identifier, assigned by the store on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobId(pub i64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A random token identifying the worker that currently holds a job's lease.
///
/// Cryptographically random, at least 128 bits of entropy (a v4 UUID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockKey(pub Uuid);

impl LockKey {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LockKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a job. See the state machine in `executor.rs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Completed | Status::Failed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Pending => "pending",
            Status::Processing => "processing",
            Status::Completed => "completed",
            Status::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// A durable unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub job_name: String,
    pub job_data: Value,
    pub priority: i32,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub scheduled_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub retries: i32,
    pub error_message: Option<String>,
    pub lock_key: Option<LockKey>,
    pub lock_expiration: Option<DateTime<Utc>>,
}

/// Fields required to insert a new job. `priority` is clamped by the
/// producer before reaching the store; the store never re-clamps.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub job_name: String,
    pub job_data: Value,
    pub priority: i32,
    pub scheduled_at: DateTime<Utc>,
}

/// A sparse set of field updates for `Store::update_by_id` and
/// `Store::conditional_update`. `None` means "leave unchanged"; the
/// `Option<Option<T>>` fields distinguish "leave unchanged" from
/// "explicitly clear to null".
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub status: Option<Status>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub started_at: Option<Option<DateTime<Utc>>>,
    pub completed_at: Option<Option<DateTime<Utc>>>,
    pub retries: Option<i32>,
    pub error_message: Option<Option<String>>,
    pub lock_key: Option<Option<LockKey>>,
    pub lock_expiration: Option<Option<DateTime<Utc>>>,
}

impl JobPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn scheduled_at(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_at = Some(at);
        self
    }

    pub fn started_at(mut self, at: DateTime<Utc>) -> Self {
        self.started_at = Some(Some(at));
        self
    }

    pub fn completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.completed_at = Some(Some(at));
        self
    }

    pub fn retries(mut self, retries: i32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(Some(message.into()));
        self
    }

    pub fn clear_error_message(mut self) -> Self {
        self.error_message = Some(None);
        self
    }

    pub fn lock(mut self, key: LockKey, expiration: DateTime<Utc>) -> Self {
        self.lock_key = Some(Some(key));
        self.lock_expiration = Some(Some(expiration));
        self
    }

    pub fn clear_lock(mut self) -> Self {
        self.lock_key = Some(None);
        self.lock_expiration = Some(None);
        self
    }
}
