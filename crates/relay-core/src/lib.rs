//! # relay-core
//!
//! A durable, priority-aware background job queue engine with lease-based
//! worker coordination and bounded-retry failure handling.
//!
//! Producers submit named units of work with opaque payloads
//! ([`producer::Producer::enqueue`]); the engine persists them through a
//! pluggable [`store::Store`], dispatches them in priority and schedule
//! order, guarantees at-most-one concurrent execution per job via an atomic
//! claim-and-lease algorithm ([`store::Store::claim_next`]), and retries
//! transient failures with exponential backoff up to a fixed cap
//! ([`executor::Executor`]) before declaring permanent failure.
//!
//! ## Architecture
//!
//! ```text
//! Producer ──insert──▶ Store
//!                        ▲  │
//!          Dispatcher ───┘  │ claim_next
//!             │ peek_ready  ▼
//!             ▼          Executor ──▶ Registry ──▶ handler
//!           Host                        │
//!             │                 conditional_update
//!          worker ─────────────────────▶│
//!                                       ▼
//!                                     Store
//!             ▲
//!          Reaper ── unlock_expired / delete_older_than
//! ```
//!
//! See each module's doc comment for the corresponding contract.
//!
//! This crate has no in-flight cancellation signal and no per-job timeout
//! beyond the lease: a handler that outruns its lease is treated as
//! crashed, and the reaper may hand the job to a different worker. Handlers
//! must tolerate duplicate execution.

pub mod admin;
pub mod clock;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod executor;
pub mod host;
pub mod job;
pub mod producer;
pub mod reaper;
pub mod registry;
pub mod store;

#[cfg(test)]
mod tests;

pub use admin::Admin;
pub use clock::{Clock, SystemClock};
pub use config::EngineConfig;
pub use dispatcher::Dispatcher;
pub use engine::{Engine, EngineBuilder, EngineTimers};
pub use error::{EngineError, StoreError};
pub use executor::Executor;
pub use host::{Host, TimerHandle, TimerInterval, TokioHost};
pub use job::{Job, JobId, JobPatch, LockKey, NewJob, Status, MAX_PRIORITY, MAX_RETRIES, MIN_PRIORITY};
pub use producer::{Producer, RecurringInterval};
pub use reaper::Reaper;
pub use registry::{FnHandler, Handler, Outcome, Registry};
pub use store::Store;
