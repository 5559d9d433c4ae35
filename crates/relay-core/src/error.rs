//! Crate-boundary error taxonomy (spec §7). Library code returns
//! `EngineError`/`StoreError`; `anyhow` is reserved for the demo binary.

use crate::job::JobId;
use thiserror::Error;

/// Errors surfaced by a `Store` implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job {0} not found")]
    NotFound(JobId),
    #[error("store backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Errors surfaced by the engine's producer-facing and admin-facing APIs,
/// and recorded (never propagated) from background execution.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown handler: {0:?}")]
    UnknownHandler(String),
    #[error("failed to decode payload for job {job_id}: {source}")]
    PayloadDecode {
        job_id: JobId,
        #[source]
        source: serde_json::Error,
    },
    #[error("handler failed: {0}")]
    HandlerFailure(String),
    #[error("lease lost for job {0}")]
    LeaseLost(JobId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    /// The taxonomy tag recorded into `Job::error_message` / logs, matching
    /// spec §7's named categories.
    pub fn category(&self) -> &'static str {
        match self {
            EngineError::UnknownHandler(_) => "unknown-handler",
            EngineError::PayloadDecode { .. } => "payload-decode",
            EngineError::HandlerFailure(_) => "handler-failure",
            EngineError::LeaseLost(_) => "lease-lost",
            EngineError::Store(_) => "store-error",
        }
    }
}
