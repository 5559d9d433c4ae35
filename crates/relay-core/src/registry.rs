//! Maps a job name to the handler that runs it. Collapses the source's dual
//! direct-callable / named-action-bus paths into a single tagged lookup: a
//! handler is a capability that decodes bytes and invokes itself on the result.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

use crate::job::JobId;

/// Outcome a handler reports back to the Executor.
#[derive(Debug, Clone)]
pub enum Outcome {
    Success,
    Failure(String),
}

/// A handler bound to a job name. `job_data` is handed over undecoded;
/// the handler owns its own payload shape: payloads are opaque bytes to
/// the engine.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, job_data: Value, job_id: JobId) -> Outcome;
}

/// Adapts any `Fn(T, JobId) -> Outcome`-shaped async closure plus a decoder
/// into a `Handler`, so callers rarely need to implement the trait by hand.
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Value, JobId) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Outcome> + Send,
{
    async fn handle(&self, job_data: Value, job_id: JobId) -> Outcome {
        (self.f)(job_data, job_id).await
    }
}

/// Read-mostly name → handler map, registered at initialization. The
/// source's equivalent is registered once at process start and not mutated
/// after workers begin claiming; `Registry` does not prevent later
/// mutation, but callers should treat registration as a startup-only step.
#[derive(Clone, Default)]
pub struct Registry {
    handlers: Arc<DashMap<String, Arc<dyn Handler>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, job_name: impl Into<String>, handler: Arc<dyn Handler>) {
        self.handlers.insert(job_name.into(), handler);
    }

    pub fn contains(&self, job_name: &str) -> bool {
        self.handlers.contains_key(job_name)
    }

    pub fn get(&self, job_name: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(job_name).map(|entry| entry.value().clone())
    }
}
