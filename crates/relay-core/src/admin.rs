//! Admin-facing API (spec §4.6/§6): query, retry-now, cancel.

use std::collections::HashMap;
use std::sync::Arc;

use crate::clock::Clock;
use crate::error::StoreError;
use crate::host::Host;
use crate::job::{Job, JobId, JobPatch, Status};
use crate::store::Store;

pub struct Admin {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    host: Arc<dyn Host>,
}

impl Admin {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, host: Arc<dyn Host>) -> Self {
        Self { store, clock, host }
    }

    /// List jobs, optionally filtered by status, up to `limit`.
    pub async fn list(&self, status_filter: Option<Status>, limit: i64) -> Result<Vec<Job>, StoreError> {
        self.store.list(status_filter, limit).await
    }

    pub async fn count_by_status(&self) -> Result<HashMap<Status, i64>, StoreError> {
        self.store.count_by_status().await
    }

    /// Reset a job to `pending` with `retries = 0`, clearing its error and
    /// lock, then trigger dispatch.
    pub async fn retry(&self, id: JobId) -> Result<(), StoreError> {
        let now = self.clock.now();
        let patch = JobPatch::new()
            .status(Status::Pending)
            .scheduled_at(now)
            .retries(0)
            .clear_error_message()
            .clear_lock();

        self.store.update_by_id(id, patch).await?;
        self.host.async_trigger(Some(id));
        Ok(())
    }

    /// Hard delete, regardless of current status. If the job is
    /// `processing`, the running handler is not signaled; its eventual
    /// `ConditionalUpdate` will find zero rows affected and no-op.
    pub async fn cancel(&self, id: JobId) -> Result<(), StoreError> {
        self.store.delete(id).await
    }
}
