//! Periodic scan for ready jobs (spec §4.5). Deliberately stateless and
//! idempotent: it only peeks and nudges, never claims, so a missed or
//! doubled tick can only delay dispatch, never lose or duplicate work —
//! the claim itself is won by exactly one worker inside `Executor`.

use std::sync::Arc;
use tracing::debug;

use crate::clock::Clock;
use crate::error::StoreError;
use crate::host::Host;
use crate::store::Store;

pub struct Dispatcher {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    host: Arc<dyn Host>,
    batch_size: i64,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, host: Arc<dyn Host>, batch_size: i64) -> Self {
        Self {
            store,
            clock,
            host,
            batch_size,
        }
    }

    /// One dispatch tick: peek up to `batch_size` pending, due jobs ordered
    /// by `(priority, scheduled_at)` and trigger a worker for each.
    pub async fn tick(&self) -> Result<usize, StoreError> {
        let now = self.clock.now();
        let ready = self.store.peek_ready(now, self.batch_size).await?;
        let count = ready.len();
        for job in ready {
            debug!(job_id = %job.id, job_name = %job.job_name, "dispatching trigger");
            self.host.async_trigger(Some(job.id));
        }
        Ok(count)
    }
}
