//! Periodic sweep: reclaim expired leases, then prune aged terminal rows.
//! Runs at least once a day per the host's minimum schedule granularity;
//! both steps are safe to run more often.
//!
//! `unlock_expired` does not increment `retries` (spec §4.6/§9): a crashed
//! worker does not burn a retry attempt. A future revision that wants
//! `MAX_RETRIES` enforced uniformly across crash- and handler-induced
//! failures would change `Store::unlock_expired`'s implementations to bump
//! `retries` on reap; this module doesn't do that today.

use std::sync::Arc;
use tracing::info;

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::StoreError;
use crate::job::Status;
use crate::store::Store;

pub struct Reaper {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    completed_retention: chrono::Duration,
    failed_retention: chrono::Duration,
}

impl Reaper {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, config: &EngineConfig) -> Self {
        Self {
            store,
            clock,
            completed_retention: config.completed_retention,
            failed_retention: config.failed_retention,
        }
    }

    /// One reaper pass. Returns `(unlocked, pruned)` counts for observability.
    pub async fn tick(&self) -> Result<(u64, u64), StoreError> {
        let now = self.clock.now();

        let unlocked = self.store.unlock_expired(now).await?;
        if unlocked > 0 {
            info!(count = unlocked, "reaper unlocked expired leases");
        }

        let completed_cutoff = now - self.completed_retention;
        let failed_cutoff = now - self.failed_retention;

        let pruned_completed = self.store.delete_older_than(Status::Completed, completed_cutoff).await?;
        let pruned_failed = self.store.delete_older_than(Status::Failed, failed_cutoff).await?;
        let pruned = pruned_completed + pruned_failed;
        if pruned > 0 {
            info!(completed = pruned_completed, failed = pruned_failed, "reaper pruned terminal jobs");
        }

        Ok((unlocked, pruned))
    }
}
