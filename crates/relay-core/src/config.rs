//! Engine configuration (spec §6). Explicit builder, not a global/env
//! singleton — the embedding binary is responsible for loading overrides
//! (e.g. via `dotenvy`) and handing the engine a concrete `EngineConfig`.

use chrono::Duration;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Terminal-failure threshold. Default 5.
    pub max_retries: i32,
    /// Reaper reclaim window for a claimed lease. Default 300s.
    pub lease_duration: Duration,
    /// Jobs triggered per dispatcher tick. Default 10.
    pub dispatch_batch_size: i64,
    /// Retention for `completed` rows before the reaper prunes them. Default 7d.
    pub completed_retention: Duration,
    /// Retention for `failed` rows before the reaper prunes them. Default 30d.
    pub failed_retention: Duration,
    /// Priority at or below which `enqueue` triggers immediate async dispatch. Default 3.
    pub high_priority_threshold: i32,
    /// Upper bound on the store's connection pool size. Ambient operational
    /// knob, not named by spec §6, but required to construct `relay-postgres`'s
    /// pool the way the embedding host would configure any other pooled resource.
    pub store_pool_max_connections: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            lease_duration: Duration::seconds(300),
            dispatch_batch_size: 10,
            completed_retention: Duration::days(7),
            failed_retention: Duration::days(30),
            high_priority_threshold: 3,
            store_pool_max_connections: 10,
        }
    }
}

impl EngineConfig {
    pub fn with_max_retries(mut self, max_retries: i32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_lease_duration(mut self, lease_duration: Duration) -> Self {
        self.lease_duration = lease_duration;
        self
    }

    pub fn with_dispatch_batch_size(mut self, batch_size: i64) -> Self {
        self.dispatch_batch_size = batch_size;
        self
    }

    pub fn with_completed_retention(mut self, retention: Duration) -> Self {
        self.completed_retention = retention;
        self
    }

    pub fn with_failed_retention(mut self, retention: Duration) -> Self {
        self.failed_retention = retention;
        self
    }

    pub fn with_high_priority_threshold(mut self, threshold: i32) -> Self {
        self.high_priority_threshold = threshold;
        self
    }

    pub fn with_store_pool_max_connections(mut self, max_connections: u32) -> Self {
        self.store_pool_max_connections = max_connections;
        self
    }
}
