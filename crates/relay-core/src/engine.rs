//! Explicit engine handle (spec §9): the systems-language replacement for
//! the source's process-wide ambient singleton. Construct once at process
//! start with a store, clock, registry, and host; hand the handle (or its
//! cheap `Clone`) to producers, workers, and admin surfaces; tear down by
//! unregistering timers and letting in-flight workers drain.

use std::sync::Arc;

use crate::admin::Admin;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::dispatcher::Dispatcher;
use crate::error::EngineError;
use crate::executor::Executor;
use crate::host::{Host, TimerHandle, TimerInterval};
use crate::job::Job;
use crate::producer::Producer;
use crate::reaper::Reaper;
use crate::registry::Registry;
use crate::store::Store;

/// Owns the engine's collaborators and exposes the producer/admin surface
/// plus the dispatch/reap ticks a worker or timer driver calls into.
#[derive(Clone)]
pub struct Engine {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    host: Arc<dyn Host>,
    registry: Registry,
    config: Arc<EngineConfig>,
}

impl Engine {
    pub fn builder(store: Arc<dyn Store>, clock: Arc<dyn Clock>, host: Arc<dyn Host>) -> EngineBuilder {
        EngineBuilder {
            store,
            clock,
            host,
            registry: Registry::new(),
            config: EngineConfig::default(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn producer(&self) -> Producer {
        Producer::new(
            self.store.clone(),
            self.clock.clone(),
            self.host.clone(),
            self.registry.clone(),
            self.config.high_priority_threshold,
        )
    }

    pub fn admin(&self) -> Admin {
        Admin::new(self.store.clone(), self.clock.clone(), self.host.clone())
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(
            self.store.clone(),
            self.clock.clone(),
            self.host.clone(),
            self.config.dispatch_batch_size,
        )
    }

    pub fn reaper(&self) -> Reaper {
        Reaper::new(self.store.clone(), self.clock.clone(), &self.config)
    }

    /// Attempt to claim and run one job. Returns `Ok(None)` if nothing was
    /// eligible to claim (spec §4.3 step 3).
    pub async fn claim_and_run_once(&self) -> Result<Option<()>, EngineError> {
        let now = self.clock.now();
        let lock_key = self.host.random_token(128);
        let claimed: Option<Job> = self
            .store
            .claim_next(now, lock_key, self.config.lease_duration)
            .await?;

        let Some(job) = claimed else {
            return Ok(None);
        };

        let executor = Executor::new(self.store.as_ref(), &self.registry, self.clock.as_ref())
            .with_max_retries(self.config.max_retries);
        executor.run_once(job).await?;
        Ok(Some(()))
    }

    /// Register the Dispatcher and Reaper with the host's timer driver.
    /// Returns handles so `shutdown` can unregister them.
    pub fn start_timers(self: &Arc<Self>) -> EngineTimers {
        let dispatch_engine = self.clone();
        let dispatcher_handle = self.host.register_timer(
            "relay::dispatcher",
            TimerInterval::EveryMinute,
            Arc::new(move || {
                let engine = dispatch_engine.clone();
                Box::pin(async move {
                    if let Err(err) = engine.dispatcher().tick().await {
                        tracing::warn!(error = %err, "dispatcher tick failed");
                    }
                })
            }),
        );

        let reap_engine = self.clone();
        let reaper_handle = self.host.register_timer(
            "relay::reaper",
            TimerInterval::Daily,
            Arc::new(move || {
                let engine = reap_engine.clone();
                Box::pin(async move {
                    if let Err(err) = engine.reaper().tick().await {
                        tracing::warn!(error = %err, "reaper tick failed");
                    }
                })
            }),
        );

        EngineTimers {
            dispatcher_handle,
            reaper_handle,
        }
    }

    pub fn stop_timers(&self, timers: EngineTimers) {
        self.host.unregister_timer(timers.dispatcher_handle);
        self.host.unregister_timer(timers.reaper_handle);
    }
}

pub struct EngineTimers {
    pub dispatcher_handle: TimerHandle,
    pub reaper_handle: TimerHandle,
}

pub struct EngineBuilder {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    host: Arc<dyn Host>,
    registry: Registry,
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            store: self.store,
            clock: self.clock,
            host: self.host,
            registry: self.registry,
            config: Arc::new(self.config),
        }
    }
}
