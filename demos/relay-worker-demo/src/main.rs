//! Wires `relay-core` end to end against the in-process `TokioHost`: a
//! registered handler, one enqueued job, a worker loop draining async
//! triggers, and the dispatcher/reaper timers running in the background.
//!
//! Run with `RUST_LOG=info cargo run -p relay-worker-demo`.

use std::sync::Arc;
use std::time::Duration;

use relay_core::{Engine, EngineConfig, FnHandler, Outcome, Registry, TokioHost};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let registry = Registry::new();
    registry.register(
        "send_welcome_email",
        Arc::new(FnHandler::new(|payload, job_id| async move {
            let user = payload["user"].as_str().unwrap_or("unknown");
            tracing::info!(job_id = %job_id, user, "sending welcome email");
            Outcome::Success
        })),
    );

    let store = Arc::new(relay_testing::MemoryStore::new());
    let clock = Arc::new(relay_core::SystemClock);
    let host = Arc::new(TokioHost::new());

    let engine = Arc::new(
        Engine::builder(store, clock, host.clone())
            .with_registry(registry)
            .with_config(EngineConfig::default())
            .build(),
    );

    let id = engine
        .producer()
        .enqueue("send_welcome_email", serde_json::json!({"user": "ada"}), 0, 2)
        .await?;
    tracing::info!(job_id = %id, "enqueued job");

    let timers = engine.start_timers();

    let mut triggers = host.take_trigger_receiver();
    let worker_engine = engine.clone();
    let worker = tokio::spawn(async move {
        while triggers.recv().await.is_some() {
            if let Err(err) = worker_engine.claim_and_run_once().await {
                tracing::warn!(error = %err, "worker iteration failed");
            }
        }
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    engine.stop_timers(timers);
    worker.abort();

    let job = engine.admin().list(None, 10).await?;
    for job in job {
        tracing::info!(job_id = %job.id, status = %job.status, "final job state");
    }

    Ok(())
}
