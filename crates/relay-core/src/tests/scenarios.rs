//! End-to-end engine scenarios driving Producer → Dispatcher → claim →
//! Executor together, rather than calling `claim_and_run_once` directly
//! (covered in `state_machine.rs`). These exercise the full wiring a
//! worker process would actually run.

use std::sync::Arc;

use relay_core::{Engine, EngineConfig, FnHandler, Outcome, Registry, Status};
use relay_testing::{FakeClock, MemoryStore};

use super::relay_core_test_support::NoOpHost;

#[tokio::test]
async fn enqueue_dispatch_complete_round_trip() {
    let registry = Registry::new();
    registry.register(
        "hello",
        Arc::new(FnHandler::new(|data, _id| async move {
            assert_eq!(data["x"], 1);
            Outcome::Success
        })),
    );

    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FakeClock::starting_now());
    let host = Arc::new(NoOpHost::new());
    let engine = Arc::new(
        Engine::builder(store.clone(), clock, host.clone())
            .with_registry(registry)
            .with_config(EngineConfig::default())
            .build(),
    );

    let id = engine
        .producer()
        .enqueue("hello", serde_json::json!({"x": 1}), 0, 5)
        .await
        .unwrap();

    // priority=5 is not high-priority (threshold=3), so the producer does
    // not itself trigger — the Dispatcher is what notices the due job.
    assert!(host.triggered_job_ids().is_empty());

    let job = store.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(job.status, Status::Pending);

    let dispatched = engine.dispatcher().tick().await.unwrap();
    assert_eq!(dispatched, 1);
    assert_eq!(host.triggered_job_ids(), vec![Some(id)]);

    // The Dispatcher only nudges; the worker performs the actual claim.
    let ran = engine.claim_and_run_once().await.unwrap();
    assert!(ran.is_some());

    let job = store.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(job.status, Status::Completed);
    assert!(job.started_at.is_some());
    assert!(job.completed_at.is_some());
    assert!(job.error_message.is_none());
}

#[tokio::test]
async fn high_priority_immediate_job_triggers_async_dispatch_on_enqueue() {
    let registry = Registry::new();
    registry.register(
        "urgent",
        Arc::new(FnHandler::new(|_data, _id| async { Outcome::Success })),
    );

    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FakeClock::starting_now());
    let host = Arc::new(NoOpHost::new());
    let engine = Engine::builder(store, clock, host.clone())
        .with_registry(registry)
        .with_config(EngineConfig::default())
        .build();

    let id = engine
        .producer()
        .enqueue("urgent", serde_json::json!({}), 0, 2)
        .await
        .unwrap();

    assert_eq!(host.triggered_job_ids(), vec![Some(id)]);
}

#[tokio::test]
async fn delayed_job_does_not_trigger_immediate_dispatch_even_at_high_priority() {
    let registry = Registry::new();
    registry.register(
        "urgent",
        Arc::new(FnHandler::new(|_data, _id| async { Outcome::Success })),
    );

    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FakeClock::starting_now());
    let host = Arc::new(NoOpHost::new());
    let engine = Engine::builder(store, clock, host.clone())
        .with_registry(registry)
        .with_config(EngineConfig::default())
        .build();

    engine
        .producer()
        .enqueue("urgent", serde_json::json!({}), 60, 1)
        .await
        .unwrap();

    assert!(host.triggered_job_ids().is_empty());
}

#[tokio::test]
async fn enqueue_rejects_unknown_handler() {
    let registry = Registry::new();
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FakeClock::starting_now());
    let host = Arc::new(NoOpHost::new());
    let engine = Engine::builder(store, clock, host)
        .with_registry(registry)
        .with_config(EngineConfig::default())
        .build();

    let result = engine
        .producer()
        .enqueue("does-not-exist", serde_json::json!({}), 0, 5)
        .await;

    assert!(matches!(result, Err(relay_core::EngineError::UnknownHandler(name)) if name == "does-not-exist"));
}

#[tokio::test]
async fn execute_time_unknown_handler_fails_immediately_without_consuming_backoff() {
    // The handler is registered at enqueue time but unregistered before
    // execution — simulating a deploy that drops a handler the queue still
    // has pending jobs for. This must fail terminally, not retry, since
    // retrying cannot make the handler reappear (spec's decided open
    // question).
    let registry = Registry::new();
    registry.register(
        "temporary",
        Arc::new(FnHandler::new(|_data, _id| async { Outcome::Success })),
    );

    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FakeClock::starting_now());
    let host = Arc::new(NoOpHost::new());
    let engine = Engine::builder(store.clone(), clock, host)
        .with_registry(registry.clone())
        .with_config(EngineConfig::default())
        .build();

    let id = engine
        .producer()
        .enqueue("temporary", serde_json::json!({}), 0, 5)
        .await
        .unwrap();

    // Simulate the handler disappearing from the registry before a worker
    // picks the job up, by building a fresh engine bound to an empty registry
    // but the same store.
    let empty_registry = Registry::new();
    let store2 = store.clone();
    let clock2 = Arc::new(FakeClock::starting_now());
    let host2 = Arc::new(NoOpHost::new());
    let engine2 = Engine::builder(store2, clock2, host2)
        .with_registry(empty_registry)
        .with_config(EngineConfig::default())
        .build();

    engine2.claim_and_run_once().await.unwrap();

    let job = store.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(job.status, Status::Failed);
    assert_eq!(job.retries, 0);
    assert_eq!(job.error_message.as_deref(), Some("unknown-handler"));
}
