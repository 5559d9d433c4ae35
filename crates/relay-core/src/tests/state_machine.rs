//! Boundary behaviors and state-machine scenarios from spec §8: priority
//! clamp, backoff delays, lease reap + immediate re-claim, and the
//! monotonic/terminal invariants on `retries` and `status`.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::Duration;
use relay_core::{
    Admin, Engine, EngineConfig, FnHandler, JobPatch, LockKey, Outcome, Registry, Status, Store,
};
use relay_testing::{FakeClock, MemoryStore};

use super::relay_core_test_support::NoOpHost;

fn test_engine(registry: Registry, config: EngineConfig) -> (Arc<Engine>, Arc<MemoryStore>, Arc<FakeClock>) {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FakeClock::starting_now());
    let host = Arc::new(NoOpHost::new());
    let engine = Engine::builder(store.clone(), clock.clone(), host)
        .with_registry(registry)
        .with_config(config)
        .build();
    (Arc::new(engine), store, clock)
}

#[tokio::test]
async fn priority_clamp_out_of_range_values() {
    let registry = Registry::new();
    registry.register(
        "noop",
        Arc::new(FnHandler::new(|_data, _id| async { Outcome::Success })),
    );
    let (engine, store, _clock) = test_engine(registry, EngineConfig::default());

    let low = engine
        .producer()
        .enqueue("noop", serde_json::json!({}), 0, 0)
        .await
        .unwrap();
    let high = engine
        .producer()
        .enqueue("noop", serde_json::json!({}), 0, 99)
        .await
        .unwrap();

    assert_eq!(store.get_by_id(low).await.unwrap().unwrap().priority, 1);
    assert_eq!(store.get_by_id(high).await.unwrap().unwrap().priority, 10);
}

#[tokio::test]
async fn backoff_delays_match_spec_for_attempts_one_through_four() {
    assert_eq!(relay_core::executor::backoff_delay(1), Duration::seconds(120));
    assert_eq!(relay_core::executor::backoff_delay(2), Duration::seconds(240));
    assert_eq!(relay_core::executor::backoff_delay(3), Duration::seconds(480));
    assert_eq!(relay_core::executor::backoff_delay(4), Duration::seconds(960));
}

#[tokio::test]
async fn retry_then_succeed_reaches_completed_after_two_failures() {
    let attempt = Arc::new(AtomicU32::new(0));
    let registry = Registry::new();
    {
        let attempt = attempt.clone();
        registry.register(
            "flaky",
            Arc::new(FnHandler::new(move |_data, _id| {
                let attempt = attempt.clone();
                async move {
                    let n = attempt.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Outcome::Failure("transient".into())
                    } else {
                        Outcome::Success
                    }
                }
            })),
        );
    }

    let (engine, store, clock) = test_engine(registry, EngineConfig::default());

    let id = engine
        .producer()
        .enqueue("flaky", serde_json::json!({}), 0, 5)
        .await
        .unwrap();

    // Attempt 1: fails, reschedules 120s out.
    engine.claim_and_run_once().await.unwrap();
    let job = store.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(job.status, Status::Pending);
    assert_eq!(job.retries, 1);

    clock.advance(Duration::seconds(120));
    engine.claim_and_run_once().await.unwrap();
    let job = store.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(job.status, Status::Pending);
    assert_eq!(job.retries, 2);

    clock.advance(Duration::seconds(240));
    engine.claim_and_run_once().await.unwrap();
    let job = store.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(job.status, Status::Completed);
    assert_eq!(job.retries, 2);
}

#[tokio::test]
async fn permanent_failure_after_five_attempts() {
    let registry = Registry::new();
    registry.register(
        "always_fails",
        Arc::new(FnHandler::new(|_data, _id| async {
            Outcome::Failure("boom".into())
        })),
    );

    let (engine, store, clock) = test_engine(registry, EngineConfig::default());

    let id = engine
        .producer()
        .enqueue("always_fails", serde_json::json!({}), 0, 5)
        .await
        .unwrap();

    let delays = [0i64, 120, 240, 480, 960];
    for delay in delays {
        clock.advance(Duration::seconds(delay));
        engine.claim_and_run_once().await.unwrap();
    }

    let job = store.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(job.status, Status::Failed);
    assert_eq!(job.retries, 5);
    assert_eq!(job.error_message.as_deref(), Some("boom"));
    assert!(job.lock_key.is_none());
}

#[tokio::test]
async fn crash_recovery_reaped_job_is_claimable_again_without_retry_increment() {
    let registry = Registry::new();
    registry.register(
        "slow",
        Arc::new(FnHandler::new(|_data, _id| async { Outcome::Success })),
    );

    let (engine, store, clock) = test_engine(registry, EngineConfig::default());

    let id = engine
        .producer()
        .enqueue("slow", serde_json::json!({}), 0, 5)
        .await
        .unwrap();

    // Worker claims and then "dies" without ever finalizing.
    let now = clock.now();
    store
        .claim_next(now, LockKey::new(), Duration::seconds(300))
        .await
        .unwrap();

    clock.advance(Duration::seconds(301));
    let reaper = engine.reaper();
    let (unlocked, _pruned) = reaper.tick().await.unwrap();
    assert_eq!(unlocked, 1);

    let job = store.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(job.status, Status::Pending);
    assert!(job.lock_key.is_none());
    assert_eq!(job.retries, 0);

    let reclaimed = store
        .claim_next(clock.now(), LockKey::new(), Duration::seconds(300))
        .await
        .unwrap();
    assert_eq!(reclaimed.unwrap().id, id);
}

#[tokio::test]
async fn admin_retry_resets_failed_job_to_pending() {
    let registry = Registry::new();
    registry.register(
        "whatever",
        Arc::new(FnHandler::new(|_data, _id| async {
            Outcome::Failure("x".into())
        })),
    );

    let (engine, store, _clock) = test_engine(registry, EngineConfig::default());

    let id = engine
        .producer()
        .enqueue("whatever", serde_json::json!({}), 0, 5)
        .await
        .unwrap();

    store
        .update_by_id(
            id,
            JobPatch::new()
                .status(Status::Failed)
                .retries(5)
                .error_message("permanently dead"),
        )
        .await
        .unwrap();

    let admin: Admin = engine.admin();
    admin.retry(id).await.unwrap();

    let job = store.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(job.status, Status::Pending);
    assert_eq!(job.retries, 0);
    assert!(job.error_message.is_none());
    assert!(job.lock_key.is_none());
}
