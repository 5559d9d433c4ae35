//! Integration tests against a real Postgres instance. Ignored by default
//! since they require `DATABASE_URL` pointing at a database with
//! `migrations/0001_jobs.sql` applied; run explicitly with
//! `DATABASE_URL=... cargo test -p relay-postgres -- --ignored`.

use chrono::{Duration, Utc};
use relay_core::{JobPatch, LockKey, NewJob, Status, Store};
use relay_postgres::PgStore;
use sqlx::PgPool;

async fn connect() -> PgStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for Postgres integration tests");
    let pool = PgPool::connect(&url).await.expect("failed to connect to DATABASE_URL");
    PgStore::new(pool)
}

#[tokio::test]
#[ignore]
async fn insert_and_claim_round_trip() {
    let store = connect().await;
    let now = Utc::now();

    let id = store
        .insert(NewJob {
            job_name: "pg-integration".into(),
            job_data: serde_json::json!({"ok": true}),
            priority: 2,
            scheduled_at: now,
        })
        .await
        .unwrap();

    let claimed = store
        .claim_next(now, LockKey::new(), Duration::seconds(300))
        .await
        .unwrap()
        .expect("freshly inserted job should be claimable");

    assert_eq!(claimed.id, id);
    assert_eq!(claimed.status, Status::Processing);

    store.delete(id).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn conditional_update_respects_lock_key_cas() {
    let store = connect().await;
    let now = Utc::now();

    let id = store
        .insert(NewJob {
            job_name: "pg-cas".into(),
            job_data: serde_json::json!({}),
            priority: 5,
            scheduled_at: now,
        })
        .await
        .unwrap();

    let real_key = LockKey::new();
    store.claim_next(now, real_key, Duration::seconds(300)).await.unwrap();

    let wrong_key = LockKey::new();
    let rows = store
        .conditional_update(id, wrong_key, JobPatch::new().status(Status::Completed))
        .await
        .unwrap();
    assert_eq!(rows, 0, "stale lock key must not win the CAS");

    let rows = store
        .conditional_update(id, real_key, JobPatch::new().status(Status::Completed).clear_lock())
        .await
        .unwrap();
    assert_eq!(rows, 1);

    store.delete(id).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn unlock_expired_resets_without_incrementing_retries() {
    let store = connect().await;
    let now = Utc::now();

    let id = store
        .insert(NewJob {
            job_name: "pg-reap".into(),
            job_data: serde_json::json!({}),
            priority: 5,
            scheduled_at: now,
        })
        .await
        .unwrap();

    store
        .claim_next(now, LockKey::new(), Duration::seconds(-1))
        .await
        .unwrap();

    let unlocked = store.unlock_expired(Utc::now()).await.unwrap();
    assert!(unlocked >= 1);

    let job = store.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(job.status, Status::Pending);
    assert_eq!(job.retries, 0);

    store.delete(id).await.unwrap();
}
