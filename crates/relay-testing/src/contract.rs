//! A conformance suite any `Store` implementation should pass: `relay-core`
//! runs it against `MemoryStore`, and
//! `relay-postgres` can run the same suite against `PgStore` behind its own
//! `#[cfg(test)]` module, without duplicating the assertions by hand.
//!
//! # Example
//!
//! ```ignore
//! relay_testing::store_contract_tests!(|| relay_testing::MemoryStore::new());
//! ```

#[macro_export]
macro_rules! store_contract_tests {
    ($make_store:expr) => {
        #[tokio::test]
        async fn contract_insert_then_get_round_trips_payload() {
            use $crate::contract::__contract_support as support;
            support::insert_then_get_round_trips_payload(($make_store)()).await;
        }

        #[tokio::test]
        async fn contract_claim_next_returns_highest_priority_due_job() {
            use $crate::contract::__contract_support as support;
            support::claim_next_returns_highest_priority_due_job(($make_store)()).await;
        }

        #[tokio::test]
        async fn contract_claim_next_excludes_unexpired_lease() {
            use $crate::contract::__contract_support as support;
            support::claim_next_excludes_unexpired_lease(($make_store)()).await;
        }

        #[tokio::test]
        async fn contract_conditional_update_rejects_stale_lock_key() {
            use $crate::contract::__contract_support as support;
            support::conditional_update_rejects_stale_lock_key(($make_store)()).await;
        }

        #[tokio::test]
        async fn contract_unlock_expired_resets_without_touching_retries() {
            use $crate::contract::__contract_support as support;
            support::unlock_expired_resets_without_touching_retries(($make_store)()).await;
        }
    };
}

/// Implementation functions behind the macro, generic over any `Store`.
/// Not part of the crate's public API surface beyond what the macro needs.
#[doc(hidden)]
pub mod __contract_support {
    use chrono::{Duration, Utc};
    use relay_core::{JobPatch, LockKey, NewJob, Status, Store};

    pub async fn insert_then_get_round_trips_payload(store: impl Store) {
        let now = Utc::now();
        let payload = serde_json::json!({"x": 1});
        let id = store
            .insert(NewJob {
                job_name: "contract-test".into(),
                job_data: payload.clone(),
                priority: 5,
                scheduled_at: now,
            })
            .await
            .unwrap();

        let job = store.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(job.job_data, payload);
        assert_eq!(job.status, Status::Pending);
    }

    pub async fn claim_next_returns_highest_priority_due_job(store: impl Store) {
        let now = Utc::now();
        let low = store
            .insert(NewJob {
                job_name: "low".into(),
                job_data: serde_json::json!({}),
                priority: 8,
                scheduled_at: now,
            })
            .await
            .unwrap();
        let high = store
            .insert(NewJob {
                job_name: "high".into(),
                job_data: serde_json::json!({}),
                priority: 1,
                scheduled_at: now,
            })
            .await
            .unwrap();

        let claimed = store
            .claim_next(now, LockKey::new(), Duration::seconds(300))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(claimed.id, high);
        assert_ne!(claimed.id, low);
    }

    pub async fn claim_next_excludes_unexpired_lease(store: impl Store) {
        let now = Utc::now();
        store
            .insert(NewJob {
                job_name: "single".into(),
                job_data: serde_json::json!({}),
                priority: 5,
                scheduled_at: now,
            })
            .await
            .unwrap();

        let first = store
            .claim_next(now, LockKey::new(), Duration::seconds(300))
            .await
            .unwrap();
        assert!(first.is_some());

        let second = store
            .claim_next(now, LockKey::new(), Duration::seconds(300))
            .await
            .unwrap();
        assert!(second.is_none());
    }

    pub async fn conditional_update_rejects_stale_lock_key(store: impl Store) {
        let now = Utc::now();
        store
            .insert(NewJob {
                job_name: "single".into(),
                job_data: serde_json::json!({}),
                priority: 5,
                scheduled_at: now,
            })
            .await
            .unwrap();

        let claimed = store
            .claim_next(now, LockKey::new(), Duration::seconds(300))
            .await
            .unwrap()
            .unwrap();

        let wrong_key = LockKey::new();
        let rows = store
            .conditional_update(claimed.id, wrong_key, JobPatch::new().status(Status::Completed))
            .await
            .unwrap();

        assert_eq!(rows, 0);
    }

    pub async fn unlock_expired_resets_without_touching_retries(store: impl Store) {
        let now = Utc::now();
        let id = store
            .insert(NewJob {
                job_name: "single".into(),
                job_data: serde_json::json!({}),
                priority: 5,
                scheduled_at: now,
            })
            .await
            .unwrap();

        store
            .claim_next(now, LockKey::new(), Duration::seconds(1))
            .await
            .unwrap();

        store
            .update_by_id(id, JobPatch::new().retries(2))
            .await
            .unwrap();

        let later = now + Duration::seconds(2);
        let unlocked = store.unlock_expired(later).await.unwrap();
        assert_eq!(unlocked, 1);

        let job = store.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(job.status, Status::Pending);
        assert!(job.lock_key.is_none());
        assert_eq!(job.retries, 2);
    }
}
