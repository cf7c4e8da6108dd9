//! Tests for the SQL subscriber store.

use uuid::Uuid;

use crate::{NewSubscriber, StoreConfig, StoreError, SubscriberStore, UpdateSubscriber};

async fn setup_store() -> SubscriberStore {
    let config = StoreConfig::new("sqlite::memory:").max_connections(1);
    let store = SubscriberStore::connect(config)
        .await
        .expect("failed to connect");
    store.ensure_schema().await.expect("failed to create schema");
    store
}

fn new_subscriber(username: &str, traffic_limit: i64, expires_at: i64) -> NewSubscriber {
    NewSubscriber {
        username: username.to_string(),
        traffic_limit,
        expires_at,
    }
}

#[tokio::test]
async fn create_issues_connection_id() {
    let store = setup_store().await;
    let sub = store
        .create(new_subscriber("alice", 0, 0))
        .await
        .unwrap();

    assert!(sub.id > 0);
    assert!(sub.active);
    assert_eq!(sub.traffic_used, 0);
    assert!(Uuid::parse_str(&sub.connection_id).is_ok());

    let by_name = store.get_by_username("alice").await.unwrap();
    let by_conn = store.get_by_connection_id(&sub.connection_id).await.unwrap();
    assert_eq!(by_name, sub);
    assert_eq!(by_conn, sub);
}

#[tokio::test]
async fn duplicate_username_rejected() {
    let store = setup_store().await;
    store.create(new_subscriber("alice", 0, 0)).await.unwrap();

    let result = store.create(new_subscriber("alice", 0, 0)).await;
    assert!(matches!(result, Err(StoreError::Duplicate)));
}

#[tokio::test]
async fn connection_ids_are_distinct() {
    let store = setup_store().await;
    let a = store.create(new_subscriber("alice", 0, 0)).await.unwrap();
    let b = store.create(new_subscriber("bob", 0, 0)).await.unwrap();
    assert_ne!(a.connection_id, b.connection_id);
}

#[tokio::test]
async fn get_missing_is_not_found() {
    let store = setup_store().await;
    assert!(matches!(
        store.get_by_id(42).await,
        Err(StoreError::NotFound)
    ));
    assert!(matches!(
        store.get_by_username("ghost").await,
        Err(StoreError::NotFound)
    ));
}

#[tokio::test]
async fn list_returns_all_newest_first() {
    let store = setup_store().await;
    for name in ["alice", "bob", "carol"] {
        store.create(new_subscriber(name, 0, 0)).await.unwrap();
    }

    let subs = store.list().await.unwrap();
    assert_eq!(subs.len(), 3);
    for pair in subs.windows(2) {
        assert!(pair[0].created_at >= pair[1].created_at);
    }
}

#[tokio::test]
async fn record_traffic_accumulates_per_direction() {
    let store = setup_store().await;
    let sub = store.create(new_subscriber("alice", 0, 0)).await.unwrap();

    store
        .record_traffic(&sub.connection_id, 100, 200)
        .await
        .unwrap();
    store
        .record_traffic(&sub.connection_id, 50, 25)
        .await
        .unwrap();

    let sub = store.get_by_id(sub.id).await.unwrap();
    assert_eq!(sub.traffic_up, 150);
    assert_eq!(sub.traffic_down, 225);
    assert_eq!(sub.traffic_used, 375);
}

#[tokio::test]
async fn limit_crossing_deactivates_once() {
    let store = setup_store().await;
    let sub = store
        .create(new_subscriber("alice", 1000, 0))
        .await
        .unwrap();
    store
        .record_traffic(&sub.connection_id, 450, 450)
        .await
        .unwrap();

    // 900 used, flush of 50 up / 60 down crosses the 1000 limit
    let deactivated = store
        .record_traffic(&sub.connection_id, 50, 60)
        .await
        .unwrap();
    assert!(deactivated);

    let sub = store.get_by_id(sub.id).await.unwrap();
    assert_eq!(sub.traffic_used, 1010);
    assert!(!sub.active);
    assert!(sub.is_over_limit());

    // Further increments keep counting but never re-deactivate
    let deactivated = store
        .record_traffic(&sub.connection_id, 10, 0)
        .await
        .unwrap();
    assert!(!deactivated);
    let sub = store.get_by_id(sub.id).await.unwrap();
    assert!(!sub.active);
    assert_eq!(sub.traffic_used, 1020);
}

#[tokio::test]
async fn unlimited_subscriber_never_deactivates() {
    let store = setup_store().await;
    let sub = store.create(new_subscriber("alice", 0, 0)).await.unwrap();

    let deactivated = store
        .record_traffic(&sub.connection_id, 1 << 40, 1 << 40)
        .await
        .unwrap();
    assert!(!deactivated);
    assert!(store.get_by_id(sub.id).await.unwrap().active);
}

#[tokio::test]
async fn record_traffic_unknown_id_is_not_found() {
    let store = setup_store().await;
    let result = store.record_traffic("ghost-id", 10, 10).await;
    assert!(matches!(result, Err(StoreError::NotFound)));
}

#[tokio::test]
async fn reset_traffic_zeroes_counters_only() {
    let store = setup_store().await;
    let sub = store
        .create(new_subscriber("alice", 100, 0))
        .await
        .unwrap();
    store
        .record_traffic(&sub.connection_id, 80, 40)
        .await
        .unwrap();

    let sub = store.get_by_id(sub.id).await.unwrap();
    assert!(!sub.active); // over limit

    store.reset_traffic(sub.id).await.unwrap();
    let sub = store.get_by_id(sub.id).await.unwrap();
    assert_eq!(sub.traffic_used, 0);
    assert_eq!(sub.traffic_up, 0);
    assert_eq!(sub.traffic_down, 0);
    // reset does not touch the active flag
    assert!(!sub.active);

    // explicit reactivation restores admissibility
    store.set_active(sub.id, true).await.unwrap();
    let sub = store.get_by_id(sub.id).await.unwrap();
    assert!(sub.can_connect(crate::now_unix()));

    // accumulation restarts from zero
    store
        .record_traffic(&sub.connection_id, 10, 5)
        .await
        .unwrap();
    assert_eq!(store.get_by_id(sub.id).await.unwrap().traffic_used, 15);
}

#[tokio::test]
async fn update_applies_partial_fields() {
    let store = setup_store().await;
    let sub = store.create(new_subscriber("alice", 0, 0)).await.unwrap();

    let updated = store
        .update(
            sub.id,
            UpdateSubscriber {
                traffic_limit: Some(5000),
                expires_at: None,
                active: Some(false),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.traffic_limit, 5000);
    assert_eq!(updated.expires_at, 0);
    assert!(!updated.active);
    assert_eq!(updated.connection_id, sub.connection_id);
}

#[tokio::test]
async fn delete_retires_subscriber() {
    let store = setup_store().await;
    let sub = store.create(new_subscriber("alice", 0, 0)).await.unwrap();

    store.delete(sub.id).await.unwrap();
    assert!(matches!(
        store.get_by_id(sub.id).await,
        Err(StoreError::NotFound)
    ));
    assert!(matches!(
        store.delete(sub.id).await,
        Err(StoreError::NotFound)
    ));
}

#[tokio::test]
async fn counts_reflect_registry_state() {
    let store = setup_store().await;
    let now = crate::now_unix();

    // active, unlimited
    store.create(new_subscriber("alice", 0, 0)).await.unwrap();
    // expired
    store
        .create(new_subscriber("bob", 0, now - 10))
        .await
        .unwrap();
    // over limit
    let carol = store
        .create(new_subscriber("carol", 100, 0))
        .await
        .unwrap();
    store
        .record_traffic(&carol.connection_id, 100, 50)
        .await
        .unwrap();

    assert_eq!(store.count_total().await.unwrap(), 3);
    assert_eq!(store.count_expired().await.unwrap(), 1);
    assert_eq!(store.count_over_limit().await.unwrap(), 1);
    // carol was auto-deactivated; bob is expired; only alice is active
    assert_eq!(store.count_active().await.unwrap(), 1);
}

#[tokio::test]
async fn list_admissible_filters_all_clauses() {
    let store = setup_store().await;
    let now = crate::now_unix();

    store.create(new_subscriber("alice", 0, 0)).await.unwrap();
    store
        .create(new_subscriber("bob", 0, now - 10))
        .await
        .unwrap();
    let carol = store
        .create(new_subscriber("carol", 100, 0))
        .await
        .unwrap();
    store
        .record_traffic(&carol.connection_id, 60, 60)
        .await
        .unwrap();
    let dave = store.create(new_subscriber("dave", 0, 0)).await.unwrap();
    store.set_active(dave.id, false).await.unwrap();

    let admissible = store.list_admissible().await.unwrap();
    let names: Vec<&str> = admissible.iter().map(|s| s.username.as_str()).collect();
    assert_eq!(names, vec!["alice"]);
}

#[tokio::test]
async fn set_active_missing_is_not_found() {
    let store = setup_store().await;
    assert!(matches!(
        store.set_active(99, true).await,
        Err(StoreError::NotFound)
    ));
}
