#![allow(clippy::needless_return)]
#![cfg(feature = "memory")]
mod store;

use tracing_test::traced_test;
use vigil_store::MemoryStore;

#[tokio_shared_rt::test]
async fn round_trip() {
    store::test_round_trip(&MemoryStore::new()).await.unwrap();
}

#[tokio_shared_rt::test]
async fn missing_entries() {
    store::test_missing_entries(&MemoryStore::new()).await.unwrap();
}

#[tokio_shared_rt::test]
async fn set_overwrites() {
    store::test_set_overwrites(&MemoryStore::new()).await.unwrap();
}

#[tokio_shared_rt::test]
async fn all_and_delete() {
    store::test_all_and_delete(&MemoryStore::new()).await.unwrap();
}

#[tokio_shared_rt::test]
async fn enumeration() {
    store::test_enumeration(&MemoryStore::new()).await.unwrap();
}

#[tokio_shared_rt::test]
#[traced_test]
async fn concurrency() {
    store::test_concurrency(&MemoryStore::new()).await.unwrap();

    assert!(logs_contain("created generic_metrics_sets subscription"));
}

#[tokio_shared_rt::test]
async fn invalid_subscriptions() {
    store::test_invalid_subscriptions(&MemoryStore::new())
        .await
        .unwrap();
}

#[tokio_shared_rt::test]
#[traced_test]
async fn store_failure() {
    store::faulty::test_store_failure().await.unwrap();

    assert!(logs_contain("failed to store events subscription"));
}

#[tokio_shared_rt::test]
#[traced_test]
async fn collisions_exhaust_attempts() {
    store::faulty::test_collisions_exhaust_attempts()
        .await
        .unwrap();

    assert!(logs_contain("already live in events partition"));
}
