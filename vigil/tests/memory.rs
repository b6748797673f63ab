#![allow(clippy::needless_return)]
#![cfg(feature = "memory")]
mod pipeline;

use tracing_test::traced_test;
use vigil::MemoryCounter;

#[tokio_shared_rt::test]
async fn end_to_end() {
    pipeline::test_end_to_end(&MemoryCounter::new()).await.unwrap();
}

#[tokio_shared_rt::test]
#[traced_test]
async fn limiter_order() {
    pipeline::test_limiter_order(&MemoryCounter::new())
        .await
        .unwrap();

    assert!(logs_contain("organization limit reached for 202"));
}

#[tokio_shared_rt::test]
async fn missing_filter_before_admission() {
    pipeline::test_missing_filter_before_admission(&MemoryCounter::new())
        .await
        .unwrap();
}

#[tokio_shared_rt::test]
async fn window_boundary() {
    pipeline::test_window_boundary(&MemoryCounter::new())
        .await
        .unwrap();
}

#[tokio_shared_rt::test]
async fn expire() {
    pipeline::test_expire(&MemoryCounter::new()).await.unwrap();
}

#[tokio_shared_rt::test]
async fn long_referrer() {
    pipeline::test_long_referrer(&MemoryCounter::new())
        .await
        .unwrap();
}
