// tests/test_vector_wrapper.rs
//
// Vector bucket clearing: index fan-out under the width cap and retry.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use common::{MockVectorDriver, access_denied, forced, quiet, too_many_requests};
use s3clear::config::{Backend, ClearOptions};
use s3clear::error::{CallError, ClearError};
use s3clear::progress::progress_channel;
use s3clear::retry::{RetryPolicy, managed_classifier};
use s3clear::wrapper::{BucketTarget, VectorWrapper, Wrapper};

fn vector_wrapper(driver: &Arc<MockVectorDriver>, options: ClearOptions, attempts: u32) -> Wrapper {
    Wrapper::Vector(VectorWrapper::with_retry(
        driver.clone(),
        options,
        RetryPolicy::immediate(attempts, managed_classifier),
    ))
}

fn target() -> BucketTarget {
    BucketTarget::new("vb", "vb", Backend::Vector)
}

async fn clear(wrapper: &Wrapper) -> (Result<(), ClearError>, Vec<u64>) {
    let (tx, mut rx) = progress_channel();
    let result = wrapper
        .clear_bucket(&target(), tx, &CancellationToken::new())
        .await;
    let mut seen = Vec::new();
    while let Ok(v) = rx.try_recv() {
        seen.push(v);
    }
    (result, seen)
}

#[tokio::test]
async fn test_index_deletes_stay_under_cap() {
    let mut driver = MockVectorDriver::new("vb", &[500, 100]);
    driver.delay = Some(Duration::from_millis(1));
    let driver = Arc::new(driver);
    let wrapper = vector_wrapper(&driver, quiet(), 3);

    let (result, progress) = clear(&wrapper).await;
    result.unwrap();

    assert_eq!(driver.deleted_count(), 600);
    assert_eq!(progress, vec![600]);
    assert!(driver.delete_gauge.peak() <= 8, "peak {}", driver.delete_gauge.peak());
    assert!(driver.delete_gauge.peak() > 1);
    assert_eq!(driver.delete_gauge.current(), 0);
    assert!(driver.bucket_deletes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_throttled_delete_is_retried() {
    let driver = Arc::new(MockVectorDriver::new("vb", &[3]));
    driver
        .delete_errors
        .lock()
        .unwrap()
        .extend([too_many_requests(), too_many_requests()]);
    let wrapper = vector_wrapper(&driver, forced(), 5);

    let (result, _) = clear(&wrapper).await;
    result.unwrap();

    assert_eq!(driver.deleted_count(), 3);
    assert_eq!(driver.delete_attempts.load(Ordering::SeqCst), 5);
    assert_eq!(*driver.bucket_deletes.lock().unwrap(), vec!["vb".to_string()]);
}

#[tokio::test]
async fn test_denied_delete_is_not_retried() {
    let driver = Arc::new(MockVectorDriver::new("vb", &[1]));
    driver.delete_errors.lock().unwrap().push_back(access_denied());
    let wrapper = vector_wrapper(&driver, forced(), 5);

    let (result, _) = clear(&wrapper).await;

    assert!(matches!(
        result,
        Err(ClearError::Delete {
            source: CallError::Failed(_),
            ..
        })
    ));
    assert_eq!(driver.delete_attempts.load(Ordering::SeqCst), 1);
    assert!(driver.bucket_deletes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_exhausted_retries_become_delete_error() {
    let driver = Arc::new(MockVectorDriver::new("vb", &[1]));
    driver
        .delete_errors
        .lock()
        .unwrap()
        .extend((0..4).map(|_| too_many_requests()));
    let wrapper = vector_wrapper(&driver, quiet(), 4);

    let (result, _) = clear(&wrapper).await;

    assert!(matches!(
        result,
        Err(ClearError::Delete {
            source: CallError::Throttled { attempts: 4, .. },
            ..
        })
    ));
    assert_eq!(driver.deleted_count(), 0);
}

#[tokio::test]
async fn test_prefix_filters_listing() {
    let driver = Arc::new(MockVectorDriver::new("vb", &[2, 1]));
    let options = ClearOptions {
        key_prefix: Some("idx-".into()),
        ..quiet()
    };
    let wrapper = vector_wrapper(&driver, options, 3);

    let (result, _) = clear(&wrapper).await;
    result.unwrap();

    let prefixes = driver.list_prefixes.lock().unwrap().clone();
    assert_eq!(prefixes, vec![Some("idx-".to_string()), Some("idx-".to_string())]);
}

#[tokio::test]
async fn test_matching_vector_buckets() {
    let mut driver = MockVectorDriver::new("prod-vectors", &[]);
    driver.buckets.push(s3clear::driver::BucketSummary::named("dev-vectors"));
    let driver = Arc::new(driver);
    let wrapper = vector_wrapper(&driver, quiet(), 3);

    let matched = wrapper
        .list_buckets_matching("PROD", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].name, "prod-vectors");
    assert_eq!(matched[0].backend, Backend::Vector);
}
