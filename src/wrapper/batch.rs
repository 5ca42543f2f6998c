// src/wrapper/batch.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Batched DeleteObjects with per-item retry, plus the key-listing loop
//! shared by unversioned and directory buckets.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::concurrency::TaskGroup;
use crate::constants::{MAX_DELETE_BATCH, RETRYABLE_ITEM_CODES};
use crate::driver::{ItemFailure, ObjectDriver, ObjectRef};
use crate::error::ClearError;
use crate::progress::CountHandle;
use crate::retry::RetryPolicy;

use super::BucketTarget;

/// Everything a delete worker needs; cloned into each spawned batch.
#[derive(Clone)]
pub(super) struct BatchDeleter {
    pub driver: Arc<dyn ObjectDriver>,
    pub target: BucketTarget,
    pub retry: RetryPolicy,
    pub counter: CountHandle,
    pub token: CancellationToken,
}

impl BatchDeleter {
    /// Delete `objects` in one call, re-issuing only items that failed with a
    /// transient code. Whatever is left after the attempts run out becomes a
    /// [`ClearError::Partial`].
    pub async fn delete(self, objects: Vec<ObjectRef>) -> Result<(), ClearError> {
        let name = self.target.name.as_str();
        let mut pending = objects;
        let mut permanent: Vec<ItemFailure> = Vec::new();
        let mut attempt = 1;

        while !pending.is_empty() {
            let failures = self
                .retry
                .run(&self.token, || {
                    self.driver.delete_objects(&self.target.locator, &pending)
                })
                .await
                .map_err(|e| ClearError::delete(name, e))?;

            self.counter
                .add(pending.len().saturating_sub(failures.len()) as u64);
            if failures.is_empty() {
                break;
            }

            let (transient, fatal): (Vec<ItemFailure>, Vec<ItemFailure>) = failures
                .into_iter()
                .partition(|f| RETRYABLE_ITEM_CODES.contains(&f.code.as_str()));
            permanent.extend(fatal);

            // a failure naming no pending ref cannot be re-issued
            let (transient, unmatched): (Vec<ItemFailure>, Vec<ItemFailure>) = transient
                .into_iter()
                .partition(|f| pending.iter().any(|o| f.matches(o)));
            if !unmatched.is_empty() {
                warn!("{}: {} item failure(s) match no requested object", name, unmatched.len());
                permanent.extend(unmatched);
            }

            if transient.is_empty() {
                break;
            }
            if attempt >= self.retry.max_attempts() {
                warn!(
                    "{}: {} item(s) still failing after {} attempts",
                    name,
                    transient.len(),
                    attempt
                );
                permanent.extend(transient);
                break;
            }

            pending.retain(|o| transient.iter().any(|f| f.matches(o)));
            debug!("{}: re-issuing {} item(s), attempt {}", name, pending.len(), attempt + 1);
            self.retry
                .backoff(&self.token)
                .await
                .map_err(|e| ClearError::delete(name, e))?;
            attempt += 1;
        }

        if permanent.is_empty() {
            Ok(())
        } else {
            Err(ClearError::Partial {
                resource: name.to_string(),
                failures: permanent,
            })
        }
    }
}

/// Spawn a worker per chunk of at most [`MAX_DELETE_BATCH`] refs. Returns
/// `false` once the group stopped accepting work. `deleter.token` must be
/// the group's token.
pub(super) async fn submit(
    group: &mut TaskGroup<ClearError>,
    deleter: &BatchDeleter,
    refs: Vec<ObjectRef>,
) -> bool {
    for chunk in refs.chunks(MAX_DELETE_BATCH) {
        let worker = deleter.clone();
        if !group.spawn(worker.delete(chunk.to_vec())).await {
            group.fail(ClearError::canceled(&deleter.target.name));
            return false;
        }
    }
    true
}

pub(super) fn join_error(target: &BucketTarget) -> impl Fn(tokio::task::JoinError) -> ClearError + '_ {
    move |source| ClearError::Task {
        resource: target.name.clone(),
        source,
    }
}

/// ListObjectsV2 loop: every listed key is deleted without a version id.
pub(super) async fn clear_keys(
    driver: &Arc<dyn ObjectDriver>,
    target: &BucketTarget,
    prefix: Option<&str>,
    retry: &RetryPolicy,
    counter: CountHandle,
    token: &CancellationToken,
) -> Result<(), ClearError> {
    let mut group: TaskGroup<ClearError> = TaskGroup::new(token);
    let deleter = BatchDeleter {
        driver: driver.clone(),
        target: target.clone(),
        retry: retry.clone(),
        counter,
        token: group.token().clone(),
    };

    let mut next: Option<String> = None;
    loop {
        let listed = retry
            .run(group.token(), || {
                driver.list_objects(&target.locator, next.as_deref(), prefix)
            })
            .await;
        let page = match listed {
            Ok(page) => page,
            Err(e) => {
                group.fail(ClearError::list(&target.name, e));
                break;
            }
        };
        debug!("{}: listed {} keys", target.name, page.items.len());

        let refs = page
            .items
            .into_iter()
            .map(|key| ObjectRef { key, version_id: None })
            .collect();
        if !submit(&mut group, &deleter, refs).await {
            break;
        }
        match page.next_token {
            Some(t) => next = Some(t),
            None => break,
        }
    }

    drop(deleter);
    group.wait(join_error(target)).await
}
