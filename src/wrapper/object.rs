// src/wrapper/object.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! General purpose buckets, versioned or not.
//!
//! Each listed page becomes one DeleteObjects batch. Batches run without a
//! width cap; the next ListObjectVersions call paces them.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::concurrency::TaskGroup;
use crate::config::ClearOptions;
use crate::driver::{BucketSummary, ObjectDriver, ObjectRef, VersionCursor, VersionPage};
use crate::error::{CallError, ClearError};
use crate::progress::{CountHandle, ProgressSender};
use crate::retry::RetryPolicy;

use super::batch::{BatchDeleter, clear_keys, join_error, submit};
use super::{BucketTarget, settle, with_counter};

pub struct ObjectWrapper {
    driver: Arc<dyn ObjectDriver>,
    options: ClearOptions,
    retry: RetryPolicy,
}

/// Refs to delete from one version page. With `old_versions_only` the
/// latest version of each key is kept; delete markers always go.
pub fn page_refs(page: VersionPage, old_versions_only: bool) -> Vec<ObjectRef> {
    let VersionPage {
        versions,
        delete_markers,
        ..
    } = page;
    let mut refs: Vec<ObjectRef> = versions
        .into_iter()
        .filter(|v| !(old_versions_only && v.is_latest))
        .map(|v| ObjectRef {
            key: v.key,
            version_id: v.version_id,
        })
        .collect();
    refs.extend(delete_markers);
    refs
}

impl ObjectWrapper {
    pub fn new(driver: Arc<dyn ObjectDriver>, options: ClearOptions) -> Self {
        Self::with_retry(driver, options, RetryPolicy::s3())
    }

    pub fn with_retry(driver: Arc<dyn ObjectDriver>, options: ClearOptions, retry: RetryPolicy) -> Self {
        Self {
            driver,
            options,
            retry,
        }
    }

    pub fn options(&self) -> &ClearOptions {
        &self.options
    }

    pub async fn clear_bucket(
        &self,
        target: &BucketTarget,
        progress: ProgressSender,
        token: &CancellationToken,
    ) -> Result<(), ClearError> {
        let (deleted, result) = with_counter(progress, self.options.quiet, |counter| {
            self.clear_items(target, counter, token)
        })
        .await;
        debug!("{}: {} objects deleted", target.name, deleted);
        settle(result, token, &target.name)?;

        if self.options.force {
            self.retry
                .run(token, || self.driver.delete_bucket(&target.locator))
                .await
                .map_err(|e| ClearError::delete(&target.name, e))?;
        }
        Ok(())
    }

    async fn clear_items(
        &self,
        target: &BucketTarget,
        counter: CountHandle,
        token: &CancellationToken,
    ) -> Result<(), ClearError> {
        let prefix = self.options.key_prefix.as_deref();
        if !self.driver.supports_versioning() {
            debug!("{}: endpoint without versioning, listing keys", target.name);
            return clear_keys(&self.driver, target, prefix, &self.retry, counter, token).await;
        }

        let mut group: TaskGroup<ClearError> = TaskGroup::new(token);
        let deleter = BatchDeleter {
            driver: self.driver.clone(),
            target: target.clone(),
            retry: self.retry.clone(),
            counter,
            token: group.token().clone(),
        };

        let mut cursor: Option<VersionCursor> = None;
        loop {
            let listed = self
                .retry
                .run(group.token(), || {
                    self.driver
                        .list_object_versions(&target.locator, cursor.as_ref(), prefix)
                })
                .await;
            let mut page = match listed {
                Ok(page) => page,
                Err(e) => {
                    group.fail(ClearError::list(&target.name, e));
                    break;
                }
            };
            debug!(
                "{}: listed {} versions, {} delete markers",
                target.name,
                page.versions.len(),
                page.delete_markers.len()
            );

            let next = page.next.take();
            let refs = page_refs(page, self.options.old_versions_only);
            if !submit(&mut group, &deleter, refs).await {
                break;
            }
            match next {
                Some(c) => cursor = Some(c),
                None => break,
            }
        }

        drop(deleter);
        group.wait(join_error(target)).await
    }

    pub async fn list_buckets(&self, token: &CancellationToken) -> Result<Vec<BucketSummary>, CallError> {
        self.retry.run(token, || self.driver.list_buckets()).await
    }
}
