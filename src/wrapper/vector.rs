// src/wrapper/vector.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Vector buckets: indexes deleted one call each, at most
//! [`VECTOR_DELETE_CONCURRENCY`] in flight.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::concurrency::TaskGroup;
use crate::config::ClearOptions;
use crate::constants::VECTOR_DELETE_CONCURRENCY;
use crate::driver::{BucketSummary, VectorDriver};
use crate::error::{CallError, ClearError};
use crate::progress::{CountHandle, ProgressSender};
use crate::retry::RetryPolicy;

use super::batch::join_error;
use super::{BucketTarget, settle, with_counter};

pub struct VectorWrapper {
    driver: Arc<dyn VectorDriver>,
    options: ClearOptions,
    retry: RetryPolicy,
}

impl VectorWrapper {
    pub fn new(driver: Arc<dyn VectorDriver>, options: ClearOptions) -> Self {
        Self::with_retry(driver, options, RetryPolicy::s3_vectors())
    }

    pub fn with_retry(driver: Arc<dyn VectorDriver>, options: ClearOptions, retry: RetryPolicy) -> Self {
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
            self.clear_indexes(target, counter, token)
        })
        .await;
        debug!("{}: {} indexes deleted", target.name, deleted);
        settle(result, token, &target.name)?;

        if self.options.force {
            self.retry
                .run(token, || self.driver.delete_vector_bucket(&target.locator))
                .await
                .map_err(|e| ClearError::delete(&target.name, e))?;
        }
        Ok(())
    }

    async fn clear_indexes(
        &self,
        target: &BucketTarget,
        counter: CountHandle,
        token: &CancellationToken,
    ) -> Result<(), ClearError> {
        let prefix = self.options.key_prefix.as_deref();
        let mut group: TaskGroup<ClearError> = TaskGroup::with_limit(token, VECTOR_DELETE_CONCURRENCY);
        let mut next: Option<String> = None;

        'pages: loop {
            let listed = self
                .retry
                .run(group.token(), || {
                    self.driver
                        .list_indexes(&target.locator, next.as_deref(), prefix)
                })
                .await;
            let page = match listed {
                Ok(page) => page,
                Err(e) => {
                    group.fail(ClearError::list(&target.name, e));
                    break;
                }
            };
            debug!("{}: listed {} indexes", target.name, page.items.len());

            for index in page.items {
                let driver = self.driver.clone();
                let retry = self.retry.clone();
                let counter = counter.clone();
                let worker_token = group.token().clone();
                let bucket = target.locator.clone();
                let resource = target.name.clone();
                let spawned = group
                    .spawn(async move {
                        retry
                            .run(&worker_token, || driver.delete_index(&bucket, &index))
                            .await
                            .map_err(|e| ClearError::delete(&resource, e))?;
                        counter.add(1);
                        Ok(())
                    })
                    .await;
                if !spawned {
                    group.fail(ClearError::canceled(&target.name));
                    break 'pages;
                }
            }
            match page.next_token {
                Some(t) => next = Some(t),
                None => break,
            }
        }

        drop(counter);
        group.wait(join_error(target)).await
    }

    pub async fn list_buckets(&self, token: &CancellationToken) -> Result<Vec<BucketSummary>, CallError> {
        self.retry.run(token, || self.driver.list_vector_buckets()).await
    }
}
