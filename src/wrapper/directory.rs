// src/wrapper/directory.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Directory buckets: no versions, keys only.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::ClearOptions;
use crate::driver::{BucketSummary, ObjectDriver};
use crate::error::{CallError, ClearError};
use crate::progress::ProgressSender;
use crate::retry::RetryPolicy;

use super::batch::clear_keys;
use super::{BucketTarget, settle, with_counter};

pub struct DirectoryWrapper {
    driver: Arc<dyn ObjectDriver>,
    options: ClearOptions,
    retry: RetryPolicy,
}

impl DirectoryWrapper {
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
        let prefix = self.options.key_prefix.as_deref();
        let (deleted, result) = with_counter(progress, self.options.quiet, |counter| {
            clear_keys(&self.driver, target, prefix, &self.retry, counter, token)
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

    /// Directory buckets are only visible through ListDirectoryBuckets.
    pub async fn list_buckets(&self, token: &CancellationToken) -> Result<Vec<BucketSummary>, CallError> {
        self.retry
            .run(token, || self.driver.list_directory_buckets())
            .await
    }
}
