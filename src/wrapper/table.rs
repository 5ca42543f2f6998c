// src/wrapper/table.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Table buckets: namespaces of tables.
//!
//! Namespaces are cleared one after another. Inside a namespace tables are
//! deleted at [`TABLE_DELETE_CONCURRENCY`] at a time, and the namespace is
//! dropped once its last table is gone. The table APIs throttle early, so
//! nothing here runs wide.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::concurrency::TaskGroup;
use crate::config::ClearOptions;
use crate::constants::TABLE_DELETE_CONCURRENCY;
use crate::driver::{BucketSummary, TableDriver};
use crate::error::{CallError, ClearError};
use crate::progress::{CountHandle, ProgressSender};
use crate::retry::RetryPolicy;

use super::batch::join_error;
use super::{BucketTarget, settle, with_counter};

pub struct TableWrapper {
    driver: Arc<dyn TableDriver>,
    options: ClearOptions,
    retry: RetryPolicy,
}

impl TableWrapper {
    pub fn new(driver: Arc<dyn TableDriver>, options: ClearOptions) -> Self {
        Self::with_retry(driver, options, RetryPolicy::s3_tables())
    }

    pub fn with_retry(driver: Arc<dyn TableDriver>, options: ClearOptions, retry: RetryPolicy) -> Self {
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
            self.clear_namespaces(target, counter, token)
        })
        .await;
        debug!("{}: {} tables deleted", target.name, deleted);
        settle(result, token, &target.name)?;

        if self.options.force {
            self.retry
                .run(token, || self.driver.delete_table_bucket(&target.locator))
                .await
                .map_err(|e| ClearError::delete(&target.name, e))?;
        }
        Ok(())
    }

    async fn clear_namespaces(
        &self,
        target: &BucketTarget,
        counter: CountHandle,
        token: &CancellationToken,
    ) -> Result<(), ClearError> {
        let mut next: Option<String> = None;
        loop {
            let page = self
                .retry
                .run(token, || self.driver.list_namespaces(&target.locator, next.as_deref()))
                .await
                .map_err(|e| ClearError::list(&target.name, e))?;
            for namespace in &page.items {
                self.clear_namespace(target, namespace, &counter, token).await?;
            }
            match page.next_token {
                Some(t) => next = Some(t),
                None => return Ok(()),
            }
        }
    }

    async fn clear_namespace(
        &self,
        target: &BucketTarget,
        namespace: &str,
        counter: &CountHandle,
        token: &CancellationToken,
    ) -> Result<(), ClearError> {
        let mut group: TaskGroup<ClearError> = TaskGroup::with_limit(token, TABLE_DELETE_CONCURRENCY);
        let mut next: Option<String> = None;
        loop {
            let listed = self
                .retry
                .run(group.token(), || {
                    self.driver
                        .list_tables(&target.locator, namespace, next.as_deref())
                })
                .await;
            let page = match listed {
                Ok(page) => page,
                Err(e) => {
                    group.fail(ClearError::list(&target.name, e));
                    break;
                }
            };
            debug!("{}/{}: listed {} tables", target.name, namespace, page.items.len());

            let mut accepted = true;
            for table in page.items {
                let driver = self.driver.clone();
                let retry = self.retry.clone();
                let counter = counter.clone();
                let worker_token = group.token().clone();
                let arn = target.locator.clone();
                let resource = target.name.clone();
                let namespace = namespace.to_string();
                accepted = group
                    .spawn(async move {
                        retry
                            .run(&worker_token, || driver.delete_table(&arn, &namespace, &table))
                            .await
                            .map_err(|e| ClearError::delete(&resource, e))?;
                        counter.add(1);
                        Ok(())
                    })
                    .await;
                if !accepted {
                    group.fail(ClearError::canceled(&target.name));
                    break;
                }
            }
            if !accepted {
                break;
            }
            match page.next_token {
                Some(t) => next = Some(t),
                None => break,
            }
        }
        group.wait(join_error(target)).await?;

        self.retry
            .run(token, || self.driver.delete_namespace(&target.locator, namespace))
            .await
            .map_err(|e| ClearError::delete(&target.name, e))?;
        debug!("{}: namespace {} deleted", target.name, namespace);
        Ok(())
    }

    pub async fn list_buckets(&self, token: &CancellationToken) -> Result<Vec<BucketSummary>, CallError> {
        self.retry.run(token, || self.driver.list_table_buckets()).await
    }
}
