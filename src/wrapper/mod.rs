// src/wrapper/mod.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Backend wrappers: the clearing pipeline mapped onto each item model.
//!
//! [`Wrapper`] is a closed set of variants chosen from the run's backend.
//! Every variant implements the same operations: clear a bucket, list buckets
//! matching a keyword, check that named buckets exist, and format the
//! per-bucket messages.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::{Backend, ClearOptions, RunOptions};
use crate::driver::{BucketSummary, SdkObjectDriver, SdkTableDriver, SdkVectorDriver};
use crate::error::ClearError;
use crate::progress::{CountHandle, DeletionCounter, GREEN, ProgressSender, RED, RESET};
use crate::s3_client::load_sdk_config;

mod batch;
pub mod directory;
pub mod object;
pub mod table;
pub mod vector;

pub use directory::DirectoryWrapper;
pub use object::ObjectWrapper;
pub use table::TableWrapper;
pub use vector::VectorWrapper;

/// A selected bucket. `locator` is what driver calls receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketTarget {
    pub name: String,
    pub locator: String,
    pub backend: Backend,
}

impl BucketTarget {
    pub fn new(name: impl Into<String>, locator: impl Into<String>, backend: Backend) -> Self {
        Self {
            name: name.into(),
            locator: locator.into(),
            backend,
        }
    }

    fn from_summary(summary: BucketSummary, backend: Backend) -> Self {
        Self::new(summary.name, summary.locator, backend)
    }
}

/// Result of an existence check. Found targets are kept even when some
/// names are missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketCheck {
    pub found: Vec<BucketTarget>,
    pub missing: Vec<String>,
}

impl BucketCheck {
    pub fn into_result(self) -> Result<Vec<BucketTarget>, ClearError> {
        if self.missing.is_empty() {
            Ok(self.found)
        } else {
            Err(ClearError::NotFound(format!(
                "The following buckets are not found: {}",
                self.missing.join(", ")
            )))
        }
    }
}

/// Display name of a table bucket ARN (`arn:...:bucket/<name>`).
pub fn table_bucket_name(arn: &str) -> &str {
    arn.rsplit_once("bucket/").map_or(arn, |(_, name)| name)
}

fn summary_matches(summary: &BucketSummary, requested: &str) -> bool {
    summary.locator == requested
        || summary.name == requested
        || summary.name == table_bucket_name(requested)
}

/// Split `requested` into known and unknown buckets, keeping request order.
pub fn check_names(
    listed: &[BucketSummary],
    requested: &[String],
    backend: Backend,
) -> BucketCheck {
    let mut check = BucketCheck::default();
    for name in requested {
        match listed.iter().find(|s| summary_matches(s, name)) {
            Some(summary) => {
                if !check.found.iter().any(|t| t.locator == summary.locator) {
                    check.found.push(BucketTarget::from_summary(summary.clone(), backend));
                }
            }
            None => check.missing.push(name.clone()),
        }
    }
    check
}

/// Buckets whose lowercase name contains the lowercase `keyword`.
pub fn filter_matching(
    listed: Vec<BucketSummary>,
    keyword: &str,
    backend: Backend,
) -> Result<Vec<BucketTarget>, ClearError> {
    let needle = keyword.to_lowercase();
    let matched: Vec<BucketTarget> = listed
        .into_iter()
        .filter(|s| s.name.to_lowercase().contains(&needle))
        .map(|s| BucketTarget::from_summary(s, backend))
        .collect();
    if matched.is_empty() {
        return Err(ClearError::NotFound(format!(
            "No buckets matching the keyword \"{keyword}\""
        )));
    }
    Ok(matched)
}

/// Run the item phase of a clear with a deletion counter attached and
/// return the counted total together with the phase result.
pub(crate) async fn with_counter<F, Fut>(
    progress: ProgressSender,
    quiet: bool,
    items: F,
) -> (u64, Result<(), ClearError>)
where
    F: FnOnce(CountHandle) -> Fut,
    Fut: Future<Output = Result<(), ClearError>>,
{
    let counter = DeletionCounter::start(progress, quiet);
    let result = items(counter.handle()).await;
    (counter.finish().await, result)
}

/// Report any failure after the root token fired as a cancellation.
pub(crate) fn settle(
    result: Result<(), ClearError>,
    token: &CancellationToken,
    resource: &str,
) -> Result<(), ClearError> {
    match result {
        Err(e) if token.is_cancelled() && !e.is_canceled() => {
            debug!("{} stopped by cancellation: {}", resource, e);
            Err(ClearError::canceled(resource))
        }
        other => other,
    }
}

/// One of the four backend wrappers.
pub enum Wrapper {
    Object(ObjectWrapper),
    DirectoryObject(DirectoryWrapper),
    Table(TableWrapper),
    Vector(VectorWrapper),
}

impl Wrapper {
    /// Build the wrapper for `opts.backend` on top of the AWS SDK drivers.
    pub async fn connect(opts: &RunOptions) -> Self {
        let sdk = load_sdk_config(&opts.connection).await;
        let clear = opts.clear.clone();
        match opts.backend {
            Backend::Object => {
                let driver = SdkObjectDriver::general(&sdk, opts.connection.endpoint_url.as_deref());
                Wrapper::Object(ObjectWrapper::new(Arc::new(driver), clear))
            }
            Backend::DirectoryObject => Wrapper::DirectoryObject(DirectoryWrapper::new(
                Arc::new(SdkObjectDriver::directory(&sdk)),
                clear,
            )),
            Backend::Table => {
                Wrapper::Table(TableWrapper::new(Arc::new(SdkTableDriver::new(&sdk)), clear))
            }
            Backend::Vector => {
                Wrapper::Vector(VectorWrapper::new(Arc::new(SdkVectorDriver::new(&sdk)), clear))
            }
        }
    }

    pub fn backend(&self) -> Backend {
        match self {
            Wrapper::Object(_) => Backend::Object,
            Wrapper::DirectoryObject(_) => Backend::DirectoryObject,
            Wrapper::Table(_) => Backend::Table,
            Wrapper::Vector(_) => Backend::Vector,
        }
    }

    pub fn options(&self) -> &ClearOptions {
        match self {
            Wrapper::Object(w) => w.options(),
            Wrapper::DirectoryObject(w) => w.options(),
            Wrapper::Table(w) => w.options(),
            Wrapper::Vector(w) => w.options(),
        }
    }

    /// Empty `target`, then delete it when forced. Deletion counts go to
    /// `progress`; the sender is dropped before this returns.
    pub async fn clear_bucket(
        &self,
        target: &BucketTarget,
        progress: ProgressSender,
        token: &CancellationToken,
    ) -> Result<(), ClearError> {
        match self {
            Wrapper::Object(w) => w.clear_bucket(target, progress, token).await,
            Wrapper::DirectoryObject(w) => w.clear_bucket(target, progress, token).await,
            Wrapper::Table(w) => w.clear_bucket(target, progress, token).await,
            Wrapper::Vector(w) => w.clear_bucket(target, progress, token).await,
        }
    }

    async fn list_all(&self, token: &CancellationToken) -> Result<Vec<BucketSummary>, ClearError> {
        let listed = match self {
            Wrapper::Object(w) => w.list_buckets(token).await,
            Wrapper::DirectoryObject(w) => w.list_buckets(token).await,
            Wrapper::Table(w) => w.list_buckets(token).await,
            Wrapper::Vector(w) => w.list_buckets(token).await,
        };
        let listed = listed.map_err(|e| ClearError::list("ListBuckets", e))?;
        debug!("listed {} {:?} buckets", listed.len(), self.backend());
        Ok(listed)
    }

    pub async fn list_buckets_matching(
        &self,
        keyword: &str,
        token: &CancellationToken,
    ) -> Result<Vec<BucketTarget>, ClearError> {
        filter_matching(self.list_all(token).await?, keyword, self.backend())
    }

    pub async fn check_buckets_exist(
        &self,
        names: &[String],
        token: &CancellationToken,
    ) -> Result<BucketCheck, ClearError> {
        let listed = self.list_all(token).await?;
        Ok(check_names(&listed, names, self.backend()))
    }

    // -------------------------------------------------------------------------
    // Messages
    // -------------------------------------------------------------------------

    fn noun(&self) -> &'static str {
        self.backend().item_noun()
    }

    pub fn checking_message(&self, name: &str) -> String {
        format!("{name} Checking...")
    }

    pub fn cleared_message(&self, name: &str, count: u64) -> String {
        format!("{name} Cleared!!: {count} {}.", self.noun())
    }

    pub fn deleted_message(&self, name: &str) -> String {
        format!("{name} Deleted!!")
    }

    pub fn live_clearing_message(&self, name: &str, count: u64) -> String {
        format!("{name} Clearing... {count} {}", self.noun())
    }

    pub fn live_cleared_message(&self, name: &str, count: u64, ok: bool) -> String {
        if ok {
            format!("{GREEN}{name} Cleared!!!: {count} {}{RESET}", self.noun())
        } else {
            format!(
                "{RED}{name} Errors occurred!!!: {count} {} deleted{RESET}",
                self.noun()
            )
        }
    }
}
