// tests/common/mod.rs
//
// In-memory storage drivers for the integration tests. Every driver logs
// its calls in order, tracks how many calls are in flight, and can be
// scripted to fail.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use s3clear::config::ClearOptions;
use s3clear::driver::{
    BucketSummary, DriverError, ItemFailure, ObjectDriver, ObjectRef, ObjectVersion, TableDriver,
    TokenPage, VectorDriver, VersionCursor, VersionPage,
};
use s3clear::error::ClearError;
use s3clear::selector::BucketPicker;
use s3clear::wrapper::BucketTarget;

// -----------------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------------

/// Increments an in-flight gauge for the lifetime of the guard and records
/// the peak.
pub struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Default for Gauge {
    fn default() -> Self {
        Self {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }
}

pub struct GaugeGuard<'a>(&'a Gauge);

impl Gauge {
    pub fn enter(&self) -> GaugeGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        GaugeGuard(self)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }
}

impl Drop for GaugeGuard<'_> {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

fn page_index(marker: Option<&str>) -> usize {
    marker
        .and_then(|m| m.strip_prefix("page-"))
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

fn page_marker(idx: usize, len: usize) -> Option<String> {
    (idx + 1 < len).then(|| format!("page-{}", idx + 1))
}

fn page_of<T: Clone>(pages: Option<&Vec<Vec<T>>>, token: Option<&str>) -> TokenPage<T> {
    let Some(pages) = pages else {
        return TokenPage {
            items: Vec::new(),
            next_token: None,
        };
    };
    let idx = page_index(token);
    TokenPage {
        items: pages.get(idx).cloned().unwrap_or_default(),
        next_token: page_marker(idx, pages.len()),
    }
}

pub fn quiet() -> ClearOptions {
    ClearOptions {
        quiet: true,
        ..ClearOptions::default()
    }
}

pub fn forced() -> ClearOptions {
    ClearOptions {
        force: true,
        quiet: true,
        ..ClearOptions::default()
    }
}

pub fn version(key: &str, id: &str, latest: bool) -> ObjectVersion {
    ObjectVersion {
        key: key.into(),
        version_id: Some(id.into()),
        is_latest: latest,
    }
}

pub fn failure(code: &str, key: &str, version_id: Option<&str>) -> ItemFailure {
    ItemFailure {
        code: code.into(),
        key: key.into(),
        version_id: version_id.map(str::to_owned),
        message: format!("{code} for {key}"),
    }
}

pub fn slow_down() -> DriverError {
    DriverError::service("SlowDown", 503, "StatusCode: 503, SlowDown: Please reduce your request rate.")
}

pub fn access_denied() -> DriverError {
    DriverError::service("AccessDenied", 403, "StatusCode: 403, AccessDenied: Access Denied")
}

pub fn too_many_requests() -> DriverError {
    DriverError::service("TooManyRequestsException", 429, "StatusCode: 429, rate exceeded")
}

// -----------------------------------------------------------------------------
// Object driver
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectCall {
    ListVersions { bucket: String, prefix: Option<String> },
    ListObjects { bucket: String, prefix: Option<String> },
    DeleteObjects { bucket: String, objects: Vec<ObjectRef> },
    DeleteBucket(String),
    ListBuckets,
    ListDirectoryBuckets,
}

#[derive(Default)]
pub struct MockObjectDriver {
    pub buckets: Vec<BucketSummary>,
    pub version_pages: HashMap<String, Vec<VersionPage>>,
    pub key_pages: HashMap<String, Vec<Vec<String>>>,
    pub non_versioning: bool,
    /// Delay applied to every list and delete call.
    pub delay: Option<Duration>,
    /// Scripted per-item failures, one entry per DeleteObjects call.
    pub item_failures: Mutex<VecDeque<Vec<ItemFailure>>>,
    /// Errors returned by the next list calls, in order.
    pub list_errors: Mutex<VecDeque<DriverError>>,
    /// Errors returned by the next DeleteObjects calls, in order.
    pub delete_errors: Mutex<VecDeque<DriverError>>,
    pub calls: Mutex<Vec<ObjectCall>>,
    pub deleted: AtomicU64,
    pub list_gauge: Gauge,
    pub delete_gauge: Gauge,
}

impl MockObjectDriver {
    pub fn with_versions(bucket: &str, pages: Vec<VersionPage>) -> Self {
        let mut driver = Self {
            buckets: vec![BucketSummary::named(bucket)],
            ..Self::default()
        };
        driver.version_pages.insert(bucket.to_string(), pages);
        driver
    }

    pub fn with_keys(bucket: &str, pages: Vec<Vec<&str>>) -> Self {
        let mut driver = Self {
            buckets: vec![BucketSummary::named(bucket)],
            ..Self::default()
        };
        driver.key_pages.insert(
            bucket.to_string(),
            pages
                .into_iter()
                .map(|p| p.into_iter().map(str::to_owned).collect())
                .collect(),
        );
        driver
    }

    pub fn calls(&self) -> Vec<ObjectCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn delete_batches(&self, bucket: &str) -> Vec<Vec<ObjectRef>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ObjectCall::DeleteObjects { bucket: b, objects } if b == bucket => Some(objects),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: impl Fn(&ObjectCall) -> bool) -> usize {
        self.calls().iter().filter(|c| wanted(c)).count()
    }

    fn log(&self, call: ObjectCall) {
        self.calls.lock().unwrap().push(call);
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ObjectDriver for MockObjectDriver {
    async fn list_object_versions(
        &self,
        bucket: &str,
        cursor: Option<&VersionCursor>,
        prefix: Option<&str>,
    ) -> Result<VersionPage, DriverError> {
        let _guard = self.list_gauge.enter();
        self.log(ObjectCall::ListVersions {
            bucket: bucket.into(),
            prefix: prefix.map(str::to_owned),
        });
        self.pause().await;
        if let Some(err) = self.list_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        let Some(pages) = self.version_pages.get(bucket) else {
            return Ok(VersionPage::default());
        };
        let idx = page_index(cursor.and_then(|c| c.key_marker.as_deref()));
        let mut page = pages.get(idx).cloned().unwrap_or_default();
        page.next = page_marker(idx, pages.len()).map(|marker| VersionCursor {
            key_marker: Some(marker),
            version_id_marker: None,
        });
        Ok(page)
    }

    async fn list_objects(
        &self,
        bucket: &str,
        token: Option<&str>,
        prefix: Option<&str>,
    ) -> Result<TokenPage<String>, DriverError> {
        let _guard = self.list_gauge.enter();
        self.log(ObjectCall::ListObjects {
            bucket: bucket.into(),
            prefix: prefix.map(str::to_owned),
        });
        self.pause().await;
        if let Some(err) = self.list_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(page_of(self.key_pages.get(bucket), token))
    }

    async fn delete_objects(
        &self,
        bucket: &str,
        objects: &[ObjectRef],
    ) -> Result<Vec<ItemFailure>, DriverError> {
        let _guard = self.delete_gauge.enter();
        self.log(ObjectCall::DeleteObjects {
            bucket: bucket.into(),
            objects: objects.to_vec(),
        });
        self.pause().await;
        if let Some(err) = self.delete_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        let failures = self.item_failures.lock().unwrap().pop_front().unwrap_or_default();
        self.deleted
            .fetch_add(objects.len().saturating_sub(failures.len()) as u64, Ordering::SeqCst);
        Ok(failures)
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), DriverError> {
        self.log(ObjectCall::DeleteBucket(bucket.into()));
        Ok(())
    }

    async fn list_buckets(&self) -> Result<Vec<BucketSummary>, DriverError> {
        self.log(ObjectCall::ListBuckets);
        Ok(self.buckets.clone())
    }

    async fn list_directory_buckets(&self) -> Result<Vec<BucketSummary>, DriverError> {
        self.log(ObjectCall::ListDirectoryBuckets);
        Ok(self.buckets.clone())
    }

    async fn get_bucket_location(&self, _bucket: &str) -> Result<String, DriverError> {
        Ok("us-east-1".into())
    }

    fn supports_versioning(&self) -> bool {
        !self.non_versioning
    }
}

// -----------------------------------------------------------------------------
// Table driver
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableCall {
    ListNamespaces,
    ListTables(String),
    DeleteTable(String, String),
    DeleteNamespace(String),
    DeleteTableBucket(String),
}

#[derive(Default)]
pub struct MockTableDriver {
    pub buckets: Vec<BucketSummary>,
    /// Namespaces in listing order, each with its tables.
    pub namespaces: Vec<(String, Vec<String>)>,
    pub delete_errors: Mutex<VecDeque<DriverError>>,
    pub calls: Mutex<Vec<TableCall>>,
    pub delete_gauge: Gauge,
}

impl MockTableDriver {
    pub fn new(arn: &str, namespaces: Vec<(&str, Vec<&str>)>) -> Self {
        Self {
            buckets: vec![BucketSummary {
                name: s3clear::wrapper::table_bucket_name(arn).to_string(),
                locator: arn.to_string(),
                region: None,
            }],
            namespaces: namespaces
                .into_iter()
                .map(|(ns, tables)| (ns.to_string(), tables.into_iter().map(str::to_owned).collect()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<TableCall> {
        self.calls.lock().unwrap().clone()
    }

    fn log(&self, call: TableCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl TableDriver for MockTableDriver {
    async fn list_table_buckets(&self) -> Result<Vec<BucketSummary>, DriverError> {
        Ok(self.buckets.clone())
    }

    async fn list_namespaces(
        &self,
        _table_bucket_arn: &str,
        token: Option<&str>,
    ) -> Result<TokenPage<String>, DriverError> {
        self.log(TableCall::ListNamespaces);
        // one namespace per page
        let pages: Vec<Vec<String>> = self.namespaces.iter().map(|(ns, _)| vec![ns.clone()]).collect();
        Ok(page_of(Some(&pages), token))
    }

    async fn list_tables(
        &self,
        _table_bucket_arn: &str,
        namespace: &str,
        token: Option<&str>,
    ) -> Result<TokenPage<String>, DriverError> {
        self.log(TableCall::ListTables(namespace.into()));
        let tables = self
            .namespaces
            .iter()
            .find(|(ns, _)| ns == namespace)
            .map(|(_, t)| vec![t.clone()]);
        Ok(page_of(tables.as_ref(), token))
    }

    async fn delete_table(
        &self,
        _table_bucket_arn: &str,
        namespace: &str,
        name: &str,
    ) -> Result<(), DriverError> {
        let _guard = self.delete_gauge.enter();
        tokio::task::yield_now().await;
        if let Some(err) = self.delete_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.log(TableCall::DeleteTable(namespace.into(), name.into()));
        Ok(())
    }

    async fn delete_namespace(
        &self,
        _table_bucket_arn: &str,
        namespace: &str,
    ) -> Result<(), DriverError> {
        self.log(TableCall::DeleteNamespace(namespace.into()));
        Ok(())
    }

    async fn delete_table_bucket(&self, table_bucket_arn: &str) -> Result<(), DriverError> {
        self.log(TableCall::DeleteTableBucket(table_bucket_arn.into()));
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Vector driver
// -----------------------------------------------------------------------------

#[derive(Default)]
pub struct MockVectorDriver {
    pub buckets: Vec<BucketSummary>,
    pub index_pages: Vec<Vec<String>>,
    pub delay: Option<Duration>,
    /// Errors returned by the next DeleteIndex calls, in order.
    pub delete_errors: Mutex<VecDeque<DriverError>>,
    pub delete_attempts: AtomicUsize,
    pub deleted: Mutex<Vec<String>>,
    pub bucket_deletes: Mutex<Vec<String>>,
    pub list_prefixes: Mutex<Vec<Option<String>>>,
    pub delete_gauge: Gauge,
}

impl MockVectorDriver {
    pub fn new(bucket: &str, page_sizes: &[usize]) -> Self {
        let mut n = 0;
        let index_pages = page_sizes
            .iter()
            .map(|size| {
                (0..*size)
                    .map(|_| {
                        n += 1;
                        format!("index-{n:04}")
                    })
                    .collect()
            })
            .collect();
        Self {
            buckets: vec![BucketSummary::named(bucket)],
            index_pages,
            ..Self::default()
        }
    }

    pub fn deleted_count(&self) -> usize {
        self.deleted.lock().unwrap().len()
    }
}

#[async_trait]
impl VectorDriver for MockVectorDriver {
    async fn list_vector_buckets(&self) -> Result<Vec<BucketSummary>, DriverError> {
        Ok(self.buckets.clone())
    }

    async fn list_indexes(
        &self,
        _bucket: &str,
        token: Option<&str>,
        prefix: Option<&str>,
    ) -> Result<TokenPage<String>, DriverError> {
        self.list_prefixes.lock().unwrap().push(prefix.map(str::to_owned));
        Ok(page_of(Some(&self.index_pages), token))
    }

    async fn delete_index(&self, _bucket: &str, index: &str) -> Result<(), DriverError> {
        let _guard = self.delete_gauge.enter();
        self.delete_attempts.fetch_add(1, Ordering::SeqCst);
        match self.delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }
        if let Some(err) = self.delete_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.deleted.lock().unwrap().push(index.to_string());
        Ok(())
    }

    async fn delete_vector_bucket(&self, bucket: &str) -> Result<(), DriverError> {
        self.bucket_deletes.lock().unwrap().push(bucket.to_string());
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Picker
// -----------------------------------------------------------------------------

/// Answers with a fixed keyword and picks candidates by name.
pub struct ScriptedPicker {
    pub keyword: String,
    pub choose: Vec<String>,
    pub offered: Arc<Mutex<Vec<String>>>,
}

impl ScriptedPicker {
    pub fn new(keyword: &str, choose: &[&str]) -> Self {
        Self {
            keyword: keyword.into(),
            choose: choose.iter().map(|s| s.to_string()).collect(),
            offered: Arc::default(),
        }
    }

    pub fn offered(&self) -> Vec<String> {
        self.offered.lock().unwrap().clone()
    }
}

#[async_trait]
impl BucketPicker for ScriptedPicker {
    async fn keyword(&self) -> Result<String, ClearError> {
        Ok(self.keyword.clone())
    }

    async fn pick(&self, candidates: &[BucketTarget]) -> Result<Vec<BucketTarget>, ClearError> {
        *self.offered.lock().unwrap() = candidates.iter().map(|t| t.name.clone()).collect();
        Ok(candidates
            .iter()
            .filter(|t| self.choose.contains(&t.name))
            .cloned()
            .collect())
    }
}
