// src/driver/mod.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Storage driver abstraction.
//!
//! One trait per item model: general/directory object buckets share
//! [`ObjectDriver`], table buckets use [`TableDriver`] and vector buckets use
//! [`VectorDriver`]. The SDK-backed implementations live in the submodules;
//! tests plug in in-memory mocks.

use async_trait::async_trait;
use aws_smithy_runtime_api::client::orchestrator::HttpResponse;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_types::error::display::DisplayErrorContext;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use thiserror::Error;

pub mod s3;
pub mod tables;
pub mod vectors;

pub use s3::SdkObjectDriver;
pub use tables::SdkTableDriver;
pub use vectors::SdkVectorDriver;

// -----------------------------------------------------------------------------
// Errors
// -----------------------------------------------------------------------------

/// Where in the request lifecycle a driver call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverErrorKind {
    /// The request could not be built.
    Construction,
    /// The request timed out.
    Timeout,
    /// The request never reached the service (connect, DNS, TLS).
    Dispatch,
    /// A response arrived but could not be parsed.
    Response,
    /// The service answered with a modeled or unmodeled error.
    Service,
    Other,
}

/// Normalized failure of a single driver call.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct DriverError {
    pub kind: DriverErrorKind,
    pub code: Option<String>,
    pub status: Option<u16>,
    pub message: String,
}

impl DriverError {
    pub fn new(kind: DriverErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            status: None,
            message: message.into(),
        }
    }

    /// A service error carrying an error code and HTTP status.
    pub fn service(code: &str, status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: DriverErrorKind::Service,
            code: Some(code.to_string()),
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }
}

/// Flatten an SDK error into a [`DriverError`], keeping code, status and the
/// full source chain.
pub(crate) fn from_sdk<E>(err: SdkError<E, HttpResponse>) -> DriverError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let kind = match &err {
        SdkError::ConstructionFailure(_) => DriverErrorKind::Construction,
        SdkError::TimeoutError(_) => DriverErrorKind::Timeout,
        SdkError::DispatchFailure(_) => DriverErrorKind::Dispatch,
        SdkError::ResponseError(_) => DriverErrorKind::Response,
        SdkError::ServiceError(_) => DriverErrorKind::Service,
        _ => DriverErrorKind::Other,
    };
    let status = err.raw_response().map(|r| r.status().as_u16());
    let code = err.code().map(str::to_owned);
    let mut message = DisplayErrorContext(&err).to_string();
    if let Some(status) = status {
        message = format!("StatusCode: {status}, {message}");
    }
    DriverError {
        kind,
        code,
        status,
        message,
    }
}

// -----------------------------------------------------------------------------
// Listing and item types
// -----------------------------------------------------------------------------

/// A bucket as reported by a list-buckets call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSummary {
    pub name: String,
    /// Identifier passed to subsequent calls: the name for object and vector
    /// buckets, the ARN for table buckets.
    pub locator: String,
    pub region: Option<String>,
}

impl BucketSummary {
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            locator: name.clone(),
            name,
            region: None,
        }
    }
}

/// One deletable object or object version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub key: String,
    pub version_id: Option<String>,
}

impl ObjectRef {
    pub fn new(key: impl Into<String>, version_id: Option<&str>) -> Self {
        Self {
            key: key.into(),
            version_id: version_id.map(str::to_owned),
        }
    }
}

/// An entry of the version listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectVersion {
    pub key: String,
    pub version_id: Option<String>,
    pub is_latest: bool,
}

/// Cursor pair for the version listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionCursor {
    pub key_marker: Option<String>,
    pub version_id_marker: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct VersionPage {
    pub versions: Vec<ObjectVersion>,
    pub delete_markers: Vec<ObjectRef>,
    /// `None` on the last page.
    pub next: Option<VersionCursor>,
}

/// A page of a single-token listing (object keys, table names, index names,
/// namespaces).
#[derive(Debug, Clone, Default)]
pub struct TokenPage<T> {
    pub items: Vec<T>,
    /// `None` on the last page.
    pub next_token: Option<String>,
}

/// Per-item failure reported inside a successful DeleteObjects response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub code: String,
    pub key: String,
    pub version_id: Option<String>,
    pub message: String,
}

impl ItemFailure {
    pub fn matches(&self, object: &ObjectRef) -> bool {
        self.key == object.key && self.version_id == object.version_id
    }
}

// -----------------------------------------------------------------------------
// Driver traits
// -----------------------------------------------------------------------------

/// General purpose and directory object buckets.
#[async_trait]
pub trait ObjectDriver: Send + Sync {
    /// ListObjectVersions: versions and delete markers of one page.
    async fn list_object_versions(
        &self,
        bucket: &str,
        cursor: Option<&VersionCursor>,
        prefix: Option<&str>,
    ) -> Result<VersionPage, DriverError>;

    /// ListObjectsV2: keys of one page.
    async fn list_objects(
        &self,
        bucket: &str,
        token: Option<&str>,
        prefix: Option<&str>,
    ) -> Result<TokenPage<String>, DriverError>;

    /// DeleteObjects for up to 1000 refs. `Ok` carries the per-item failures.
    async fn delete_objects(
        &self,
        bucket: &str,
        objects: &[ObjectRef],
    ) -> Result<Vec<ItemFailure>, DriverError>;

    async fn delete_bucket(&self, bucket: &str) -> Result<(), DriverError>;

    async fn list_buckets(&self) -> Result<Vec<BucketSummary>, DriverError>;

    async fn list_directory_buckets(&self) -> Result<Vec<BucketSummary>, DriverError>;

    async fn get_bucket_location(&self, bucket: &str) -> Result<String, DriverError>;

    /// False for S3-compatible endpoints without ListObjectVersions.
    fn supports_versioning(&self) -> bool {
        true
    }
}

/// Table buckets: namespaces of tables.
#[async_trait]
pub trait TableDriver: Send + Sync {
    async fn list_table_buckets(&self) -> Result<Vec<BucketSummary>, DriverError>;

    async fn list_namespaces(
        &self,
        table_bucket_arn: &str,
        token: Option<&str>,
    ) -> Result<TokenPage<String>, DriverError>;

    async fn list_tables(
        &self,
        table_bucket_arn: &str,
        namespace: &str,
        token: Option<&str>,
    ) -> Result<TokenPage<String>, DriverError>;

    async fn delete_table(
        &self,
        table_bucket_arn: &str,
        namespace: &str,
        name: &str,
    ) -> Result<(), DriverError>;

    async fn delete_namespace(
        &self,
        table_bucket_arn: &str,
        namespace: &str,
    ) -> Result<(), DriverError>;

    async fn delete_table_bucket(&self, table_bucket_arn: &str) -> Result<(), DriverError>;
}

/// Vector buckets: vector indexes.
#[async_trait]
pub trait VectorDriver: Send + Sync {
    async fn list_vector_buckets(&self) -> Result<Vec<BucketSummary>, DriverError>;

    async fn list_indexes(
        &self,
        bucket: &str,
        token: Option<&str>,
        prefix: Option<&str>,
    ) -> Result<TokenPage<String>, DriverError>;

    async fn delete_index(&self, bucket: &str, index: &str) -> Result<(), DriverError>;

    async fn delete_vector_bucket(&self, bucket: &str) -> Result<(), DriverError>;
}

/// Heuristic for S3-compatible endpoints: anything not served from
/// `amazonaws.com` is assumed to lack ListObjectVersions.
pub fn endpoint_supports_versioning(endpoint: Option<&str>) -> bool {
    let Some(endpoint) = endpoint else {
        return true;
    };
    let host = endpoint
        .split_once("://")
        .map_or(endpoint, |(_, rest)| rest)
        .split(['/', ':'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    host == "amazonaws.com" || host.ends_with(".amazonaws.com") || host.ends_with(".amazonaws.com.cn")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_heuristic() {
        assert!(endpoint_supports_versioning(None));
        assert!(endpoint_supports_versioning(Some("https://s3.eu-west-1.amazonaws.com")));
        assert!(endpoint_supports_versioning(Some("https://s3.cn-north-1.amazonaws.com.cn")));
        assert!(!endpoint_supports_versioning(Some("https://acct.r2.cloudflarestorage.com")));
        assert!(!endpoint_supports_versioning(Some("http://localhost:9000")));
        assert!(!endpoint_supports_versioning(Some("https://amazonaws.com.evil.example")));
    }

    #[test]
    fn test_item_failure_matches_version() {
        let failure = ItemFailure {
            code: "AccessDenied".into(),
            key: "K1".into(),
            version_id: Some("V1".into()),
            message: "denied".into(),
        };
        assert!(failure.matches(&ObjectRef::new("K1", Some("V1"))));
        assert!(!failure.matches(&ObjectRef::new("K1", None)));
        assert!(!failure.matches(&ObjectRef::new("K2", Some("V1"))));
    }
}
