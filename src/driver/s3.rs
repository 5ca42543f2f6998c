// src/driver/s3.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! [`ObjectDriver`] on top of `aws-sdk-s3`.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::Client;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use tracing::debug;

use super::{
    BucketSummary, DriverError, DriverErrorKind, ItemFailure, ObjectDriver, ObjectRef,
    ObjectVersion, TokenPage, VersionCursor, VersionPage, endpoint_supports_versioning, from_sdk,
};
use crate::s3_client::{normalize_location, s3_client, s3_client_for_region};

pub struct SdkObjectDriver {
    config: SdkConfig,
    client: Client,
    /// Bucket regions learned from ListBuckets or GetBucketLocation.
    bucket_regions: Mutex<HashMap<String, String>>,
    /// One client per region outside the configured one.
    regional: Mutex<HashMap<String, Client>>,
    resolve_regions: bool,
    versioning: bool,
}

impl SdkObjectDriver {
    /// Driver for general purpose buckets. Without an endpoint override each
    /// bucket's calls are routed to the bucket's own region.
    pub fn general(config: &SdkConfig, endpoint_url: Option<&str>) -> Self {
        Self {
            config: config.clone(),
            client: s3_client(config, endpoint_url),
            bucket_regions: Mutex::new(HashMap::new()),
            regional: Mutex::new(HashMap::new()),
            resolve_regions: endpoint_url.is_none(),
            versioning: endpoint_supports_versioning(endpoint_url),
        }
    }

    /// Driver for directory buckets: zonal endpoints of the configured
    /// region, no versioning.
    pub fn directory(config: &SdkConfig) -> Self {
        Self {
            config: config.clone(),
            client: s3_client(config, None),
            bucket_regions: Mutex::new(HashMap::new()),
            regional: Mutex::new(HashMap::new()),
            resolve_regions: false,
            versioning: false,
        }
    }

    /// Record the regions reported alongside listed buckets.
    fn remember_regions(&self, buckets: &[BucketSummary]) {
        let mut known = self.bucket_regions.lock().unwrap_or_else(PoisonError::into_inner);
        for b in buckets {
            if let Some(region) = b.region.as_deref().filter(|r| !r.is_empty()) {
                known.insert(b.name.clone(), region.to_string());
            }
        }
    }

    fn known_region(&self, bucket: &str) -> Option<String> {
        self.bucket_regions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(bucket)
            .cloned()
    }

    fn client_in(&self, region: &str) -> Client {
        if self.config.region().is_some_and(|r| r.as_ref() == region) {
            return self.client.clone();
        }
        self.regional
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(region.to_string())
            .or_insert_with(|| {
                debug!("creating a client for region {}", region);
                s3_client_for_region(&self.config, region)
            })
            .clone()
    }

    async fn client_for(&self, bucket: &str) -> Result<Client, DriverError> {
        if !self.resolve_regions {
            return Ok(self.client.clone());
        }
        let region = match self.known_region(bucket) {
            Some(region) => region,
            None => {
                let region = self.get_bucket_location(bucket).await?;
                self.bucket_regions
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(bucket.to_string(), region.clone());
                region
            }
        };
        Ok(self.client_in(&region))
    }
}

fn build_error(err: impl std::fmt::Display) -> DriverError {
    DriverError::new(DriverErrorKind::Construction, err.to_string())
}

#[async_trait]
impl ObjectDriver for SdkObjectDriver {
    async fn list_object_versions(
        &self,
        bucket: &str,
        cursor: Option<&VersionCursor>,
        prefix: Option<&str>,
    ) -> Result<VersionPage, DriverError> {
        let client = self.client_for(bucket).await?;
        let resp = client
            .list_object_versions()
            .bucket(bucket)
            .set_key_marker(cursor.and_then(|c| c.key_marker.clone()))
            .set_version_id_marker(cursor.and_then(|c| c.version_id_marker.clone()))
            .set_prefix(prefix.map(str::to_owned))
            .send()
            .await
            .map_err(from_sdk)?;

        let versions = resp
            .versions()
            .iter()
            .filter_map(|v| {
                v.key().map(|key| ObjectVersion {
                    key: key.to_string(),
                    version_id: v.version_id().map(str::to_owned),
                    is_latest: v.is_latest().unwrap_or(false),
                })
            })
            .collect();
        let delete_markers = resp
            .delete_markers()
            .iter()
            .filter_map(|m| m.key().map(|key| ObjectRef::new(key, m.version_id())))
            .collect();

        let next = if resp.is_truncated().unwrap_or(false) {
            Some(VersionCursor {
                key_marker: resp.next_key_marker().map(str::to_owned),
                version_id_marker: resp.next_version_id_marker().map(str::to_owned),
            })
        } else {
            None
        };

        Ok(VersionPage {
            versions,
            delete_markers,
            next,
        })
    }

    async fn list_objects(
        &self,
        bucket: &str,
        token: Option<&str>,
        prefix: Option<&str>,
    ) -> Result<TokenPage<String>, DriverError> {
        let client = self.client_for(bucket).await?;
        let resp = client
            .list_objects_v2()
            .bucket(bucket)
            .set_continuation_token(token.map(str::to_owned))
            .set_prefix(prefix.map(str::to_owned))
            .send()
            .await
            .map_err(from_sdk)?;

        let items = resp
            .contents()
            .iter()
            .filter_map(|o| o.key().map(str::to_owned))
            .collect();
        let next_token = if resp.is_truncated().unwrap_or(false) {
            resp.next_continuation_token().map(str::to_owned)
        } else {
            None
        };
        Ok(TokenPage { items, next_token })
    }

    async fn delete_objects(
        &self,
        bucket: &str,
        objects: &[ObjectRef],
    ) -> Result<Vec<ItemFailure>, DriverError> {
        if objects.is_empty() {
            return Ok(Vec::new());
        }
        let client = self.client_for(bucket).await?;

        let identifiers = objects
            .iter()
            .map(|o| {
                ObjectIdentifier::builder()
                    .key(&o.key)
                    .set_version_id(o.version_id.clone())
                    .build()
                    .map_err(build_error)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let delete = Delete::builder()
            .set_objects(Some(identifiers))
            .quiet(true)
            .build()
            .map_err(build_error)?;

        let resp = client
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(from_sdk)?;

        Ok(resp
            .errors()
            .iter()
            .map(|e| ItemFailure {
                code: e.code().unwrap_or_default().to_string(),
                key: e.key().unwrap_or_default().to_string(),
                version_id: e.version_id().map(str::to_owned),
                message: e.message().unwrap_or_default().to_string(),
            })
            .collect())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), DriverError> {
        let client = self.client_for(bucket).await?;
        client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(from_sdk)?;
        Ok(())
    }

    async fn list_buckets(&self) -> Result<Vec<BucketSummary>, DriverError> {
        let mut buckets = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let resp = self
                .client
                .list_buckets()
                .set_continuation_token(token.clone())
                .send()
                .await
                .map_err(from_sdk)?;
            for b in resp.buckets() {
                if let Some(name) = b.name() {
                    buckets.push(BucketSummary {
                        region: b.bucket_region().map(str::to_owned),
                        ..BucketSummary::named(name)
                    });
                }
            }
            match resp.continuation_token() {
                Some(next) if !next.is_empty() => token = Some(next.to_string()),
                _ => break,
            }
        }
        self.remember_regions(&buckets);
        Ok(buckets)
    }

    async fn list_directory_buckets(&self) -> Result<Vec<BucketSummary>, DriverError> {
        let mut buckets = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let resp = self
                .client
                .list_directory_buckets()
                .set_continuation_token(token.clone())
                .send()
                .await
                .map_err(from_sdk)?;
            buckets.extend(resp.buckets().iter().filter_map(|b| b.name()).map(BucketSummary::named));
            match resp.continuation_token() {
                Some(next) if !next.is_empty() => token = Some(next.to_string()),
                _ => break,
            }
        }
        Ok(buckets)
    }

    async fn get_bucket_location(&self, bucket: &str) -> Result<String, DriverError> {
        let resp = self
            .client
            .get_bucket_location()
            .bucket(bucket)
            .send()
            .await
            .map_err(from_sdk)?;
        Ok(normalize_location(
            resp.location_constraint().map(|c| c.as_str()),
        ))
    }

    fn supports_versioning(&self) -> bool {
        self.versioning
    }
}
