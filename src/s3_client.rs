// src/s3_client.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Shared SDK configuration and client factories.
//!
//! The endpoint override applies to the S3 client only; table and vector
//! clients always talk to the AWS endpoints of the resolved region.

use std::time::Duration;

use aws_config::meta::region::RegionProviderChain;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_s3::config::Region;
use tracing::debug;

use crate::config::ConnectionOptions;
use crate::constants::DEFAULT_REGION;

/// Resolve region, profile and timeouts into an [`SdkConfig`].
///
/// Region order: explicit flag, then the SDK default chain (env, profile),
/// then [`DEFAULT_REGION`].
pub async fn load_sdk_config(conn: &ConnectionOptions) -> SdkConfig {
    let region = RegionProviderChain::first_try(conn.region.clone().map(Region::new))
        .or_default_provider()
        .or_else(Region::new(DEFAULT_REGION));

    let timeout_config = TimeoutConfig::builder()
        .connect_timeout(Duration::from_secs(5))
        .build();

    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(region)
        .timeout_config(timeout_config);
    if let Some(profile) = &conn.profile {
        loader = loader.profile_name(profile);
    }

    let cfg = loader.load().await;
    debug!("loaded SDK config, region={:?}", cfg.region());
    cfg
}

/// S3 client, honoring an endpoint override with path-style addressing.
pub fn s3_client(cfg: &SdkConfig, endpoint_url: Option<&str>) -> aws_sdk_s3::Client {
    let mut builder = aws_sdk_s3::config::Builder::from(cfg);
    if let Some(endpoint) = endpoint_url.filter(|e| !e.is_empty()) {
        // S3-compatible services rarely support virtual-hosted style
        builder = builder.endpoint_url(endpoint).force_path_style(true);
    }
    aws_sdk_s3::Client::from_conf(builder.build())
}

/// S3 client pinned to `region`, used for buckets outside the default region.
pub fn s3_client_for_region(cfg: &SdkConfig, region: &str) -> aws_sdk_s3::Client {
    let conf = aws_sdk_s3::config::Builder::from(cfg)
        .region(Region::new(region.to_string()))
        .build();
    aws_sdk_s3::Client::from_conf(conf)
}

pub fn s3tables_client(cfg: &SdkConfig) -> aws_sdk_s3tables::Client {
    aws_sdk_s3tables::Client::new(cfg)
}

pub fn s3vectors_client(cfg: &SdkConfig) -> aws_sdk_s3vectors::Client {
    aws_sdk_s3vectors::Client::new(cfg)
}

/// Map a GetBucketLocation constraint to a region name.
pub fn normalize_location(constraint: Option<&str>) -> String {
    match constraint {
        None | Some("") => DEFAULT_REGION.to_string(),
        Some("EU") => "eu-west-1".to_string(),
        Some(region) => region.to_string(),
    }
}
