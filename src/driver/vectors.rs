// src/driver/vectors.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! [`VectorDriver`] on top of `aws-sdk-s3vectors`.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3vectors::Client;

use super::{BucketSummary, DriverError, TokenPage, VectorDriver, from_sdk};
use crate::s3_client::s3vectors_client;

pub struct SdkVectorDriver {
    client: Client,
}

impl SdkVectorDriver {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: s3vectors_client(config),
        }
    }
}

#[async_trait]
impl VectorDriver for SdkVectorDriver {
    async fn list_vector_buckets(&self) -> Result<Vec<BucketSummary>, DriverError> {
        let mut buckets = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let resp = self
                .client
                .list_vector_buckets()
                .set_next_token(token.take())
                .send()
                .await
                .map_err(from_sdk)?;
            buckets.extend(
                resp.vector_buckets()
                    .iter()
                    .map(|b| BucketSummary::named(b.vector_bucket_name())),
            );
            match resp.next_token() {
                Some(next) if !next.is_empty() => token = Some(next.to_string()),
                _ => break,
            }
        }
        Ok(buckets)
    }

    async fn list_indexes(
        &self,
        bucket: &str,
        token: Option<&str>,
        prefix: Option<&str>,
    ) -> Result<TokenPage<String>, DriverError> {
        let resp = self
            .client
            .list_indexes()
            .vector_bucket_name(bucket)
            .set_next_token(token.map(str::to_owned))
            .set_prefix(prefix.map(str::to_owned))
            .send()
            .await
            .map_err(from_sdk)?;
        let items = resp
            .indexes()
            .iter()
            .map(|i| i.index_name().to_string())
            .collect();
        Ok(TokenPage {
            items,
            next_token: resp
                .next_token()
                .filter(|t| !t.is_empty())
                .map(str::to_owned),
        })
    }

    async fn delete_index(&self, bucket: &str, index: &str) -> Result<(), DriverError> {
        self.client
            .delete_index()
            .vector_bucket_name(bucket)
            .index_name(index)
            .send()
            .await
            .map_err(from_sdk)?;
        Ok(())
    }

    async fn delete_vector_bucket(&self, bucket: &str) -> Result<(), DriverError> {
        self.client
            .delete_vector_bucket()
            .vector_bucket_name(bucket)
            .send()
            .await
            .map_err(from_sdk)?;
        Ok(())
    }
}
