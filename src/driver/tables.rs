// src/driver/tables.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! [`TableDriver`] on top of `aws-sdk-s3tables`.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3tables::Client;

use super::{BucketSummary, DriverError, TableDriver, TokenPage, from_sdk};
use crate::s3_client::s3tables_client;

pub struct SdkTableDriver {
    client: Client,
}

impl SdkTableDriver {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: s3tables_client(config),
        }
    }
}

fn next_token(token: Option<&str>) -> Option<String> {
    token.filter(|t| !t.is_empty()).map(str::to_owned)
}

#[async_trait]
impl TableDriver for SdkTableDriver {
    async fn list_table_buckets(&self) -> Result<Vec<BucketSummary>, DriverError> {
        let mut buckets = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let resp = self
                .client
                .list_table_buckets()
                .set_continuation_token(token.take())
                .send()
                .await
                .map_err(from_sdk)?;
            buckets.extend(resp.table_buckets().iter().map(|b| BucketSummary {
                name: b.name().to_string(),
                locator: b.arn().to_string(),
                region: None,
            }));
            token = next_token(resp.continuation_token());
            if token.is_none() {
                break;
            }
        }
        Ok(buckets)
    }

    async fn list_namespaces(
        &self,
        table_bucket_arn: &str,
        token: Option<&str>,
    ) -> Result<TokenPage<String>, DriverError> {
        let resp = self
            .client
            .list_namespaces()
            .table_bucket_arn(table_bucket_arn)
            .set_continuation_token(token.map(str::to_owned))
            .send()
            .await
            .map_err(from_sdk)?;
        // a namespace is a single-level path
        let items = resp
            .namespaces()
            .iter()
            .filter_map(|ns| ns.namespace().first().cloned())
            .collect();
        Ok(TokenPage {
            items,
            next_token: next_token(resp.continuation_token()),
        })
    }

    async fn list_tables(
        &self,
        table_bucket_arn: &str,
        namespace: &str,
        token: Option<&str>,
    ) -> Result<TokenPage<String>, DriverError> {
        let resp = self
            .client
            .list_tables()
            .table_bucket_arn(table_bucket_arn)
            .namespace(namespace)
            .set_continuation_token(token.map(str::to_owned))
            .send()
            .await
            .map_err(from_sdk)?;
        let items = resp.tables().iter().map(|t| t.name().to_string()).collect();
        Ok(TokenPage {
            items,
            next_token: next_token(resp.continuation_token()),
        })
    }

    async fn delete_table(
        &self,
        table_bucket_arn: &str,
        namespace: &str,
        name: &str,
    ) -> Result<(), DriverError> {
        self.client
            .delete_table()
            .table_bucket_arn(table_bucket_arn)
            .namespace(namespace)
            .name(name)
            .send()
            .await
            .map_err(from_sdk)?;
        Ok(())
    }

    async fn delete_namespace(
        &self,
        table_bucket_arn: &str,
        namespace: &str,
    ) -> Result<(), DriverError> {
        self.client
            .delete_namespace()
            .table_bucket_arn(table_bucket_arn)
            .namespace(namespace)
            .send()
            .await
            .map_err(from_sdk)?;
        Ok(())
    }

    async fn delete_table_bucket(&self, table_bucket_arn: &str) -> Result<(), DriverError> {
        self.client
            .delete_table_bucket()
            .table_bucket_arn(table_bucket_arn)
            .send()
            .await
            .map_err(from_sdk)?;
        Ok(())
    }
}
