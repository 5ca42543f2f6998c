// src/options.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Command-line flags and the rules that combine them into [`RunOptions`].

use clap::{ArgAction, Parser};
use tracing::warn;

use crate::config::{Backend, ClearOptions, Concurrency, ConnectionOptions, RunOptions};
use crate::error::ClearError;

#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about)]
pub struct Args {
    /// Bucket name or ARN; repeat for several buckets.
    #[arg(short = 'b', long = "bucketName", action = ArgAction::Append)]
    pub bucket_name: Vec<String>,

    /// Shared credentials/config profile.
    #[arg(short = 'p', long = "profile")]
    pub profile: Option<String>,

    /// AWS region.
    #[arg(short = 'r', long = "region")]
    pub region: Option<String>,

    /// Delete the bucket itself after clearing it.
    #[arg(short = 'f', long = "force")]
    pub force: bool,

    /// Pick buckets interactively after filtering by keyword.
    #[arg(short = 'i', long = "interactive")]
    pub interactive: bool,

    /// Delete only non-latest object versions and all delete markers.
    #[arg(short = 'o', long = "oldVersionsOnly")]
    pub old_versions_only: bool,

    /// Suppress live progress; print only final summaries.
    #[arg(short = 'q', long = "quietMode")]
    pub quiet_mode: bool,

    /// Clear buckets in parallel (implies quiet mode).
    #[arg(short = 'c', long = "concurrentMode")]
    pub concurrent_mode: bool,

    /// Number of buckets cleared at once; requires -c.
    #[arg(short = 'n', long = "concurrencyNumber")]
    pub concurrency_number: Option<usize>,

    /// Target directory buckets.
    #[arg(short = 'd', long = "directoryBucketsMode")]
    pub directory_buckets_mode: bool,

    /// Target table buckets.
    #[arg(short = 't', long = "tableBucketsMode")]
    pub table_buckets_mode: bool,

    /// Target vector buckets.
    #[arg(long = "vectorBucketsMode")]
    pub vector_buckets_mode: bool,

    /// Endpoint of an S3-compatible provider.
    #[arg(long = "endpointUrl")]
    pub endpoint_url: Option<String>,

    /// Only clear items whose key or index name starts with this prefix.
    #[arg(long = "keyPrefix")]
    pub key_prefix: Option<String>,

    /// Increase log verbosity: -v = Debug, -vv = Trace
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

fn option_error(msg: &str) -> ClearError {
    ClearError::Option(msg.to_string())
}

impl Args {
    pub fn backend(&self) -> Backend {
        if self.directory_buckets_mode {
            Backend::DirectoryObject
        } else if self.table_buckets_mode {
            Backend::Table
        } else if self.vector_buckets_mode {
            Backend::Vector
        } else {
            Backend::Object
        }
    }

    /// Check flag combinations and build the run options.
    pub fn validate(&self) -> Result<RunOptions, ClearError> {
        if self.bucket_name.is_empty() && !self.interactive {
            return Err(option_error(
                "At least one bucket name must be specified in command options (-b) or a flag of interactive mode (-i) must be specified.",
            ));
        }
        if !self.bucket_name.is_empty() && self.interactive {
            return Err(option_error(
                "When specifying -i, do not specify the -b option.",
            ));
        }
        if self.force && self.old_versions_only {
            return Err(option_error(
                "When specifying -o, do not specify the -f option.",
            ));
        }

        let modes = [
            self.directory_buckets_mode,
            self.table_buckets_mode,
            self.vector_buckets_mode,
        ];
        if modes.iter().filter(|m| **m).count() > 1 {
            return Err(option_error(
                "You cannot specify more than one of -d, -t and --vectorBucketsMode.",
            ));
        }

        let backend = self.backend();
        match backend {
            Backend::DirectoryObject if self.old_versions_only => {
                return Err(option_error(
                    "When specifying -d, do not specify the -o option.",
                ));
            }
            Backend::Table if self.old_versions_only => {
                return Err(option_error(
                    "When specifying -t, do not specify the -o option.",
                ));
            }
            Backend::Table if self.concurrent_mode => {
                return Err(option_error(
                    "When specifying -t, do not specify the -c option because of the throttling threshold of table buckets.",
                ));
            }
            Backend::Table if self.key_prefix.is_some() => {
                return Err(option_error(
                    "When specifying -t, do not specify the --keyPrefix option.",
                ));
            }
            Backend::Vector if self.old_versions_only => {
                return Err(option_error(
                    "When specifying --vectorBucketsMode, do not specify the -o option.",
                ));
            }
            _ => {}
        }

        if self.key_prefix.is_some() && self.force {
            return Err(option_error(
                "When specifying --keyPrefix, do not specify the -f option.",
            ));
        }

        let concurrency = match (self.concurrent_mode, self.concurrency_number) {
            (false, Some(_)) => {
                return Err(option_error(
                    "You must specify the -c option when using the -n option.",
                ));
            }
            (true, Some(n)) if n < 1 => {
                return Err(option_error(
                    "You must specify a positive number for the -n option.",
                ));
            }
            (true, Some(n)) => Concurrency::Limited(n),
            (true, None) => Concurrency::PerTarget,
            (false, None) => Concurrency::Sequential,
        };

        if backend != Backend::Object && self.region.is_none() {
            warn!(
                "You are in {} mode but the region option (-r) is not specified, so the default region is used.",
                match backend {
                    Backend::DirectoryObject => "directory buckets",
                    Backend::Table => "table buckets",
                    _ => "vector buckets",
                }
            );
        }

        let mut bucket_names: Vec<String> = Vec::with_capacity(self.bucket_name.len());
        for name in &self.bucket_name {
            if !bucket_names.contains(name) {
                bucket_names.push(name.clone());
            }
        }

        Ok(RunOptions {
            backend,
            bucket_names,
            interactive: self.interactive,
            concurrency,
            clear: ClearOptions {
                force: self.force,
                old_versions_only: self.old_versions_only,
                quiet: self.quiet_mode || self.concurrent_mode,
                key_prefix: self.key_prefix.clone(),
            },
            connection: ConnectionOptions {
                profile: self.profile.clone(),
                region: self.region.clone(),
                endpoint_url: self.endpoint_url.clone(),
            },
        })
    }
}
