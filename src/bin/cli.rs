// src/bin/cli.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Empty, and optionally delete, S3 buckets.
//!
//! Examples:
//! ```bash
//! s3clear -b my-bucket                          # empty one bucket
//! s3clear -b a -b b -c -n 2 -f                  # two at a time, then delete them
//! s3clear -b my-bucket -o                       # drop old versions and delete markers
//! s3clear -i -r us-west-2                       # pick buckets interactively
//! s3clear -t -b arn:aws:s3tables:us-east-1:111122223333:bucket/tb -r us-east-1
//! s3clear --vectorBucketsMode -b vb --keyPrefix tmp-
//! s3clear -b local --endpointUrl http://localhost:9000
//! ```

use anyhow::{Result, anyhow};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use s3clear::{Args, retry::init_jitter_rng};

#[tokio::main]
async fn main() -> Result<()> {
    // Loads any variables from .env file that are not already set
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Final summaries are logged at info, so that is the floor
    let filter = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to initialize logging: {e}"))?;

    init_jitter_rng();

    let token = CancellationToken::new();
    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, canceling");
            on_signal.cancel();
        }
    });

    match s3clear::run(&args, &token).await {
        Ok(reports) => {
            debug!("{} bucket(s) done", reports.len());
            Ok(())
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
