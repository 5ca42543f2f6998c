// src/app.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! One run: validate flags, connect, select buckets, clear them.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::RunOptions;
use crate::error::ClearError;
use crate::options::Args;
use crate::processor::{BucketProcessor, BucketReport};
use crate::selector::{BucketPicker, BucketSelector, StdinPicker};
use crate::wrapper::Wrapper;

/// Entry point used by the binary.
pub async fn run(args: &Args, token: &CancellationToken) -> Result<Vec<BucketReport>, ClearError> {
    let opts = args.validate()?;
    let wrapper = Arc::new(Wrapper::connect(&opts).await);
    execute(&opts, wrapper, &StdinPicker, token).await
}

/// Select and clear with an already built wrapper.
pub async fn execute(
    opts: &RunOptions,
    wrapper: Arc<Wrapper>,
    picker: &dyn BucketPicker,
    token: &CancellationToken,
) -> Result<Vec<BucketReport>, ClearError> {
    let targets = BucketSelector::new(&wrapper, picker).select(opts, token).await?;
    if targets.is_empty() {
        return Ok(Vec::new());
    }
    let concurrency = opts.concurrency.effective(targets.len());
    debug!(
        "clearing {} {:?} bucket(s), concurrency {}",
        targets.len(),
        opts.backend,
        concurrency
    );
    BucketProcessor::new(wrapper, targets, concurrency)
        .process(token)
        .await
}
