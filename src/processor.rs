// src/processor.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Clears a set of buckets concurrently and renders their progress.
//!
//! Every bucket gets a clearing task and a display task. The clearing task
//! runs the wrapper under a bucket-level semaphore and reports success on a
//! oneshot channel when it exits. The display task turns the bucket's
//! progress stream into its live line, then writes the final line once the
//! completion value arrives.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{Semaphore, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::ClearError;
use crate::progress::{ClearingState, LiveWriter, ProgressReceiver, progress_channel};
use crate::wrapper::{BucketTarget, Wrapper};

/// Final state of one bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketReport {
    pub name: String,
    pub deleted: u64,
    pub ok: bool,
    /// True when the bucket itself was deleted.
    pub bucket_deleted: bool,
    /// Summary lines emitted for this bucket, in order.
    pub messages: Vec<String>,
}

pub struct BucketProcessor {
    wrapper: Arc<Wrapper>,
    targets: Vec<BucketTarget>,
    concurrency: usize,
    writer: Option<LiveWriter>,
}

impl BucketProcessor {
    pub fn new(wrapper: Arc<Wrapper>, targets: Vec<BucketTarget>, concurrency: usize) -> Self {
        Self {
            wrapper,
            targets,
            concurrency: concurrency.max(1),
            writer: None,
        }
    }

    /// Render the live block to `writer` instead of stdout.
    pub fn with_writer(mut self, writer: LiveWriter) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Clear every target. All reports are returned when every bucket
    /// succeeded; otherwise the first error in completion order.
    pub async fn process(self, token: &CancellationToken) -> Result<Vec<BucketReport>, ClearError> {
        let Self {
            wrapper,
            targets,
            concurrency,
            writer,
        } = self;
        let (reports, first_error) = run(wrapper, targets, concurrency, writer, token).await;
        match first_error {
            Some(err) => Err(err),
            None => Ok(reports),
        }
    }
}

async fn display(
    state: Arc<ClearingState>,
    wrapper: Arc<Wrapper>,
    idx: usize,
    mut progress: ProgressReceiver,
    done: oneshot::Receiver<bool>,
) {
    let name = state.record(idx).name.clone();
    while let Some(count) = progress.recv().await {
        state.set_deleted(idx, count);
        state.update_line(idx, wrapper.live_clearing_message(&name, count));
    }
    let ok = done.await.unwrap_or(false);
    let deleted = state.record(idx).deleted();
    state.update_line(idx, wrapper.live_cleared_message(&name, deleted, ok));
}

async fn run(
    wrapper: Arc<Wrapper>,
    targets: Vec<BucketTarget>,
    concurrency: usize,
    writer: Option<LiveWriter>,
    token: &CancellationToken,
) -> (Vec<BucketReport>, Option<ClearError>) {
    if targets.is_empty() {
        return (Vec::new(), None);
    }
    let opts = wrapper.options().clone();

    let names: Vec<String> = targets.iter().map(|t| t.name.clone()).collect();
    let initial: Vec<String> = names.iter().map(|n| wrapper.checking_message(n)).collect();
    let writer = if opts.quiet {
        for line in &initial {
            info!("{}", line);
        }
        None
    } else {
        Some(writer.unwrap_or_else(LiveWriter::stdout))
    };
    let state = Arc::new(ClearingState::new(&names, initial, writer));

    let sem = Arc::new(Semaphore::new(concurrency));
    let mut displays = Vec::with_capacity(targets.len());
    let mut clears = FuturesUnordered::new();

    for (idx, target) in targets.into_iter().enumerate() {
        let (progress_tx, progress_rx) = progress_channel();
        let (done_tx, done_rx) = oneshot::channel::<bool>();
        displays.push(tokio::spawn(display(
            state.clone(),
            wrapper.clone(),
            idx,
            progress_rx,
            done_rx,
        )));

        let wrapper = wrapper.clone();
        let sem = sem.clone();
        let token = token.clone();
        let handle = tokio::spawn(async move {
            let result = async {
                let _permit = tokio::select! {
                    _ = token.cancelled() => return Err(ClearError::canceled(&target.name)),
                    permit = sem.acquire_owned() => {
                        permit.map_err(|_| ClearError::canceled(&target.name))?
                    }
                };
                debug!("clearing {}", target.name);
                wrapper.clear_bucket(&target, progress_tx, &token).await
            }
            .await;
            // the progress sender is gone by now, so this lands after the
            // last count
            let _ = done_tx.send(result.is_ok());
            result
        });
        clears.push(async move { (idx, handle.await) });
    }

    let mut outcomes: Vec<Option<bool>> = vec![None; names.len()];
    let mut first_error: Option<ClearError> = None;
    while let Some((idx, joined)) = clears.next().await {
        let result = joined.unwrap_or_else(|source| {
            Err(ClearError::Task {
                resource: names[idx].clone(),
                source,
            })
        });
        outcomes[idx] = Some(result.is_ok());
        if let Err(err) = result {
            error!("{}", err);
            if first_error.is_none() {
                first_error = Some(err);
            }
        }
    }

    for joined in futures::future::join_all(displays).await {
        if let Err(e) = joined {
            debug!("display task failed: {}", e);
        }
    }

    let reports = names
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let ok = outcomes[idx].unwrap_or(false);
            let deleted = state.record(idx).deleted();
            let mut messages = Vec::new();
            if ok {
                messages.push(wrapper.cleared_message(&name, deleted));
                if opts.force {
                    messages.push(wrapper.deleted_message(&name));
                }
            }
            for line in &messages {
                info!("{}", line);
            }
            BucketReport {
                name,
                deleted,
                ok,
                bucket_deleted: ok && opts.force,
                messages,
            }
        })
        .collect();

    (reports, first_error)
}
