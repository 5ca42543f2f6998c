// src/concurrency/mod.rs
//
// SPDX-License-Identifier: Apache-2.0 OR MIT
// SPDX-FileCopyrightText: 2025 Russ Fellows <russ.fellows@gmail.com>

//! Error-group style task set used inside a single bucket clear.
//!
//! Tasks share a child [`CancellationToken`]. The first error recorded
//! cancels it, so listing loops and sibling workers stop early. Dropping the
//! group aborts whatever is still running; [`TaskGroup::wait`] joins all of
//! them before returning.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

type ErrorSlot<E> = Arc<Mutex<Option<E>>>;

fn record<E>(slot: &ErrorSlot<E>, token: &CancellationToken, err: E) {
    let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
    if guard.is_none() {
        *guard = Some(err);
    }
    token.cancel();
}

pub struct TaskGroup<E> {
    tasks: JoinSet<()>,
    token: CancellationToken,
    limit: Option<Arc<Semaphore>>,
    first_error: ErrorSlot<E>,
}

impl<E: Send + 'static> TaskGroup<E> {
    /// Unbounded group, canceled together with `parent`.
    pub fn new(parent: &CancellationToken) -> Self {
        Self {
            tasks: JoinSet::new(),
            token: parent.child_token(),
            limit: None,
            first_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Group that runs at most `width` tasks at a time.
    pub fn with_limit(parent: &CancellationToken, width: usize) -> Self {
        Self {
            limit: Some(Arc::new(Semaphore::new(width.max(1)))),
            ..Self::new(parent)
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Spawn `fut` once a slot is free. Returns `false` without spawning if the
    /// group was canceled while waiting.
    pub async fn spawn<F>(&mut self, fut: F) -> bool
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
    {
        let permit = match &self.limit {
            Some(sem) => tokio::select! {
                _ = self.token.cancelled() => return false,
                p = sem.clone().acquire_owned() => match p {
                    Ok(p) => Some(p),
                    Err(_) => return false,
                },
            },
            None => None,
        };
        if self.token.is_cancelled() {
            return false;
        }

        let slot = self.first_error.clone();
        let token = self.token.clone();
        self.tasks.spawn(async move {
            let _permit = permit;
            if let Err(e) = fut.await {
                record(&slot, &token, e);
            }
        });
        true
    }

    /// Record an error raised outside a task and cancel the group.
    pub fn fail(&self, err: E) {
        record(&self.first_error, &self.token, err);
    }

    /// Join every task and return the first recorded error.
    pub async fn wait(mut self, on_panic: impl Fn(JoinError) -> E) -> Result<(), E> {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(join_err) = joined {
                record(&self.first_error, &self.token, on_panic(join_err));
            }
        }
        let first = self
            .first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match first {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
