// src/retry.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Bounded retry with jittered backoff around driver calls.
//!
//! Every attempt and every backoff sleep races the cancellation token, so a
//! canceled run never waits out a sleep.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::constants::{
    DEFAULT_MAX_ATTEMPTS, ENV_MAX_ATTEMPTS, MANAGED_RETRYABLE_CODES, RETRY_BASE_DELAY,
    S3_MAX_JITTER, S3_RETRYABLE_CODES, S3_RETRYABLE_MESSAGES, S3_TABLES_MAX_JITTER,
    S3_VECTORS_MAX_JITTER,
};
use crate::driver::DriverError;
use crate::error::CallError;

/// Process-wide jitter source, seeded from the OS on first use.
static JITTER_RNG: Lazy<Mutex<StdRng>> = Lazy::new(|| Mutex::new(StdRng::from_os_rng()));

/// Seed the jitter PRNG now instead of on the first retry.
pub fn init_jitter_rng() {
    Lazy::force(&JITTER_RNG);
}

fn jitter(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    let mut rng = JITTER_RNG.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    Duration::from_millis(rng.random_range(0..=max_ms))
}

/// Verdict of a backend predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    DoNotRetry,
    /// No opinion; left to the SDK's own retry layer, so not retried here.
    Unknown,
}

pub type Classifier = fn(&DriverError) -> RetryDecision;

/// S3 general purpose and directory buckets.
pub fn s3_classifier(err: &DriverError) -> RetryDecision {
    if matches!(err.status, Some(429 | 503)) {
        return RetryDecision::Retry;
    }
    if err.code().is_some_and(|c| S3_RETRYABLE_CODES.contains(&c)) {
        return RetryDecision::Retry;
    }
    if S3_RETRYABLE_MESSAGES.iter().any(|m| err.message.contains(m)) {
        return RetryDecision::Retry;
    }
    RetryDecision::Unknown
}

/// S3 Tables and S3 Vectors.
pub fn managed_classifier(err: &DriverError) -> RetryDecision {
    if err.code().is_some_and(|c| MANAGED_RETRYABLE_CODES.contains(&c)) {
        return RetryDecision::Retry;
    }
    s3_classifier(err)
}

/// Read the attempt override from the environment, falling back to the default.
pub fn max_attempts_from_env() -> u32 {
    std::env::var(ENV_MAX_ATTEMPTS)
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .filter(|n| *n >= 1)
        .unwrap_or(DEFAULT_MAX_ATTEMPTS)
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_jitter: Duration,
    classifier: Classifier,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_jitter: Duration, classifier: Classifier) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_jitter,
            classifier,
        }
    }

    pub fn s3() -> Self {
        Self::new(max_attempts_from_env(), RETRY_BASE_DELAY, S3_MAX_JITTER, s3_classifier)
    }

    pub fn s3_tables() -> Self {
        Self::new(max_attempts_from_env(), RETRY_BASE_DELAY, S3_TABLES_MAX_JITTER, managed_classifier)
    }

    pub fn s3_vectors() -> Self {
        Self::new(max_attempts_from_env(), RETRY_BASE_DELAY, S3_VECTORS_MAX_JITTER, managed_classifier)
    }

    /// Same classification, no sleeping between attempts.
    pub fn immediate(max_attempts: u32, classifier: Classifier) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO, classifier)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_retryable(&self, err: &DriverError) -> bool {
        match (self.classifier)(err) {
            RetryDecision::Retry => true,
            RetryDecision::DoNotRetry | RetryDecision::Unknown => false,
        }
    }

    /// Sleep `base + random(0, max_jitter)`, or return early on cancellation.
    pub async fn backoff(&self, token: &CancellationToken) -> Result<(), CallError> {
        let delay = self.base_delay + jitter(self.max_jitter);
        if delay.is_zero() {
            return if token.is_cancelled() { Err(CallError::Canceled) } else { Ok(()) };
        }
        tokio::select! {
            _ = token.cancelled() => Err(CallError::Canceled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }

    /// Run `call` until it succeeds, fails with a non-retryable error, runs
    /// out of attempts, or the token is canceled.
    pub async fn run<T, F, Fut>(&self, token: &CancellationToken, mut call: F) -> Result<T, CallError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DriverError>>,
    {
        let mut attempt = 1;
        loop {
            if token.is_cancelled() {
                return Err(CallError::Canceled);
            }
            let result = tokio::select! {
                _ = token.cancelled() => return Err(CallError::Canceled),
                r = call() => r,
            };
            let err = match result {
                Ok(v) => return Ok(v),
                Err(e) => e,
            };
            if !self.is_retryable(&err) {
                debug!("non-retryable error: {}", err);
                return Err(CallError::Failed(err));
            }
            if attempt >= self.max_attempts {
                return Err(CallError::Throttled {
                    attempts: attempt,
                    source: err,
                });
            }
            warn!("retrying after attempt {}/{}: {}", attempt, self.max_attempts, err);
            self.backoff(token).await?;
            attempt += 1;
        }
    }
}
