// src/constants.rs
//
// Centralized constants for s3clear to avoid hardcoded values throughout the codebase

use std::time::Duration;

/// Default region when neither the flag nor the SDK provider chain yields one
pub const DEFAULT_REGION: &str = "us-east-1";

// ============================================================================
// Retry Configuration
// ============================================================================

/// Default maximum number of attempts per driver call (first call included)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;

/// Environment variable overriding [`DEFAULT_MAX_ATTEMPTS`]
pub const ENV_MAX_ATTEMPTS: &str = "S3CLEAR_MAX_ATTEMPTS";

/// Fixed part of every backoff sleep
pub const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Upper bound of the random jitter added to S3 (general + directory) backoff
pub const S3_MAX_JITTER: Duration = Duration::from_secs(10);

/// Upper bound of the random jitter added to S3 Tables backoff
pub const S3_TABLES_MAX_JITTER: Duration = Duration::from_secs(10);

/// Upper bound of the random jitter added to S3 Vectors backoff.
/// The vectors API throttles aggressively (429/503), so it backs off longer.
pub const S3_VECTORS_MAX_JITTER: Duration = Duration::from_secs(20);

// ============================================================================
// Batch and Concurrency Limits
// ============================================================================

/// Hard service limit of keys in a single DeleteObjects request
pub const MAX_DELETE_BATCH: usize = 1000;

/// In-flight DeleteIndex calls per vector bucket
pub const VECTOR_DELETE_CONCURRENCY: usize = 8;

/// In-flight DeleteTable calls per namespace
pub const TABLE_DELETE_CONCURRENCY: usize = 1;

/// Maximum per-item failures rendered in a PartialError message
pub const MAX_REPORTED_FAILURES: usize = 20;

// ============================================================================
// Retry Classification
// ============================================================================

/// Per-item DeleteObjects error codes that are re-issued
pub const RETRYABLE_ITEM_CODES: &[&str] = &[
    "InternalError",
    "SlowDown",
    "ServiceUnavailable",
    "RequestTimeout",
    "OperationAborted",
];

/// Error codes the S3 predicate treats as transient
pub const S3_RETRYABLE_CODES: &[&str] = &[
    "SlowDown",
    "InternalError",
    "ServiceUnavailable",
    "RequestTimeout",
    "RequestTimeTooSkewed",
];

/// Message fragments the S3 predicate treats as transient
pub const S3_RETRYABLE_MESSAGES: &[&str] = &[
    "SlowDown",
    "StatusCode: 429",
    "StatusCode: 503",
    "internal error",
    "EOF",
    "connection closed before message completed",
    "connection reset",
    "no such host",
    "dns error",
    "failed to lookup address",
];

/// Error codes the S3 Tables and S3 Vectors predicates treat as transient
pub const MANAGED_RETRYABLE_CODES: &[&str] = &[
    "TooManyRequestsException",
    "ServiceUnavailableException",
    "InternalServerErrorException",
    "InternalServerException",
    "ConflictException",
];
