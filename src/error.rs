// src/error.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//

//! Error kinds surfaced by the clearing engine.

use thiserror::Error;
use tokio::task::JoinError;

use crate::constants::MAX_REPORTED_FAILURES;
use crate::driver::{DriverError, ItemFailure};

/// Outcome of a driver call that the retry policy gave up on.
#[derive(Debug, Clone, Error)]
pub enum CallError {
    /// Retryable failures until attempts ran out.
    #[error("throttled, gave up after {attempts} attempts: {source}")]
    Throttled {
        attempts: u32,
        #[source]
        source: DriverError,
    },

    /// A failure the predicate refused to retry.
    #[error(transparent)]
    Failed(DriverError),

    #[error("canceled")]
    Canceled,
}

/// Top-level error of a clearing run.
#[derive(Debug, Error)]
pub enum ClearError {
    #[error("OptionError: {0}")]
    Option(String),

    #[error("NotFoundError: {0}")]
    NotFound(String),

    /// Reading the interactive selection failed.
    #[error("InputError: {0}")]
    Input(#[from] std::io::Error),

    #[error("[resource {resource}] ListError: {source}")]
    List {
        resource: String,
        #[source]
        source: CallError,
    },

    #[error("[resource {resource}] DeleteError: {source}")]
    Delete {
        resource: String,
        #[source]
        source: CallError,
    },

    #[error("[resource {resource}] PartialError: {}", render_failures(.failures))]
    Partial {
        resource: String,
        failures: Vec<ItemFailure>,
    },

    #[error("[resource {resource}] Canceled")]
    Canceled { resource: String },

    #[error("[resource {resource}] worker task failed: {source}")]
    Task {
        resource: String,
        #[source]
        source: JoinError,
    },
}

impl ClearError {
    pub(crate) fn list(resource: &str, err: CallError) -> Self {
        match err {
            CallError::Canceled => Self::Canceled {
                resource: resource.to_string(),
            },
            source => Self::List {
                resource: resource.to_string(),
                source,
            },
        }
    }

    pub(crate) fn delete(resource: &str, err: CallError) -> Self {
        match err {
            CallError::Canceled => Self::Canceled {
                resource: resource.to_string(),
            },
            source => Self::Delete {
                resource: resource.to_string(),
                source,
            },
        }
    }

    pub(crate) fn canceled(resource: &str) -> Self {
        Self::Canceled {
            resource: resource.to_string(),
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled { .. })
    }

    /// The bucket this error is about, if any.
    pub fn resource(&self) -> Option<&str> {
        match self {
            Self::Option(_) | Self::NotFound(_) | Self::Input(_) => None,
            Self::List { resource, .. }
            | Self::Delete { resource, .. }
            | Self::Partial { resource, .. }
            | Self::Canceled { resource }
            | Self::Task { resource, .. } => Some(resource),
        }
    }
}

fn render_failures(failures: &[ItemFailure]) -> String {
    let mut parts: Vec<String> = failures
        .iter()
        .take(MAX_REPORTED_FAILURES)
        .map(|f| {
            format!(
                "Code: {}, Key: {}, VersionId: {}, Message: {}",
                f.code,
                f.key,
                f.version_id.as_deref().unwrap_or("null"),
                f.message
            )
        })
        .collect();
    if failures.len() > MAX_REPORTED_FAILURES {
        parts.push(format!("... and {} more", failures.len() - MAX_REPORTED_FAILURES));
    }
    format!("{} item(s) could not be deleted: {}", failures.len(), parts.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::DriverErrorKind;

    #[test]
    fn test_resource_prefix() {
        let err = ClearError::list(
            "bucket1",
            CallError::Failed(DriverError::new(DriverErrorKind::Service, "AccessDenied")),
        );
        assert_eq!(err.to_string(), "[resource bucket1] ListError: AccessDenied");
        assert_eq!(err.resource(), Some("bucket1"));
    }

    #[test]
    fn test_canceled_call_becomes_canceled_error() {
        let err = ClearError::delete("bucket1", CallError::Canceled);
        assert!(err.is_canceled());
        assert_eq!(err.to_string(), "[resource bucket1] Canceled");
    }

    #[test]
    fn test_partial_error_is_single_line() {
        let failures = (0..MAX_REPORTED_FAILURES + 2)
            .map(|i| ItemFailure {
                code: "AccessDenied".into(),
                key: format!("K{i}"),
                version_id: None,
                message: "Access Denied".into(),
            })
            .collect();
        let err = ClearError::Partial {
            resource: "bucket1".into(),
            failures,
        };
        let text = err.to_string();
        assert!(!text.contains('\n'));
        assert!(text.contains("Code: AccessDenied, Key: K0, VersionId: null"));
        assert!(text.ends_with("... and 2 more"));
    }
}
