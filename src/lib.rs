// src/lib.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
// Crate root: module tree plus the public re-exports.

pub mod constants;
pub mod config;
pub mod error;
pub mod options;

// Engine
pub mod concurrency;
pub mod progress;
pub mod retry;

// Storage backends
pub mod driver;
pub mod s3_client;
pub mod wrapper;

// Orchestration
pub mod app;
pub mod processor;
pub mod selector;

pub use app::{execute, run};
pub use config::{Backend, ClearOptions, Concurrency, ConnectionOptions, RunOptions};
pub use error::{CallError, ClearError};
pub use options::Args;
pub use processor::{BucketProcessor, BucketReport};
pub use selector::{BucketPicker, BucketSelector, StdinPicker};
pub use wrapper::{BucketCheck, BucketTarget, Wrapper};
