//! Concurrency layer for Tally
//!
//! The object store offers only optimistic concurrency: conditional puts
//! that fail with `VersionConflict`. This crate implements:
//! - RetryConfig: exponential backoff policy for conflicting writes
//! - AppendOnlyLog: create-only appends with verify, regenerate and
//!   back-off handling of conflicts
//!
//! No locks are taken anywhere; correctness rests on version tokens and
//! idempotent retry.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod append;
pub mod retry;

pub use append::{AppendOnlyLog, AppendStatus, Appended, KeyRequest};
pub use retry::RetryConfig;
