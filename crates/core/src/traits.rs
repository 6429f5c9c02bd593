//! Core traits for the object store and time source
//!
//! The ledger never talks to the hosting platform directly. Everything goes
//! through [`ObjectStore`], which lets tests swap in the in-memory store and
//! lets a real content-API client be plugged in without touching the upper
//! layers.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::contract::{DirectoryEntry, ObjectVersion, StoredObject};
use crate::error::TallyResult;

/// Versioned blob store keyed by slash-separated paths
///
/// Thread safety: all methods must be safe to call concurrently from
/// multiple threads (requires Send + Sync).
pub trait ObjectStore: Send + Sync {
    /// Read a blob, optionally at a named ref
    ///
    /// Returns `Ok(None)` when the path does not exist.
    ///
    /// # Errors
    ///
    /// `UpstreamUnavailable` when the store cannot be reached.
    fn get(&self, path: &str, reference: Option<&str>) -> TallyResult<Option<StoredObject>>;

    /// Conditionally write a blob
    ///
    /// `expected = None` creates the path and fails if it already exists.
    /// `expected = Some(v)` replaces the path only if its current version is `v`.
    ///
    /// # Errors
    ///
    /// `VersionConflict` on mismatch, `UpstreamUnavailable` on transport failure.
    fn put(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        expected: Option<&ObjectVersion>,
        branch: &str,
    ) -> TallyResult<ObjectVersion>;

    /// Delete a blob at a known version
    ///
    /// # Errors
    ///
    /// `NotFound` when absent, `VersionConflict` when `version` is stale.
    fn delete(
        &self,
        path: &str,
        version: &ObjectVersion,
        message: &str,
        branch: &str,
    ) -> TallyResult<()>;

    /// List the immediate children of a directory
    ///
    /// # Errors
    ///
    /// `NotFound` when the directory does not exist.
    fn list_directory(&self, path: &str) -> TallyResult<Vec<DirectoryEntry>>;

    /// Flat list of every blob path reachable from `root_ref`
    fn list_tree_recursive(&self, root_ref: &str) -> TallyResult<Vec<String>>;
}

/// Source of "now"
///
/// Injected wherever a timestamp is stamped or a TTL is checked so tests can
/// pin time.
pub trait Clock: Send + Sync {
    /// Current wall-clock time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Start at `start`
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move forward by `millis`
    pub fn advance_ms(&self, millis: i64) {
        let mut now = self.now.lock();
        *now += chrono::Duration::milliseconds(millis);
    }

    /// Jump to an absolute time
    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock() = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}
