//! Run records and latest pointers
//!
//! ## Design
//!
//! - `RunRecord`: immutable payload of one execution, one blob per run
//! - `LatestPointer`: denormalized copy of the newest run's headline fields
//! - `StoredRun`: a decoded record together with where it lives in the store
//!
//! Both payloads are decoded at the boundary. Anything that does not match
//! the expected shape becomes `MalformedRecord`; callers scanning many blobs
//! skip it and keep a [`MalformedRecord`] diagnostic instead of failing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::contract::ObjectVersion;
use crate::error::{TallyError, TallyResult};
use crate::key::RunFileName;
use crate::types::{RunOutcome, StepOutcome, TestPath};

/// One immutable execution record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Test path the run belongs to
    pub path: String,
    /// Story reference copied from the test case at submit time
    #[serde(rename = "storyId", default, skip_serializing_if = "Option::is_none")]
    pub story_id: Option<String>,
    /// Overall result
    pub result: RunOutcome,
    /// Free-text notes
    #[serde(default)]
    pub notes: String,
    /// Who executed the test
    pub executed_by: String,
    /// When the test was executed
    pub executed_at: DateTime<Utc>,
    /// Optional per-step detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<StepOutcome>>,
}

impl RunRecord {
    /// Decode a stored payload
    ///
    /// # Errors
    ///
    /// `MalformedRecord` when the bytes are not a run payload.
    pub fn decode(store_path: &str, bytes: &[u8]) -> TallyResult<Self> {
        let record: RunRecord = serde_json::from_slice(bytes)
            .map_err(|e| TallyError::malformed(store_path, e.to_string()))?;
        if record.path.trim().is_empty() {
            return Err(TallyError::malformed(store_path, "empty test path"));
        }
        Ok(record)
    }

    /// Encode for storage
    pub fn encode(&self) -> TallyResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Whether `other` would be an adjacent duplicate of this record
    ///
    /// Same result and same notes after trimming.
    pub fn same_outcome(&self, result: RunOutcome, notes: &str) -> bool {
        self.result == result && self.notes.trim() == notes.trim()
    }
}

/// Denormalized pointer to the newest run of a test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestPointer {
    /// Result of the referenced run
    pub result: RunOutcome,
    /// Execution time of the referenced run
    pub executed_at: DateTime<Utc>,
    /// Executor of the referenced run
    pub executed_by: String,
    /// Filename of the referenced run
    pub run_file: String,
    /// When the pointer was computed
    pub updated_at: DateTime<Utc>,
}

impl LatestPointer {
    /// Pointer describing `run`, stamped at `updated_at`
    pub fn for_run(run: &StoredRun, updated_at: DateTime<Utc>) -> Self {
        Self {
            result: run.record.result,
            executed_at: run.record.executed_at,
            executed_by: run.record.executed_by.clone(),
            run_file: run.run_file.to_string(),
            updated_at,
        }
    }

    /// Decode a stored pointer
    ///
    /// # Errors
    ///
    /// `MalformedRecord` when the bytes are not a pointer payload or the
    /// referenced filename is not a run file.
    pub fn decode(store_path: &str, bytes: &[u8]) -> TallyResult<Self> {
        let pointer: LatestPointer = serde_json::from_slice(bytes)
            .map_err(|e| TallyError::malformed(store_path, e.to_string()))?;
        if RunFileName::parse(&pointer.run_file).is_none() {
            return Err(TallyError::malformed(
                store_path,
                format!("run_file '{}' is not a run filename", pointer.run_file),
            ));
        }
        Ok(pointer)
    }

    /// Encode for storage
    pub fn encode(&self) -> TallyResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Parsed filename of the referenced run
    pub fn run_file_name(&self) -> Option<RunFileName> {
        RunFileName::parse(&self.run_file)
    }
}

/// A decoded run together with its store location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRun {
    /// Test the run belongs to
    pub test_path: TestPath,
    /// Parsed filename
    pub run_file: RunFileName,
    /// Full store path
    pub store_path: String,
    /// Version token of the blob
    pub version: ObjectVersion,
    /// Decoded payload
    pub record: RunRecord,
}

/// Diagnostic for a payload that was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRecord {
    /// Store path of the payload
    pub path: String,
    /// Why it was skipped
    pub reason: String,
}

impl MalformedRecord {
    /// Build from a `MalformedRecord` error, or describe any other error
    pub fn from_error(path: &str, error: &TallyError) -> Self {
        match error {
            TallyError::MalformedRecord { path, reason } => Self {
                path: path.clone(),
                reason: reason.clone(),
            },
            other => Self {
                path: path.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

/// Latest pointer per test path
///
/// Built either by one full tree scan or by per-test index reads. Payloads
/// skipped while building it are kept as diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatestLookup {
    entries: BTreeMap<String, LatestPointer>,
    malformed: Vec<MalformedRecord>,
}

impl LatestLookup {
    /// Empty lookup
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pointer for a test path
    pub fn insert(&mut self, test_path: impl Into<String>, pointer: LatestPointer) {
        self.entries.insert(test_path.into(), pointer);
    }

    /// Record a skipped payload
    pub fn push_malformed(&mut self, record: MalformedRecord) {
        self.malformed.push(record);
    }

    /// Pointer for a test path
    pub fn get(&self, test_path: &str) -> Option<&LatestPointer> {
        self.entries.get(test_path)
    }

    /// Latest result for a test path
    pub fn result_for(&self, test_path: &str) -> Option<RunOutcome> {
        self.entries.get(test_path).map(|p| p.result)
    }

    /// Number of tests with a latest run
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no test has a run
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in test-path order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &LatestPointer)> {
        self.entries.iter()
    }

    /// Payloads skipped while building the lookup
    pub fn malformed(&self) -> &[MalformedRecord] {
        &self.malformed
    }
}

impl FromIterator<(String, LatestPointer)> for LatestLookup {
    fn from_iter<I: IntoIterator<Item = (String, LatestPointer)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
            malformed: Vec::new(),
        }
    }
}
