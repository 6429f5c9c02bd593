//! Error types for the ledger and traceability engine
//!
//! All fallible operations return [`TallyResult`]. The variants map onto the
//! four conditions the object store can signal (absent object, version
//! conflict, malformed payload, upstream outage) plus local validation.
//!
//! # Categories
//!
//! | Category | Variants | Handling |
//! |----------|----------|----------|
//! | Not Found | `NotFound` | Reads treat it as "nothing yet" |
//! | Concurrency | `VersionConflict`, `RetriesExhausted` | Retried, fatal after budget |
//! | Payload | `MalformedRecord`, `Serialization` | Skipped during scans |
//! | Upstream | `UpstreamUnavailable` | Retryable, propagated |
//! | Validation | `InvalidInput`, `Config` | Rejected before any I/O |

use thiserror::Error;

/// Result type alias for tally operations
pub type TallyResult<T> = std::result::Result<T, TallyError>;

/// Errors raised by the ledger, the index maintainer and the object store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TallyError {
    /// Object or directory absent from the store
    #[error("not found: {path}")]
    NotFound {
        /// Store path that was requested
        path: String,
    },

    /// Conditional write rejected because the stored version moved
    #[error("version conflict on {path}: expected {expected}, found {actual}")]
    VersionConflict {
        /// Store path of the conflicting object
        path: String,
        /// Version the writer expected (`none` for create)
        expected: String,
        /// Version currently stored (`none` when absent)
        actual: String,
    },

    /// Conflict retry budget spent without landing the write
    #[error("write to {path} still conflicting after {attempts} attempts")]
    RetriesExhausted {
        /// Last store path attempted
        path: String,
        /// Number of put attempts made
        attempts: u32,
    },

    /// Stored payload does not decode into the expected record shape
    #[error("malformed record at {path}: {reason}")]
    MalformedRecord {
        /// Store path of the bad payload
        path: String,
        /// Decoder message
        reason: String,
    },

    /// Network or 5xx failure talking to the object store
    #[error("object store unavailable: {reason}")]
    UpstreamUnavailable {
        /// Transport-level description
        reason: String,
    },

    /// Caller supplied an unusable argument
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// What was wrong
        reason: String,
    },

    /// Encoding a payload failed
    #[error("serialization error: {reason}")]
    Serialization {
        /// Encoder message
        reason: String,
    },

    /// Configuration could not be read or failed validation
    #[error("config error: {reason}")]
    Config {
        /// What was wrong
        reason: String,
    },
}

impl TallyError {
    /// Build a `NotFound` for a path
    pub fn not_found(path: impl Into<String>) -> Self {
        TallyError::NotFound { path: path.into() }
    }

    /// Build an `InvalidInput` error
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        TallyError::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Build an `UpstreamUnavailable` error
    pub fn upstream(reason: impl Into<String>) -> Self {
        TallyError::UpstreamUnavailable {
            reason: reason.into(),
        }
    }

    /// Build a `MalformedRecord` error
    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        TallyError::MalformedRecord {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Build a `Config` error
    pub fn config(reason: impl Into<String>) -> Self {
        TallyError::Config {
            reason: reason.into(),
        }
    }

    /// True for `NotFound`
    pub fn is_not_found(&self) -> bool {
        matches!(self, TallyError::NotFound { .. })
    }

    /// True for `VersionConflict`
    pub fn is_conflict(&self) -> bool {
        matches!(self, TallyError::VersionConflict { .. })
    }

    /// Whether the caller may reasonably retry the whole operation later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TallyError::VersionConflict { .. }
                | TallyError::RetriesExhausted { .. }
                | TallyError::UpstreamUnavailable { .. }
        )
    }
}

impl From<serde_json::Error> for TallyError {
    fn from(e: serde_json::Error) -> Self {
        TallyError::Serialization {
            reason: e.to_string(),
        }
    }
}
