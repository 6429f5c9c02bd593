//! Core types and traits for Tally
//!
//! This crate defines the foundational types used throughout the system:
//! - TallyError: Error type hierarchy
//! - ObjectStore: Versioned blob store contract
//! - Clock: Injectable time source
//! - TestPath, RunOutcome, StepOutcome: Execution identity and outcomes
//! - RunLayout, RunFileName: Store key layout for runs and pointers
//! - RunRecord, LatestPointer, StoredRun: Decoded run payloads
//! - TestCase, Story, Defect: Read-only traceability inputs

#![warn(missing_docs)]
#![warn(clippy::all)]

// Module declarations
pub mod catalog;
pub mod contract;
pub mod error;
pub mod key;
pub mod run_types;
pub mod traits;
pub mod types;

// Re-export commonly used types and traits
pub use catalog::{Defect, IssueState, Story, TestCase};
pub use contract::{DirectoryEntry, EntryKind, ObjectVersion, StoredObject};
pub use error::{TallyError, TallyResult};
pub use key::{RunFileName, RunLayout, DIR_MARKER, LATEST_FILE};
pub use run_types::{LatestLookup, LatestPointer, MalformedRecord, RunRecord, StoredRun};
pub use traits::{Clock, ManualClock, ObjectStore, SystemClock};
pub use types::{RunOutcome, StepOutcome, StepResult, TestPath};
