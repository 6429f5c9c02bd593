//! Tally - execution ledger and traceability engine
//!
//! Tally keeps test-run history in a versioned object store and reconciles
//! it with stories and defects into a coverage matrix.
//!
//! # Quick Start
//!
//! ```ignore
//! use tally::{RunOutcome, RunRequest, Tally};
//!
//! // In-memory store with default settings
//! let tally = Tally::ephemeral()?;
//!
//! tally.record_run(RunRequest::new("auth/login", RunOutcome::Pass))?;
//! let latest = tally.get_latest("auth/login")?;
//! ```
//!
//! # Architecture
//!
//! - `tally-core`: errors, domain types, the `ObjectStore` contract
//! - `tally-storage`: in-memory store with fault injection
//! - `tally-concurrency`: append protocol and retry policy
//! - `tally-engine`: recorder, latest index, batch submission, config
//! - `tally-traceability`: story resolution, matrix building, caching
//!
//! [`Tally`] bundles a [`Ledger`] with a [`MatrixService`].

mod facade;

pub use facade::Tally;

pub use tally_concurrency::{AppendOnlyLog, AppendStatus, Appended, KeyRequest, RetryConfig};
pub use tally_core::{
    Clock, Defect, DirectoryEntry, EntryKind, IssueState, LatestLookup, LatestPointer,
    MalformedRecord, ManualClock, ObjectStore, ObjectVersion, RunFileName, RunLayout, RunOutcome,
    RunRecord, StepOutcome, StepResult, StoredObject, StoredRun, Story, SystemClock, TallyError,
    TallyResult, TestCase, TestPath,
};
pub use tally_engine::{
    BatchReport, BatchSubmitter, ItemReport, ItemStatus, LatestIndex, Ledger, RebuildOutcome,
    RecordOutcome, RunRecorder, RunRef, RunRequest, RunScan, TallyConfig, CONFIG_FILE_NAME,
};
pub use tally_storage::InMemoryObjectStore;
pub use tally_traceability::{
    build_matrix, canonicalize, Cache, Gaps, Issue, Matrix, MatrixEntry, MatrixService,
    MatrixSummary, StoryIndex, StoryKeys, TestStatus, TtlCache,
};
