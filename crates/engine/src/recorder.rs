//! Run recorder
//!
//! Appends one immutable run record per execution. A submission identical
//! to the current latest run (same result, same trimmed notes) is a no-op
//! and writes nothing. Only the record is written; the latest pointer is
//! left for [`LatestIndex::rebuild`](crate::index::LatestIndex::rebuild).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tally_concurrency::{AppendOnlyLog, AppendStatus, KeyRequest};
use tally_core::key::{EXTENDED_SUFFIX_LEN, SUFFIX_LEN};
use tally_core::{
    Clock, ObjectVersion, RunFileName, RunLayout, RunOutcome, RunRecord, StepOutcome, StoredRun,
    TallyResult, TestPath,
};
use tracing::{debug, info, warn};

use crate::index::LatestIndex;

/// One execution result to record
///
/// Deserializes from the same shape the dashboard submits, so a batch can be
/// read straight from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    /// Slash-separated test path
    pub test_path: String,
    /// Overall result
    pub result: RunOutcome,
    /// Free-text notes
    #[serde(default)]
    pub notes: String,
    /// Optional per-step detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<StepOutcome>>,
    /// Executor; the configured default is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_by: Option<String>,
    /// Story reference of the test case
    #[serde(
        rename = "storyId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub story_id: Option<String>,
}

impl RunRequest {
    /// Request with no notes, steps, executor or story
    pub fn new(test_path: impl Into<String>, result: RunOutcome) -> Self {
        Self {
            test_path: test_path.into(),
            result,
            notes: String::new(),
            steps: None,
            executed_by: None,
            story_id: None,
        }
    }

    /// Set notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Set step outcomes
    pub fn with_steps(mut self, steps: Vec<StepOutcome>) -> Self {
        self.steps = Some(steps);
        self
    }

    /// Set the executor
    pub fn executed_by(mut self, who: impl Into<String>) -> Self {
        self.executed_by = Some(who.into());
        self
    }

    /// Set the story reference
    pub fn with_story_id(mut self, story_id: impl Into<String>) -> Self {
        self.story_id = Some(story_id.into());
        self
    }
}

/// Where a run record lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRef {
    /// Test the run belongs to
    pub test_path: TestPath,
    /// Run filename
    pub run_file: RunFileName,
    /// Full store path
    pub path: String,
    /// Version token of the blob
    pub version: ObjectVersion,
}

impl From<&StoredRun> for RunRef {
    fn from(run: &StoredRun) -> Self {
        Self {
            test_path: run.test_path.clone(),
            run_file: run.run_file.clone(),
            path: run.store_path.clone(),
            version: run.version.clone(),
        }
    }
}

/// Result of [`RunRecorder::record`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    /// True when the submission matched the latest run and nothing was written
    pub noop: bool,
    /// The written record, or the existing one for a no-op
    pub record_ref: RunRef,
    /// Record as stored; when a concurrent writer created the key first,
    /// the record it left there
    pub record: RunRecord,
    /// Put attempts made (0 for a no-op)
    pub attempts: u32,
}

/// Appends run records
#[derive(Clone)]
pub struct RunRecorder {
    log: AppendOnlyLog,
    index: LatestIndex,
    clock: Arc<dyn Clock>,
    default_executor: String,
}

impl RunRecorder {
    /// Recorder writing through `log`, reading latest runs from `index`
    pub fn new(
        log: AppendOnlyLog,
        index: LatestIndex,
        clock: Arc<dyn Clock>,
        default_executor: impl Into<String>,
    ) -> Self {
        Self {
            log,
            index,
            clock,
            default_executor: default_executor.into(),
        }
    }

    fn layout(&self) -> &RunLayout {
        self.index.layout()
    }

    /// Record one execution
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a bad test path, before any I/O
    /// - `RetriesExhausted` when every put conflicted
    /// - store errors from the latest lookup or the append
    pub fn record(&self, request: RunRequest) -> TallyResult<RecordOutcome> {
        let test_path = TestPath::new(&request.test_path)?;

        if let Some(latest) = self.index.latest_run(&test_path)? {
            if latest.record.same_outcome(request.result, &request.notes) {
                debug!(target: "tally::ledger", test_path = %test_path, run_file = %latest.run_file, "Duplicate of latest run, skipping write");
                return Ok(RecordOutcome {
                    noop: true,
                    record_ref: RunRef::from(&latest),
                    record: latest.record,
                    attempts: 0,
                });
            }
        }

        let executed_at = self.clock.now();
        let record = RunRecord {
            path: test_path.as_str().to_string(),
            story_id: request.story_id,
            result: request.result,
            notes: request.notes,
            executed_by: request
                .executed_by
                .filter(|who| !who.trim().is_empty())
                .unwrap_or_else(|| self.default_executor.clone()),
            executed_at,
            steps: request.steps,
        };
        let payload = record.encode()?;
        let message = format!("Record {} run for {}", record.result, test_path);

        let timestamp_ms = executed_at.timestamp_millis();
        let mut run_file = RunFileName::generate(timestamp_ms, SUFFIX_LEN);
        let appended = self.log.append(
            |kind| {
                if kind == KeyRequest::Regenerated {
                    run_file = RunFileName::generate(timestamp_ms, EXTENDED_SUFFIX_LEN);
                }
                self.layout().run_path(&test_path, &run_file)
            },
            &payload,
            &message,
        )?;

        let record = if appended.status == AppendStatus::AlreadyPresent {
            debug!(target: "tally::ledger", path = %appended.path, "Run key created by a concurrent writer");
            self.stored_record(&test_path, &run_file).unwrap_or(record)
        } else {
            record
        };
        info!(
            target: "tally::ledger",
            test_path = %test_path,
            run_file = %run_file,
            result = %record.result,
            attempts = appended.attempts,
            "Recorded run"
        );

        Ok(RecordOutcome {
            noop: false,
            record_ref: RunRef {
                test_path,
                run_file,
                path: appended.path,
                version: appended.version,
            },
            record,
            attempts: appended.attempts,
        })
    }

    /// Record another writer left at `run_file`, if it decodes
    fn stored_record(&self, test_path: &TestPath, run_file: &RunFileName) -> Option<RunRecord> {
        match self.index.read_run(test_path, run_file) {
            Ok(found) => found.map(|run| run.record),
            Err(e) => {
                warn!(target: "tally::ledger", test_path = %test_path, run_file = %run_file, error = %e, "Existing run unreadable, returning submitted record");
                None
            }
        }
    }
}
