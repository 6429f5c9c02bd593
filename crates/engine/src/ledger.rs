//! Ledger facade
//!
//! Wires one object store and a [`TallyConfig`] into the recorder, the
//! latest index and the batch submitter, and owns the admin-only run
//! deletion. Deleting a run always rebuilds the test's pointer.

use std::path::Path;
use std::sync::Arc;

use tally_concurrency::AppendOnlyLog;
use tally_core::{
    Clock, LatestLookup, LatestPointer, ObjectStore, RunFileName, RunRecord, StoredRun,
    SystemClock, TallyError, TallyResult, TestPath,
};
use tracing::info;

use crate::batch::{BatchReport, BatchSubmitter};
use crate::config::TallyConfig;
use crate::index::{LatestIndex, RebuildOutcome, RunScan};
use crate::recorder::{RecordOutcome, RunRecorder, RunRequest};

/// Execution ledger over a versioned object store
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn ObjectStore>,
    config: TallyConfig,
    clock: Arc<dyn Clock>,
    index: LatestIndex,
    recorder: RunRecorder,
    batch: BatchSubmitter,
}

impl Ledger {
    /// Ledger using the system clock
    ///
    /// # Errors
    ///
    /// `Config` when the configuration does not validate.
    pub fn new(store: Arc<dyn ObjectStore>, config: TallyConfig) -> TallyResult<Self> {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Ledger reading its configuration from a `tally.toml` file
    pub fn open(store: Arc<dyn ObjectStore>, config_path: &Path) -> TallyResult<Self> {
        let config = TallyConfig::from_file(config_path)?;
        Self::new(store, config)
    }

    /// Ledger with an injected clock
    pub fn with_clock(
        store: Arc<dyn ObjectStore>,
        config: TallyConfig,
        clock: Arc<dyn Clock>,
    ) -> TallyResult<Self> {
        config.validate()?;
        let index = LatestIndex::new(
            store.clone(),
            config.branch.clone(),
            config.layout(),
            clock.clone(),
        );
        let log = AppendOnlyLog::new(store.clone(), config.branch.clone(), config.retry);
        let recorder = RunRecorder::new(
            log,
            index.clone(),
            clock.clone(),
            config.default_executor.clone(),
        );
        let batch = BatchSubmitter::new(recorder.clone());

        info!(
            target: "tally::ledger",
            branch = %config.branch,
            runs_root = %config.runs_root,
            "Ledger ready"
        );
        Ok(Self {
            store,
            config,
            clock,
            index,
            recorder,
            batch,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &TallyConfig {
        &self.config
    }

    /// Clock used for timestamps
    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Latest index
    pub fn index(&self) -> &LatestIndex {
        &self.index
    }

    /// Record one execution
    pub fn record_run(&self, request: RunRequest) -> TallyResult<RecordOutcome> {
        self.recorder.record(request)
    }

    /// Record many executions; never fails as a whole
    pub fn submit_batch<I>(&self, requests: I) -> BatchReport
    where
        I: IntoIterator<Item = RunRequest>,
    {
        self.batch.submit(requests)
    }

    /// Latest pointer for a test
    pub fn get_latest(&self, test_path: &str) -> TallyResult<Option<LatestPointer>> {
        self.index.get_latest(&TestPath::new(test_path)?)
    }

    /// Newest full record for a test
    pub fn latest_run(&self, test_path: &str) -> TallyResult<Option<StoredRun>> {
        self.index.latest_run(&TestPath::new(test_path)?)
    }

    /// Up to `limit` runs, newest first
    pub fn list_runs(&self, test_path: &str, limit: usize) -> TallyResult<Vec<RunRecord>> {
        self.index.list_runs(&TestPath::new(test_path)?, limit)
    }

    /// All runs of a test with malformed-file diagnostics
    pub fn scan_runs(&self, test_path: &str) -> TallyResult<RunScan> {
        self.index.scan_runs(&TestPath::new(test_path)?)
    }

    /// Recompute a test's pointer
    pub fn rebuild_latest(&self, test_path: &str) -> TallyResult<RebuildOutcome> {
        self.index.rebuild(&TestPath::new(test_path)?)
    }

    /// Latest pointer of every test from one tree listing
    pub fn latest_for_all(&self) -> TallyResult<LatestLookup> {
        self.index.latest_for_all()
    }

    /// Delete one run and rebuild the test's pointer
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a bad test path or a name that is not a run file
    /// - `NotFound` when the run does not exist
    /// - `VersionConflict` when the run changed between read and delete
    pub fn delete_run(&self, test_path: &str, run_file: &str) -> TallyResult<RebuildOutcome> {
        let test_path = TestPath::new(test_path)?;
        let run_file = RunFileName::parse(run_file).ok_or_else(|| {
            TallyError::invalid_input(format!("'{}' is not a run filename", run_file))
        })?;
        let layout = self.config.layout();
        let path = layout.run_path(&test_path, &run_file);

        let current = self
            .store
            .get(&path, Some(self.config.branch.as_str()))?
            .ok_or_else(|| TallyError::not_found(path.as_str()))?;
        self.store.delete(
            &path,
            &current.version,
            &format!("Delete run {}", run_file),
            &self.config.branch,
        )?;
        info!(target: "tally::ledger", path = %path, "Deleted run");

        self.index.rebuild(&test_path)
    }
}
