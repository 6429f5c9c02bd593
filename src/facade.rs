//! Top-level handle pairing the ledger with cached matrix builds

use std::path::Path;
use std::sync::Arc;

use tally_core::{
    Clock, Defect, LatestPointer, ObjectStore, RunRecord, Story, SystemClock, TallyResult,
    TestCase,
};
use tally_engine::{BatchReport, Ledger, RebuildOutcome, RecordOutcome, RunRequest, TallyConfig};
use tally_storage::InMemoryObjectStore;
use tally_traceability::{Matrix, MatrixService};

/// Ledger plus matrix service over one store
#[derive(Clone)]
pub struct Tally {
    ledger: Ledger,
    matrices: MatrixService,
}

impl Tally {
    /// Open over `store` with `config`
    pub fn new(store: Arc<dyn ObjectStore>, config: TallyConfig) -> TallyResult<Self> {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Open over `store`, reading `tally.toml` from `config_path`
    pub fn open(store: Arc<dyn ObjectStore>, config_path: &Path) -> TallyResult<Self> {
        Self::new(store, TallyConfig::from_file(config_path)?)
    }

    /// In-memory store with default configuration
    pub fn ephemeral() -> TallyResult<Self> {
        Self::new(Arc::new(InMemoryObjectStore::new()), TallyConfig::default())
    }

    /// Open with an injected clock
    pub fn with_clock(
        store: Arc<dyn ObjectStore>,
        config: TallyConfig,
        clock: Arc<dyn Clock>,
    ) -> TallyResult<Self> {
        let ttl = config.cache_ttl();
        let ledger = Ledger::with_clock(store, config, clock.clone())?;
        Ok(Self {
            ledger,
            matrices: MatrixService::with_ttl(clock, ttl),
        })
    }

    /// Underlying ledger
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Record one execution
    pub fn record_run(&self, request: RunRequest) -> TallyResult<RecordOutcome> {
        self.ledger.record_run(request)
    }

    /// Record many executions
    pub fn submit_batch(&self, requests: Vec<RunRequest>) -> BatchReport {
        self.ledger.submit_batch(requests)
    }

    /// Latest pointer for a test
    pub fn get_latest(&self, test_path: &str) -> TallyResult<Option<LatestPointer>> {
        self.ledger.get_latest(test_path)
    }

    /// Runs of a test, newest first
    pub fn list_runs(&self, test_path: &str, limit: usize) -> TallyResult<Vec<RunRecord>> {
        self.ledger.list_runs(test_path, limit)
    }

    /// Delete a run, rebuild its pointer and drop cached matrices
    pub fn delete_run(&self, test_path: &str, run_file: &str) -> TallyResult<RebuildOutcome> {
        let outcome = self.ledger.delete_run(test_path, run_file)?;
        self.matrices.invalidate_all();
        Ok(outcome)
    }

    /// Traceability matrix using latest results from a full tree scan
    pub fn build_matrix(
        &self,
        stories: &[Story],
        tests: &[TestCase],
        defects: &[Defect],
        force_refresh: bool,
    ) -> TallyResult<Arc<Matrix>> {
        self.matrices.matrix(
            stories,
            tests,
            defects,
            || self.ledger.latest_for_all(),
            force_refresh,
        )
    }
}
