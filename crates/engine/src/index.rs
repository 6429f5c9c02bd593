//! Latest index maintainer
//!
//! Each run directory may hold a `latest.json` pointer to its newest run.
//! The pointer is only a hint:
//!
//! - it is never written when a run is recorded
//! - it is rewritten by [`LatestIndex::rebuild`] after a run is deleted
//! - readers always list the directory and trust the pointer only when it
//!   names the newest run file
//!
//! The newest run is the one with the greatest `(timestamp, suffix)` in its
//! filename. Payloads that fail to decode are skipped and reported as
//! [`MalformedRecord`] diagnostics.

use std::collections::BTreeMap;
use std::sync::Arc;

use tally_core::{
    Clock, LatestLookup, LatestPointer, MalformedRecord, ObjectStore, ObjectVersion, RunFileName,
    RunLayout, RunRecord, StoredRun, TallyError, TallyResult, TestPath,
};
use tracing::{debug, info, warn};

/// Runs of one test, newest first, plus skipped payloads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunScan {
    /// Decoded runs ordered newest first
    pub runs: Vec<StoredRun>,
    /// Run files that could not be decoded
    pub malformed: Vec<MalformedRecord>,
}

impl RunScan {
    /// Newest decodable run
    pub fn newest(&self) -> Option<&StoredRun> {
        self.runs.first()
    }
}

/// What a rebuild did to the pointer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildOutcome {
    /// No runs remain; the pointer is gone
    Cleared {
        /// Whether a pointer existed and was deleted
        deleted_pointer: bool,
    },
    /// Pointer now references the newest remaining run
    Updated {
        /// Pointer that was written
        pointer: LatestPointer,
        /// Version of the written pointer blob
        version: ObjectVersion,
    },
}

/// Reads and repairs per-test latest pointers
#[derive(Clone)]
pub struct LatestIndex {
    store: Arc<dyn ObjectStore>,
    branch: String,
    layout: RunLayout,
    clock: Arc<dyn Clock>,
}

impl LatestIndex {
    /// Index over `layout` on `branch` of `store`
    pub fn new(
        store: Arc<dyn ObjectStore>,
        branch: impl Into<String>,
        layout: RunLayout,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            branch: branch.into(),
            layout,
            clock,
        }
    }

    /// Key layout in use
    pub fn layout(&self) -> &RunLayout {
        &self.layout
    }

    /// Latest pointer for a test
    ///
    /// Lists the directory, then reads `latest.json`. The pointer is served
    /// only when it names the newest run file; when it is absent, stale,
    /// unreadable or unparsable, a pointer is synthesized from the newest
    /// decodable run, stamped with that run's execution time. If the listing
    /// itself fails, a readable pointer is served as a best-effort answer.
    ///
    /// # Errors
    ///
    /// Listing errors when no pointer can be read. A missing directory is
    /// `None`.
    pub fn get_latest(&self, test_path: &TestPath) -> TallyResult<Option<LatestPointer>> {
        let files = match self.run_files(test_path) {
            Ok(files) => files,
            Err(e) => {
                return match self.read_pointer(test_path) {
                    Some((pointer, _)) => {
                        warn!(target: "tally::index", test_path = %test_path, error = %e, "Listing failed, serving pointer");
                        Ok(Some(pointer))
                    }
                    None => Err(e),
                };
            }
        };
        let Some(newest) = files.first() else {
            return Ok(None);
        };

        if let Some((pointer, _)) = self.read_pointer(test_path) {
            if pointer.run_file == newest.to_string() {
                return Ok(Some(pointer));
            }
            debug!(target: "tally::index", test_path = %test_path, pointer = %pointer.run_file, newest = %newest, "Pointer is stale, scanning");
        }
        let run = self.newest_of(test_path, &files)?;
        Ok(run.map(|run| LatestPointer::for_run(&run, run.record.executed_at)))
    }

    /// Full record of the newest run of a test
    ///
    /// Always decided by the directory listing, never by the pointer, so a
    /// stale pointer cannot hide a newer run.
    pub fn latest_run(&self, test_path: &TestPath) -> TallyResult<Option<StoredRun>> {
        let files = self.run_files(test_path)?;
        self.newest_of(test_path, &files)
    }

    /// Every decodable run of a test, newest first
    ///
    /// # Errors
    ///
    /// Store errors other than a missing directory. Undecodable payloads
    /// land in [`RunScan::malformed`].
    pub fn scan_runs(&self, test_path: &TestPath) -> TallyResult<RunScan> {
        let mut scan = RunScan::default();
        for run_file in self.run_files(test_path)? {
            match self.read_run(test_path, &run_file) {
                Ok(Some(run)) => scan.runs.push(run),
                Ok(None) => {}
                Err(e @ TallyError::MalformedRecord { .. }) => {
                    let path = self.layout.run_path(test_path, &run_file);
                    warn!(target: "tally::index", path = %path, error = %e, "Skipping malformed run");
                    scan.malformed.push(MalformedRecord::from_error(&path, &e));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(scan)
    }

    /// At most `limit` runs of a test, newest first
    pub fn list_runs(&self, test_path: &TestPath, limit: usize) -> TallyResult<Vec<RunRecord>> {
        let scan = self.scan_runs(test_path)?;
        Ok(scan
            .runs
            .into_iter()
            .take(limit)
            .map(|run| run.record)
            .collect())
    }

    /// Recompute the pointer from the runs that remain
    ///
    /// With no runs left the pointer is deleted. Otherwise it is written for
    /// the newest run using the current pointer version as the expected
    /// version. A single conflict re-reads the pointer and retries.
    pub fn rebuild(&self, test_path: &TestPath) -> TallyResult<RebuildOutcome> {
        let scan = self.scan_runs(test_path)?;
        let pointer_path = self.layout.pointer_path(test_path);

        let outcome = match scan.newest() {
            None => {
                let deleted_pointer = self.delete_pointer(&pointer_path)?;
                RebuildOutcome::Cleared { deleted_pointer }
            }
            Some(run) => {
                let pointer = LatestPointer::for_run(run, self.clock.now());
                let version = self.write_pointer(&pointer_path, &pointer)?;
                RebuildOutcome::Updated { pointer, version }
            }
        };

        info!(
            target: "tally::index",
            test_path = %test_path,
            runs = scan.runs.len(),
            malformed = scan.malformed.len(),
            cleared = matches!(outcome, RebuildOutcome::Cleared { .. }),
            "Rebuilt latest pointer"
        );
        Ok(outcome)
    }

    /// Latest pointer for every test, from one recursive tree listing
    ///
    /// Pointer files are ignored; each directory's newest decodable run
    /// wins. Used on cold start and for full matrix builds.
    pub fn latest_for_all(&self) -> TallyResult<LatestLookup> {
        let mut grouped: BTreeMap<String, (TestPath, Vec<RunFileName>)> = BTreeMap::new();
        for blob_path in self.store.list_tree_recursive(&self.branch)? {
            let Some((test_path, file)) = self.layout.classify(&blob_path) else {
                continue;
            };
            let Some(run_file) = RunFileName::parse(&file) else {
                continue;
            };
            grouped
                .entry(test_path.as_str().to_string())
                .or_insert_with(|| (test_path, Vec::new()))
                .1
                .push(run_file);
        }

        let mut lookup = LatestLookup::new();
        for (key, (test_path, mut files)) in grouped {
            files.sort_unstable_by(|a, b| b.cmp(a));
            for run_file in files {
                match self.read_run(&test_path, &run_file) {
                    Ok(Some(run)) => {
                        lookup.insert(key, LatestPointer::for_run(&run, run.record.executed_at));
                        break;
                    }
                    Ok(None) => {}
                    Err(e @ TallyError::MalformedRecord { .. }) => {
                        let path = self.layout.run_path(&test_path, &run_file);
                        warn!(target: "tally::index", path = %path, error = %e, "Skipping malformed run");
                        lookup.push_malformed(MalformedRecord::from_error(&path, &e));
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        debug!(target: "tally::index", tests = lookup.len(), malformed = lookup.malformed().len(), "Full latest scan");
        Ok(lookup)
    }

    /// Latest pointers for the given tests via per-test reads
    pub fn lookup_for(&self, test_paths: &[TestPath]) -> TallyResult<LatestLookup> {
        let mut lookup = LatestLookup::new();
        for test_path in test_paths {
            if let Some(pointer) = self.get_latest(test_path)? {
                lookup.insert(test_path.as_str(), pointer);
            }
        }
        Ok(lookup)
    }

    fn read_pointer(&self, test_path: &TestPath) -> Option<(LatestPointer, ObjectVersion)> {
        let path = self.layout.pointer_path(test_path);
        match self.store.get(&path, Some(self.branch.as_str())) {
            Ok(Some(object)) => match LatestPointer::decode(&path, &object.content) {
                Ok(pointer) => Some((pointer, object.version)),
                Err(e) => {
                    warn!(target: "tally::index", path = %path, error = %e, "Unparsable pointer, scanning");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(target: "tally::index", path = %path, error = %e, "Pointer unreadable, scanning");
                None
            }
        }
    }

    /// Run filenames in a test directory, newest first
    fn run_files(&self, test_path: &TestPath) -> TallyResult<Vec<RunFileName>> {
        let dir = self.layout.directory(test_path);
        let entries = match self.store.list_directory(&dir) {
            Ok(entries) => entries,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut files: Vec<RunFileName> = entries
            .iter()
            .filter(|entry| entry.is_file())
            .filter_map(|entry| RunFileName::parse(&entry.name))
            .collect();
        files.sort_unstable_by(|a, b| b.cmp(a));
        Ok(files)
    }

    /// First decodable run among `files`, which are ordered newest first
    fn newest_of(&self, test_path: &TestPath, files: &[RunFileName]) -> TallyResult<Option<StoredRun>> {
        for run_file in files {
            match self.read_run(test_path, run_file) {
                Ok(Some(run)) => return Ok(Some(run)),
                Ok(None) => {}
                Err(e @ TallyError::MalformedRecord { .. }) => {
                    warn!(target: "tally::index", test_path = %test_path, run_file = %run_file, error = %e, "Skipping malformed run");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    /// One run by filename; `None` when absent
    ///
    /// # Errors
    ///
    /// `MalformedRecord` when the payload does not decode, plus store errors.
    pub fn read_run(&self, test_path: &TestPath, run_file: &RunFileName) -> TallyResult<Option<StoredRun>> {
        let path = self.layout.run_path(test_path, run_file);
        let Some(object) = self.store.get(&path, Some(self.branch.as_str()))? else {
            return Ok(None);
        };
        let record = RunRecord::decode(&path, &object.content)?;
        Ok(Some(StoredRun {
            test_path: test_path.clone(),
            run_file: run_file.clone(),
            store_path: path,
            version: object.version,
            record,
        }))
    }

    fn write_pointer(&self, path: &str, pointer: &LatestPointer) -> TallyResult<ObjectVersion> {
        let payload = pointer.encode()?;
        let message = format!("Update latest pointer -> {}", pointer.run_file);
        let mut retried = false;
        loop {
            let current = self.store.get(path, Some(self.branch.as_str()))?;
            let expected = current.as_ref().map(|object| &object.version);
            match self.store.put(path, &payload, &message, expected, &self.branch) {
                Ok(version) => return Ok(version),
                Err(e) if e.is_conflict() && !retried => {
                    warn!(target: "tally::index", path = %path, error = %e, "Pointer write conflict, retrying");
                    retried = true;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn delete_pointer(&self, path: &str) -> TallyResult<bool> {
        let mut retried = false;
        loop {
            let Some(current) = self.store.get(path, Some(self.branch.as_str()))? else {
                return Ok(false);
            };
            match self
                .store
                .delete(path, &current.version, "Remove latest pointer", &self.branch)
            {
                Ok(()) => return Ok(true),
                Err(e) if e.is_not_found() => return Ok(false),
                Err(e) if e.is_conflict() && !retried => {
                    warn!(target: "tally::index", path = %path, error = %e, "Pointer delete conflict, retrying");
                    retried = true;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
