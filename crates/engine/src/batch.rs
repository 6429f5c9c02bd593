//! Batch submission
//!
//! Items are recorded one after another. A failing item is captured in the
//! report and the remaining items still run, so partial application is
//! expected and visible.

use serde::Serialize;
use tally_core::TallyError;
use tracing::{info, warn};

use crate::recorder::{RunRecorder, RunRequest};

/// Per-item status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// A new record was written
    Recorded,
    /// Identical to the latest run; nothing written
    Noop,
    /// Recording failed; see [`ItemReport::error`]
    Failed,
}

/// Outcome of one batch item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReport {
    /// Position in the submitted batch
    pub index: usize,
    /// Test path as submitted
    pub test_path: String,
    /// What happened
    pub status: ItemStatus,
    /// Filename of the written or matched run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_file: Option<String>,
    /// Failure cause
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_error"
    )]
    pub error: Option<TallyError>,
}

fn serialize_error<S>(error: &Option<TallyError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Summary of a batch submission
///
/// `succeeded` counts every item that did not fail, no-ops included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Items submitted
    pub total: usize,
    /// Items recorded or matched
    pub succeeded: usize,
    /// Items that failed
    pub failed: usize,
    /// Items that matched the latest run
    pub noops: usize,
    /// Per-item detail in submission order
    pub items: Vec<ItemReport>,
}

impl BatchReport {
    /// True when no item failed
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    /// Failed items
    pub fn failures(&self) -> impl Iterator<Item = &ItemReport> {
        self.items
            .iter()
            .filter(|item| item.status == ItemStatus::Failed)
    }

    fn push(&mut self, item: ItemReport) {
        self.total += 1;
        match item.status {
            ItemStatus::Recorded => self.succeeded += 1,
            ItemStatus::Noop => {
                self.succeeded += 1;
                self.noops += 1;
            }
            ItemStatus::Failed => self.failed += 1,
        }
        self.items.push(item);
    }
}

/// Drives a [`RunRecorder`] over many requests
#[derive(Clone)]
pub struct BatchSubmitter {
    recorder: RunRecorder,
}

impl BatchSubmitter {
    /// Submitter over `recorder`
    pub fn new(recorder: RunRecorder) -> Self {
        Self { recorder }
    }

    /// Record every request in order
    ///
    /// Never fails as a whole; per-item errors are in the report.
    pub fn submit<I>(&self, requests: I) -> BatchReport
    where
        I: IntoIterator<Item = RunRequest>,
    {
        let mut report = BatchReport::default();
        for (index, request) in requests.into_iter().enumerate() {
            let test_path = request.test_path.clone();
            let item = match self.recorder.record(request) {
                Ok(outcome) => ItemReport {
                    index,
                    test_path,
                    status: if outcome.noop {
                        ItemStatus::Noop
                    } else {
                        ItemStatus::Recorded
                    },
                    run_file: Some(outcome.record_ref.run_file.to_string()),
                    error: None,
                },
                Err(e) => {
                    warn!(target: "tally::batch", index, test_path = %test_path, error = %e, "Batch item failed");
                    ItemReport {
                        index,
                        test_path,
                        status: ItemStatus::Failed,
                        run_file: None,
                        error: Some(e),
                    }
                }
            };
            report.push(item);
        }

        info!(
            target: "tally::batch",
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            noops = report.noops,
            "Batch submitted"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::LatestIndex;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use tally_concurrency::{AppendOnlyLog, RetryConfig};
    use tally_core::{ManualClock, RunLayout, RunOutcome};
    use tally_storage::testing::{Fault, FaultOp, FaultRule};
    use tally_storage::InMemoryObjectStore;

    fn submitter() -> (Arc<InMemoryObjectStore>, BatchSubmitter) {
        let store = Arc::new(InMemoryObjectStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        ));
        let index = LatestIndex::new(store.clone(), "main", RunLayout::new("runs"), clock.clone());
        let log = AppendOnlyLog::new(
            store.clone(),
            "main",
            RetryConfig::default().with_base_delay_ms(0).with_max_delay_ms(0),
        );
        let recorder = RunRecorder::new(log, index, clock, "ci");
        (store, BatchSubmitter::new(recorder))
    }

    #[test]
    fn test_failing_item_does_not_abort_batch() {
        let (store, batch) = submitter();
        let report = batch.submit(vec![
            RunRequest::new("a/one", RunOutcome::Pass),
            RunRequest::new("a//two", RunOutcome::Fail),
            RunRequest::new("a/three", RunOutcome::Pass),
        ]);

        assert_eq!(report.total, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert!(!report.all_succeeded());
        assert_eq!(store.len(), 2);

        let failed: Vec<_> = report.failures().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].index, 1);
        assert!(matches!(
            failed[0].error,
            Some(TallyError::InvalidInput { .. })
        ));
        assert!(report.items[0].run_file.is_some());
        assert!(report.items[2].run_file.is_some());
    }

    #[test]
    fn test_store_failure_mid_batch() {
        let (store, batch) = submitter();
        store.inject(
            FaultRule::new(FaultOp::Put, Fault::Unavailable).matching("a__two"),
        );
        let report = batch.submit(vec![
            RunRequest::new("a/one", RunOutcome::Pass),
            RunRequest::new("a/two", RunOutcome::Pass),
            RunRequest::new("a/three", RunOutcome::Fail),
        ]);
        assert_eq!(report.failed, 1);
        assert_eq!(report.items[1].status, ItemStatus::Failed);
        assert_eq!(report.items[2].status, ItemStatus::Recorded);
    }

    #[test]
    fn test_noops_counted_as_successes() {
        let (_, batch) = submitter();
        let report = batch.submit(vec![
            RunRequest::new("a/b", RunOutcome::Fail).with_notes("x"),
            RunRequest::new("a/b", RunOutcome::Fail).with_notes("x"),
        ]);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.noops, 1);
        assert_eq!(report.items[1].status, ItemStatus::Noop);
        assert_eq!(report.items[0].run_file, report.items[1].run_file);
    }

    #[test]
    fn test_empty_batch() {
        let (_, batch) = submitter();
        let report = batch.submit(Vec::new());
        assert_eq!(report, BatchReport::default());
        assert!(report.all_succeeded());
    }

    #[test]
    fn test_report_serializes_error_text() {
        let (_, batch) = submitter();
        let report = batch.submit(vec![RunRequest::new("", RunOutcome::Pass)]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["failed"], 1);
        assert_eq!(json["items"][0]["status"], "failed");
        assert!(json["items"][0]["error"]
            .as_str()
            .unwrap()
            .contains("empty"));
        assert!(json["items"][0].get("run_file").is_none());
    }
}
