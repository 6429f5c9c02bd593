//! Batch submission isolation

use tally::{ItemStatus, RunOutcome, RunRequest, TallyError};
use tally_storage::testing::{Fault, FaultOp, FaultRule};

use crate::test_utils::Fixture;

#[test]
fn test_middle_item_failure_isolated() {
    let f = Fixture::new();
    f.store.inject(
        FaultRule::new(FaultOp::Put, Fault::Unavailable).matching("runs/b__two/"),
    );

    let report = f.tally.submit_batch(vec![
        RunRequest::new("a/one", RunOutcome::Pass),
        RunRequest::new("b/two", RunOutcome::Fail),
        RunRequest::new("c/three", RunOutcome::Pass),
    ]);

    assert_eq!(report.total, 3);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.items[0].status, ItemStatus::Recorded);
    assert_eq!(report.items[1].status, ItemStatus::Failed);
    assert!(matches!(
        report.items[1].error,
        Some(TallyError::UpstreamUnavailable { .. })
    ));
    assert_eq!(report.items[2].status, ItemStatus::Recorded);

    assert!(f.tally.get_latest("a/one").unwrap().is_some());
    assert!(f.tally.get_latest("b/two").unwrap().is_none());
    assert!(f.tally.get_latest("c/three").unwrap().is_some());
}

#[test]
fn test_batch_from_json_payload() {
    let f = Fixture::new();
    let requests: Vec<RunRequest> = serde_json::from_str(
        r#"[
            {"test_path": "auth/login", "result": "pass", "notes": "ok", "executed_by": "ci"},
            {"test_path": "auth/login", "result": "pass", "notes": "ok"},
            {"test_path": "", "result": "fail"}
        ]"#,
    )
    .unwrap();

    let report = f.tally.submit_batch(requests);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.noops, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.items[2].index, 2);
    assert!(report.items[2].run_file.is_none());
}
