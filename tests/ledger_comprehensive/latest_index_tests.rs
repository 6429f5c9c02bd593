//! Pointer fallback and rebuild-on-delete

use tally::{RebuildOutcome, RunOutcome, RunRequest};
use tally_storage::testing::{Fault, FaultOp, FaultRule};

use crate::test_utils::Fixture;

#[test]
fn test_unknown_test_has_no_latest() {
    let f = Fixture::new();
    assert_eq!(f.tally.get_latest("never/ran").unwrap(), None);
    assert!(f.tally.list_runs("never/ran", 10).unwrap().is_empty());
}

#[test]
fn test_delete_sole_run_clears_latest() {
    let f = Fixture::new();
    let run = f
        .tally
        .record_run(RunRequest::new("a/b", RunOutcome::Fail))
        .unwrap();
    f.tally.ledger().rebuild_latest("a/b").unwrap();
    assert!(f.store.contains("runs/a__b/latest.json"));

    let outcome = f
        .tally
        .delete_run("a/b", &run.record_ref.run_file.to_string())
        .unwrap();
    assert_eq!(
        outcome,
        RebuildOutcome::Cleared {
            deleted_pointer: true
        }
    );
    assert_eq!(f.tally.get_latest("a/b").unwrap(), None);
    assert!(f.store.is_empty());
}

#[test]
fn test_delete_older_of_two_keeps_newer() {
    let f = Fixture::new();
    let older = f
        .tally
        .record_run(RunRequest::new("a/b", RunOutcome::Fail))
        .unwrap();
    f.tick();
    let newer = f
        .tally
        .record_run(RunRequest::new("a/b", RunOutcome::Pass))
        .unwrap();

    f.tally
        .delete_run("a/b", &older.record_ref.run_file.to_string())
        .unwrap();
    let latest = f.tally.get_latest("a/b").unwrap().unwrap();
    assert_eq!(latest.run_file, newer.record_ref.run_file.to_string());
    assert_eq!(latest.result, RunOutcome::Pass);
    assert_eq!(latest.executed_at, newer.record.executed_at);
}

#[test]
fn test_corrupt_pointer_falls_back_to_scan() {
    let f = Fixture::new();
    f.tally
        .record_run(RunRequest::new("a/b", RunOutcome::Fail))
        .unwrap();
    f.store
        .insert_raw("runs/a__b/latest.json", b"{\"result\":\"pass\"}".to_vec());

    let latest = f.tally.get_latest("a/b").unwrap().unwrap();
    assert_eq!(latest.result, RunOutcome::Fail);
}

#[test]
fn test_pointer_read_outage_falls_back_to_scan() {
    let f = Fixture::new();
    f.tally
        .record_run(RunRequest::new("a/b", RunOutcome::Pass))
        .unwrap();
    f.tally.ledger().rebuild_latest("a/b").unwrap();
    f.store.inject(
        FaultRule::new(FaultOp::Get, Fault::Unavailable)
            .matching("latest.json")
            .always(),
    );

    let latest = f.tally.get_latest("a/b").unwrap().unwrap();
    assert_eq!(latest.result, RunOutcome::Pass);
}

#[test]
fn test_malformed_runs_reported_not_fatal() {
    let f = Fixture::new();
    f.tally
        .record_run(RunRequest::new("a/b", RunOutcome::Pass))
        .unwrap();
    f.store
        .insert_raw("runs/a__b/run-1-zzzzzz.json", b"<html>rate limited</html>".to_vec());

    let scan = f.tally.ledger().scan_runs("a/b").unwrap();
    assert_eq!(scan.runs.len(), 1);
    assert_eq!(scan.malformed.len(), 1);
    assert_eq!(scan.malformed[0].path, "runs/a__b/run-1-zzzzzz.json");
}

#[test]
fn test_list_runs_newest_first_with_limit() {
    let f = Fixture::new();
    for i in 0..4 {
        f.tick();
        f.tally
            .record_run(RunRequest::new("a/b", RunOutcome::Fail).with_notes(format!("n{}", i)))
            .unwrap();
    }
    let runs = f.tally.list_runs("a/b", 3).unwrap();
    let notes: Vec<&str> = runs.iter().map(|r| r.notes.as_str()).collect();
    assert_eq!(notes, vec!["n3", "n2", "n1"]);
}
