//! Conflict protocol observed end to end

use tally::{RunOutcome, RunRequest, TallyError};
use tally_storage::testing::{Fault, FaultOp, FaultRule};

use crate::test_utils::Fixture;

#[test]
fn test_spurious_conflict_regenerates_key() {
    let f = Fixture::new();
    f.store
        .inject(FaultRule::new(FaultOp::Put, Fault::SpuriousConflict));

    let outcome = f
        .tally
        .record_run(RunRequest::new("a/b", RunOutcome::Pass))
        .unwrap();
    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.record_ref.run_file.suffix().len(), 12);
    assert_eq!(f.store.len(), 1);
}

#[test]
fn test_materialized_conflict_needs_no_second_write() {
    let f = Fixture::new();
    f.store
        .inject(FaultRule::new(FaultOp::Put, Fault::MaterializedConflict));

    let outcome = f
        .tally
        .record_run(RunRequest::new("a/b", RunOutcome::Fail))
        .unwrap();
    assert!(!outcome.noop);
    assert_eq!(f.store.stats().put_attempts, 1);
    assert_eq!(f.tally.list_runs("a/b", 5).unwrap().len(), 1);
}

#[test]
fn test_persistent_conflicts_exhaust_after_five_attempts() {
    let f = Fixture::new();
    f.store
        .inject(FaultRule::new(FaultOp::Put, Fault::SpuriousConflict).always());

    match f
        .tally
        .record_run(RunRequest::new("a/b", RunOutcome::Pass))
        .unwrap_err()
    {
        TallyError::RetriesExhausted { attempts, path } => {
            assert_eq!(attempts, 5);
            assert!(path.starts_with("runs/a__b/run-"));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(f.store.stats().put_attempts, 5);
    assert!(f.store.is_empty());
}

#[test]
fn test_configured_attempts_respected() {
    let mut config = tally::TallyConfig::default();
    config.retry = config
        .retry
        .with_max_attempts(2)
        .with_base_delay_ms(0)
        .with_max_delay_ms(0);
    let f = Fixture::with_config(config);
    f.store
        .inject(FaultRule::new(FaultOp::Put, Fault::SpuriousConflict).always());

    let err = f
        .tally
        .record_run(RunRequest::new("a/b", RunOutcome::Pass))
        .unwrap_err();
    assert!(matches!(err, TallyError::RetriesExhausted { attempts: 2, .. }));
}
