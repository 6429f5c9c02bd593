//! Recording runs through the facade

use tally::{ObjectStore, RunOutcome, RunRecord, RunRequest, StepOutcome, StepResult, TallyError};

use crate::test_utils::Fixture;

#[test]
fn test_same_result_twice_writes_once() {
    let f = Fixture::new();
    let first = f
        .tally
        .record_run(RunRequest::new("auth/login", RunOutcome::Fail).with_notes("x"))
        .unwrap();
    f.tick();
    let second = f
        .tally
        .record_run(RunRequest::new("auth/login", RunOutcome::Fail).with_notes("x"))
        .unwrap();

    assert!(!first.noop);
    assert!(second.noop);
    assert_eq!(second.record_ref.path, first.record_ref.path);
    assert_eq!(f.store.stats().writes, 1);
    assert_eq!(f.tally.list_runs("auth/login", 10).unwrap().len(), 1);
}

#[test]
fn test_key_layout_and_payload() {
    let f = Fixture::new();
    let outcome = f
        .tally
        .record_run(
            RunRequest::new("shop/cart/add item", RunOutcome::Pass)
                .with_notes("fine")
                .executed_by("bob")
                .with_story_id("#4")
                .with_steps(vec![
                    StepOutcome::new("open", StepResult::Pass),
                    StepOutcome::new("add", StepResult::Skip).with_notes("flaky"),
                ]),
        )
        .unwrap();

    let path = &outcome.record_ref.path;
    assert!(path.starts_with("runs/shop__cart__add item/run-"));
    assert!(path.ends_with(".json"));
    let file = path.rsplit('/').next().unwrap();
    let suffix = file
        .trim_end_matches(".json")
        .rsplit('-')
        .next()
        .unwrap();
    assert_eq!(suffix.len(), 6);
    assert!(suffix
        .chars()
        .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));

    let blob = f.store.get(path, Some("main")).unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_slice(&blob.content).unwrap();
    assert_eq!(json["path"], "shop/cart/add item");
    assert_eq!(json["storyId"], "#4");
    assert_eq!(json["result"], "pass");
    assert_eq!(json["executed_by"], "bob");
    assert_eq!(json["executed_at"], "2024-03-01T09:00:00Z");
    assert_eq!(json["steps"][1]["result"], "skip");
    assert_eq!(json["steps"][1]["notes"], "flaky");

    let decoded = RunRecord::decode(path, &blob.content).unwrap();
    assert_eq!(decoded, outcome.record);
}

#[test]
fn test_recording_never_writes_pointer() {
    let f = Fixture::new();
    for result in [RunOutcome::Pass, RunOutcome::Fail, RunOutcome::Pass] {
        f.tick();
        f.tally
            .record_run(RunRequest::new("a/b", result))
            .unwrap();
    }
    assert!(!f.store.contains("runs/a__b/latest.json"));
    assert_eq!(
        f.tally.get_latest("a/b").unwrap().unwrap().result,
        RunOutcome::Pass
    );
}

#[test]
fn test_reserved_marker_rejected() {
    let f = Fixture::new();
    let err = f
        .tally
        .record_run(RunRequest::new("auth__login", RunOutcome::Pass))
        .unwrap_err();
    assert!(matches!(err, TallyError::InvalidInput { .. }));
    assert!(f.store.is_empty());
}

#[test]
fn test_open_applies_config_file() {
    use std::sync::Arc;
    use tally::{InMemoryObjectStore, Tally};

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(tally::CONFIG_FILE_NAME);
    std::fs::write(
        &path,
        "runs_root = \"executions\"\ndefault_executor = \"nightly\"\n",
    )
    .unwrap();

    let store = Arc::new(InMemoryObjectStore::new());
    let tally = Tally::open(store.clone(), &path).unwrap();
    let outcome = tally
        .record_run(RunRequest::new("auth/login", RunOutcome::Pass))
        .unwrap();

    assert!(outcome.record_ref.path.starts_with("executions/auth__login/run-"));
    assert_eq!(outcome.record.executed_by, "nightly");
}

#[test]
fn test_open_rejects_invalid_config() {
    use std::sync::Arc;
    use tally::{InMemoryObjectStore, Tally};

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tally.toml");
    std::fs::write(&path, "branch = \"\"\n").unwrap();

    let err = Tally::open(Arc::new(InMemoryObjectStore::new()), &path).err().unwrap();
    assert!(matches!(err, TallyError::Config { .. }));
}
