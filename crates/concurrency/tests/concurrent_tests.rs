//! Multi-threaded append tests
//!
//! Writers share one in-memory store and race on keys. The append protocol
//! must never lose a payload and never report failure for a key that some
//! writer managed to create.

use std::sync::{Arc, Barrier};
use std::thread;

use tally_concurrency::{AppendOnlyLog, AppendStatus, KeyRequest, RetryConfig};
use tally_core::ObjectStore;
use tally_storage::InMemoryObjectStore;

fn fast_retry() -> RetryConfig {
    RetryConfig::default().with_base_delay_ms(0).with_max_delay_ms(0)
}

#[test]
fn test_racing_writers_on_same_key_all_succeed_once_written() {
    let store = Arc::new(InMemoryObjectStore::new());
    let log = AppendOnlyLog::new(store.clone(), "main", fast_retry());
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let log = log.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                log.append(
                    |req| match req {
                        KeyRequest::Fresh => "runs/shared/run-1-aaaaaa.json".to_string(),
                        KeyRequest::Regenerated => format!("runs/shared/run-1-extra{}.json", i),
                    },
                    format!("{{\"writer\":{}}}", i).as_bytes(),
                    "race",
                )
                .unwrap()
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let written = results
        .iter()
        .filter(|a| a.status == AppendStatus::Written)
        .count();
    assert_eq!(written, 1, "exactly one writer stores the shared key");
    assert!(results
        .iter()
        .all(|a| a.path == "runs/shared/run-1-aaaaaa.json"));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_writers_on_distinct_keys_never_conflict() {
    let store = Arc::new(InMemoryObjectStore::new());
    let log = AppendOnlyLog::new(store.clone(), "main", fast_retry());

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let log = log.clone();
            thread::spawn(move || {
                log.append(
                    |_| format!("runs/test{}/run-{}-abcdef.json", i % 4, i),
                    b"{}",
                    "append",
                )
                .unwrap()
            })
        })
        .collect();

    for h in handles {
        let appended = h.join().unwrap();
        assert_eq!(appended.attempts, 1);
        assert_eq!(appended.status, AppendStatus::Written);
    }
    assert_eq!(store.len(), 16);
    assert_eq!(store.list_tree_recursive("main").unwrap().len(), 16);
}
