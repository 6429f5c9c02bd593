//! In-memory object store
//!
//! Implements [`ObjectStore`] over a `DashMap` of path to blob. Conditional
//! writes are decided under the map's per-shard entry lock, so two writers
//! racing on the same path see exactly one winner and one
//! `VersionConflict`, the same guarantee the hosting platform gives.
//!
//! # Design
//!
//! - DashMap: sharded, lock-free reads, only the target shard locks on write
//! - Version tokens: xxh3 of the content seeded with a global write counter,
//!   so rewriting identical bytes still yields a fresh token
//! - One branch: calls naming another branch or ref are rejected
//! - Fault plan: checked before every call (see [`crate::testing`])

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tally_core::{
    DirectoryEntry, EntryKind, ObjectStore, ObjectVersion, StoredObject, TallyError,
    TallyResult,
};
use tracing::debug;
use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::testing::{Fault, FaultOp, FaultPlan, FaultRule};

/// Default branch name
pub const DEFAULT_BRANCH: &str = "main";

#[derive(Debug, Clone)]
struct Blob {
    content: Vec<u8>,
    version: ObjectVersion,
}

/// Counters of store traffic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// `get` calls
    pub gets: u64,
    /// `put` calls, including rejected ones
    pub put_attempts: u64,
    /// `put` calls that stored a blob
    pub writes: u64,
    /// `delete` calls that removed a blob
    pub deletes: u64,
    /// `list_directory` and `list_tree_recursive` calls
    pub listings: u64,
}

#[derive(Debug, Default)]
struct Counters {
    gets: AtomicU64,
    put_attempts: AtomicU64,
    writes: AtomicU64,
    deletes: AtomicU64,
    listings: AtomicU64,
}

/// Single-branch, in-process object store
#[derive(Debug)]
pub struct InMemoryObjectStore {
    branch: String,
    objects: DashMap<String, Blob>,
    write_counter: AtomicU64,
    faults: Mutex<FaultPlan>,
    counters: Counters,
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::with_branch(DEFAULT_BRANCH)
    }
}

impl InMemoryObjectStore {
    /// Empty store on branch `main`
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store on a named branch
    pub fn with_branch(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            objects: DashMap::new(),
            write_counter: AtomicU64::new(0),
            faults: Mutex::new(FaultPlan::new()),
            counters: Counters::default(),
        }
    }

    /// Branch this store serves
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Add a fault rule
    pub fn inject(&self, rule: FaultRule) {
        self.faults.lock().push(rule);
    }

    /// Remove all fault rules
    pub fn clear_faults(&self) {
        self.faults.lock().clear();
    }

    /// Number of faults fired so far
    pub fn faults_fired(&self) -> u64 {
        self.faults.lock().fired()
    }

    /// Snapshot of traffic counters
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            gets: self.counters.gets.load(Ordering::Relaxed),
            put_attempts: self.counters.put_attempts.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
            deletes: self.counters.deletes.load(Ordering::Relaxed),
            listings: self.counters.listings.load(Ordering::Relaxed),
        }
    }

    /// Number of stored blobs
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Sorted list of all blob paths
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.objects.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        paths
    }

    /// Whether a blob exists at `path`
    pub fn contains(&self, path: &str) -> bool {
        self.objects.contains_key(path)
    }

    /// Store bytes unconditionally, bypassing faults and counters
    ///
    /// Used to seed fixtures, including payloads the decoders must reject.
    pub fn insert_raw(&self, path: &str, content: impl Into<Vec<u8>>) -> ObjectVersion {
        let content = content.into();
        let version = self.next_version(&content);
        self.objects.insert(
            path.to_string(),
            Blob {
                content,
                version: version.clone(),
            },
        );
        version
    }

    /// Remove a blob unconditionally, bypassing faults and counters
    pub fn remove_raw(&self, path: &str) -> bool {
        self.objects.remove(path).is_some()
    }

    fn next_version(&self, content: &[u8]) -> ObjectVersion {
        let seed = self.write_counter.fetch_add(1, Ordering::SeqCst) + 1;
        ObjectVersion::new(format!("{:016x}", xxh3_64_with_seed(content, seed)))
    }

    fn check_fault(&self, op: FaultOp, path: &str) -> Option<Fault> {
        let fault = self.faults.lock().check(op, path);
        if let Some(f) = fault {
            debug!(target: "tally::store", ?op, ?f, path, "Injected fault");
        }
        fault
    }

    fn check_ref(&self, reference: Option<&str>) -> TallyResult<()> {
        match reference {
            None => Ok(()),
            Some(r) if r == self.branch => Ok(()),
            Some(other) => Err(TallyError::invalid_input(format!(
                "unknown ref '{}' (store serves '{}')",
                other, self.branch
            ))),
        }
    }

    fn conflict(
        path: &str,
        expected: Option<&ObjectVersion>,
        actual: Option<&ObjectVersion>,
    ) -> TallyError {
        TallyError::VersionConflict {
            path: path.to_string(),
            expected: ObjectVersion::describe(expected),
            actual: ObjectVersion::describe(actual),
        }
    }

    fn unavailable(op: FaultOp, path: &str) -> TallyError {
        TallyError::upstream(format!("injected outage during {:?} of '{}'", op, path))
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn get(&self, path: &str, reference: Option<&str>) -> TallyResult<Option<StoredObject>> {
        self.counters.gets.fetch_add(1, Ordering::Relaxed);
        self.check_ref(reference)?;
        match self.check_fault(FaultOp::Get, path) {
            Some(Fault::Unavailable) => return Err(Self::unavailable(FaultOp::Get, path)),
            Some(_) | None => {}
        }
        Ok(self.objects.get(path).map(|blob| StoredObject {
            path: path.to_string(),
            content: blob.content.clone(),
            version: blob.version.clone(),
        }))
    }

    fn put(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        expected: Option<&ObjectVersion>,
        branch: &str,
    ) -> TallyResult<ObjectVersion> {
        self.counters.put_attempts.fetch_add(1, Ordering::Relaxed);
        self.check_ref(Some(branch))?;
        if path.is_empty() || path.ends_with('/') {
            return Err(TallyError::invalid_input(format!(
                "'{}' is not a blob path",
                path
            )));
        }

        match self.check_fault(FaultOp::Put, path) {
            Some(Fault::Unavailable) => return Err(Self::unavailable(FaultOp::Put, path)),
            Some(Fault::SpuriousConflict) => {
                let actual = self.objects.get(path).map(|b| b.version.clone());
                return Err(Self::conflict(path, expected, actual.as_ref()));
            }
            Some(Fault::MaterializedConflict) => {
                let version = self.next_version(content);
                self.objects
                    .entry(path.to_string())
                    .or_insert_with(|| Blob {
                        content: content.to_vec(),
                        version: version.clone(),
                    });
                self.counters.writes.fetch_add(1, Ordering::Relaxed);
                return Err(Self::conflict(path, expected, Some(&version)));
            }
            None => {}
        }

        let version = match self.objects.entry(path.to_string()) {
            Entry::Occupied(mut occupied) => match expected {
                Some(v) if occupied.get().version == *v => {
                    let version = self.next_version(content);
                    occupied.insert(Blob {
                        content: content.to_vec(),
                        version: version.clone(),
                    });
                    version
                }
                _ => {
                    return Err(Self::conflict(
                        path,
                        expected,
                        Some(&occupied.get().version),
                    ))
                }
            },
            Entry::Vacant(vacant) => {
                if expected.is_some() {
                    return Err(Self::conflict(path, expected, None));
                }
                let version = self.next_version(content);
                vacant.insert(Blob {
                    content: content.to_vec(),
                    version: version.clone(),
                });
                version
            }
        };

        self.counters.writes.fetch_add(1, Ordering::Relaxed);
        debug!(target: "tally::store", path, %version, message, "Stored blob");
        Ok(version)
    }

    fn delete(
        &self,
        path: &str,
        version: &ObjectVersion,
        message: &str,
        branch: &str,
    ) -> TallyResult<()> {
        self.check_ref(Some(branch))?;
        match self.check_fault(FaultOp::Delete, path) {
            Some(Fault::Unavailable) => return Err(Self::unavailable(FaultOp::Delete, path)),
            Some(_) => {
                let actual = self.objects.get(path).map(|b| b.version.clone());
                return Err(Self::conflict(path, Some(version), actual.as_ref()));
            }
            None => {}
        }

        match self.objects.entry(path.to_string()) {
            Entry::Occupied(occupied) => {
                if occupied.get().version != *version {
                    return Err(Self::conflict(
                        path,
                        Some(version),
                        Some(&occupied.get().version),
                    ));
                }
                occupied.remove();
            }
            Entry::Vacant(_) => return Err(TallyError::not_found(path)),
        }

        self.counters.deletes.fetch_add(1, Ordering::Relaxed);
        debug!(target: "tally::store", path, message, "Deleted blob");
        Ok(())
    }

    fn list_directory(&self, path: &str) -> TallyResult<Vec<DirectoryEntry>> {
        self.counters.listings.fetch_add(1, Ordering::Relaxed);
        if let Some(Fault::Unavailable) = self.check_fault(FaultOp::List, path) {
            return Err(Self::unavailable(FaultOp::List, path));
        }

        let dir = path.trim_matches('/');
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{}/", dir)
        };

        let mut children: BTreeMap<String, EntryKind> = BTreeMap::new();
        for entry in self.objects.iter() {
            let Some(rest) = entry.key().strip_prefix(prefix.as_str()) else {
                continue;
            };
            match rest.split_once('/') {
                Some((child, _)) => {
                    children.insert(child.to_string(), EntryKind::Dir);
                }
                None => {
                    children.entry(rest.to_string()).or_insert(EntryKind::File);
                }
            }
        }

        if children.is_empty() {
            return Err(TallyError::not_found(dir));
        }

        Ok(children
            .into_iter()
            .map(|(name, kind)| DirectoryEntry {
                path: format!("{}{}", prefix, name),
                name,
                kind,
            })
            .collect())
    }

    fn list_tree_recursive(&self, root_ref: &str) -> TallyResult<Vec<String>> {
        self.counters.listings.fetch_add(1, Ordering::Relaxed);
        self.check_ref(Some(root_ref))?;
        if let Some(Fault::Unavailable) = self.check_fault(FaultOp::Tree, root_ref) {
            return Err(Self::unavailable(FaultOp::Tree, root_ref));
        }
        Ok(self.paths())
    }
}
