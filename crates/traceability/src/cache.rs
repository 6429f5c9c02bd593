//! Matrix caching
//!
//! Built matrices are kept for a fixed time-to-live behind the [`Cache`]
//! trait. Expiry is measured with an injected [`Clock`] so tests can move
//! time by hand. Keys are xxh3 fingerprints of the story and test inputs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tally_core::{Clock, Story, TallyResult, TestCase};
use xxhash_rust::xxh3::Xxh3;

/// Keyed store with per-entry expiry
pub trait Cache<V>: Send + Sync {
    /// Live value for `key`
    fn get(&self, key: &str) -> Option<V>;

    /// Store `value` for `ttl`
    fn insert(&self, key: String, value: V, ttl: Duration);

    /// Drop one key
    fn invalidate(&self, key: &str);

    /// Drop everything
    fn clear(&self);
}

struct Slot<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

/// In-process [`Cache`] with clock-driven expiry
pub struct TtlCache<V> {
    slots: RwLock<HashMap<String, Slot<V>>>,
    clock: Arc<dyn Clock>,
}

impl<V> TtlCache<V> {
    /// Empty cache reading time from `clock`
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Entries held, expired ones included
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// True when nothing is held
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    /// Drop expired entries
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut slots = self.slots.write();
        let before = slots.len();
        slots.retain(|_, slot| slot.expires_at > now);
        before - slots.len()
    }
}

impl<V: Clone + Send + Sync> Cache<V> for TtlCache<V> {
    fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let slots = self.slots.read();
        slots
            .get(key)
            .filter(|slot| slot.expires_at > now)
            .map(|slot| slot.value.clone())
    }

    fn insert(&self, key: String, value: V, ttl: Duration) {
        let now = self.clock.now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.slots
            .write()
            .insert(key, Slot { value, expires_at });
    }

    fn invalidate(&self, key: &str) {
        self.slots.write().remove(key);
    }

    fn clear(&self) {
        self.slots.write().clear();
    }
}

/// Cache key for a set of matrix inputs
///
/// Hashes the serialized stories and tests. Defects and run results are not
/// part of the key; they are picked up when the entry expires.
pub fn fingerprint(stories: &[Story], tests: &[TestCase]) -> TallyResult<String> {
    let mut hasher = Xxh3::new();
    feed(&mut hasher, stories)?;
    feed(&mut hasher, tests)?;
    Ok(format!("{:016x}", hasher.digest()))
}

fn feed<T: Serialize + ?Sized>(hasher: &mut Xxh3, value: &T) -> TallyResult<()> {
    let bytes = serde_json::to_vec(value)?;
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(&bytes);
    Ok(())
}
