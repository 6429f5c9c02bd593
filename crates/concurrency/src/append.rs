//! Append-only log over a versioned object store
//!
//! Every append creates a brand-new blob; nothing is ever updated in place.
//! The only contention is two writers landing on the same key, or the store
//! reporting a conflict for a create that never happened.
//!
//! ## Conflict Protocol
//!
//! On `VersionConflict` for the current key:
//!
//! 1. **Verify**: read the key. If it now holds content, a concurrent writer
//!    created it and the append is complete.
//! 2. **Regenerate** (once): if the key is still absent the conflict was an
//!    anomaly. Ask the generator for a key with extra entropy and retry
//!    immediately.
//! 3. **Back off**: later conflicts retry the current key after an
//!    exponential delay from [`RetryConfig`].
//!
//! After `max_attempts` puts the append fails with `RetriesExhausted`.
//! Errors other than conflicts abort on the spot.

use std::sync::Arc;

use tally_core::{ObjectStore, ObjectVersion, TallyError, TallyResult};
use tracing::{debug, warn};

use crate::retry::RetryConfig;

/// What kind of key the generator is asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRequest {
    /// First key of an append
    Fresh,
    /// Replacement after an anomalous conflict; should carry more randomness
    Regenerated,
}

/// How an append completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendStatus {
    /// This caller's put stored the blob
    Written,
    /// The key already held content after a conflict; no write was needed
    AlreadyPresent,
}

/// Result of a successful append
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appended {
    /// Store path the payload lives at
    pub path: String,
    /// Version token of the blob
    pub version: ObjectVersion,
    /// How the append completed
    pub status: AppendStatus,
    /// Number of put attempts made
    pub attempts: u32,
    /// Whether the key was regenerated
    pub regenerated: bool,
}

/// Append-only blob log with optimistic conflict handling
#[derive(Clone)]
pub struct AppendOnlyLog {
    store: Arc<dyn ObjectStore>,
    branch: String,
    retry: RetryConfig,
}

impl AppendOnlyLog {
    /// Log writing to `branch` of `store`
    pub fn new(store: Arc<dyn ObjectStore>, branch: impl Into<String>, retry: RetryConfig) -> Self {
        Self {
            store,
            branch: branch.into(),
            retry,
        }
    }

    /// Branch appends go to
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Retry policy in force
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Append `payload` under a key produced by `key_generator`
    ///
    /// The generator is called once with [`KeyRequest::Fresh`] and at most
    /// once more with [`KeyRequest::Regenerated`].
    ///
    /// # Errors
    ///
    /// - `RetriesExhausted` when every attempt conflicted
    /// - any non-conflict store error, unchanged
    pub fn append<G>(&self, mut key_generator: G, payload: &[u8], message: &str) -> TallyResult<Appended>
    where
        G: FnMut(KeyRequest) -> String,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut path = key_generator(KeyRequest::Fresh);
        let mut regenerated = false;
        let mut backoffs = 0u32;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self.store.put(&path, payload, message, None, &self.branch) {
                Ok(version) => {
                    debug!(target: "tally::ledger", path = %path, attempt, "Appended");
                    return Ok(Appended {
                        path,
                        version,
                        status: AppendStatus::Written,
                        attempts: attempt,
                        regenerated,
                    });
                }
                Err(e) if e.is_conflict() => {
                    warn!(target: "tally::ledger", path = %path, attempt, error = %e, "Append conflict");

                    if let Some(existing) = self.store.get(&path, Some(self.branch.as_str()))? {
                        if existing.has_content() {
                            debug!(target: "tally::ledger", path = %path, "Key already written by a concurrent writer");
                            return Ok(Appended {
                                path,
                                version: existing.version,
                                status: AppendStatus::AlreadyPresent,
                                attempts: attempt,
                                regenerated,
                            });
                        }
                    }

                    if attempt >= max_attempts {
                        return Err(TallyError::RetriesExhausted {
                            path,
                            attempts: attempt,
                        });
                    }

                    if !regenerated {
                        path = key_generator(KeyRequest::Regenerated);
                        regenerated = true;
                        continue;
                    }

                    std::thread::sleep(self.retry.calculate_delay(backoffs));
                    backoffs += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
