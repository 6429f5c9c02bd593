//! Cached matrix builds

use std::sync::Arc;
use std::time::Duration;

use tally_core::{Clock, Defect, LatestLookup, Story, TallyResult, TestCase};
use tracing::debug;

use crate::cache::{fingerprint, Cache, TtlCache};
use crate::matrix::{build_matrix, Matrix};

/// Default lifetime of a cached matrix
pub const DEFAULT_MATRIX_TTL: Duration = Duration::from_secs(60);

/// Builds matrices and serves repeats from a [`Cache`]
#[derive(Clone)]
pub struct MatrixService {
    cache: Arc<dyn Cache<Arc<Matrix>>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl MatrixService {
    /// Service over an explicit cache
    pub fn new(cache: Arc<dyn Cache<Arc<Matrix>>>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { cache, clock, ttl }
    }

    /// Service with an in-process [`TtlCache`]
    pub fn with_ttl(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        let cache: Arc<dyn Cache<Arc<Matrix>>> = Arc::new(TtlCache::new(clock.clone()));
        Self::new(cache, clock, ttl)
    }

    /// Cache lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Matrix for the inputs, cached under a fingerprint of stories and tests
    ///
    /// `latest` is only called when the matrix has to be built. With
    /// `force_refresh` the cache is skipped and the new matrix replaces any
    /// cached one.
    ///
    /// # Errors
    ///
    /// Whatever `latest` returns, or a serialization failure while
    /// fingerprinting.
    pub fn matrix<F>(
        &self,
        stories: &[Story],
        tests: &[TestCase],
        defects: &[Defect],
        latest: F,
        force_refresh: bool,
    ) -> TallyResult<Arc<Matrix>>
    where
        F: FnOnce() -> TallyResult<LatestLookup>,
    {
        let key = fingerprint(stories, tests)?;
        if !force_refresh {
            if let Some(hit) = self.cache.get(&key) {
                debug!(target: "tally::trace", key = %key, "Matrix cache hit");
                return Ok(hit);
            }
        }

        let lookup = latest()?;
        let matrix = Arc::new(build_matrix(
            stories,
            tests,
            defects,
            &lookup,
            self.clock.now(),
        ));
        self.cache.insert(key.clone(), matrix.clone(), self.ttl);
        debug!(target: "tally::trace", key = %key, force_refresh, "Matrix built and cached");
        Ok(matrix)
    }

    /// Drop every cached matrix
    pub fn invalidate_all(&self) {
        self.cache.clear();
    }
}
