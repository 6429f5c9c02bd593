//! Store key layout for run records and latest pointers
//!
//! ## Layout
//!
//! ```text
//! <runs_root>/<flattened test path>/run-<timestampMs>-<suffix>.json
//! <runs_root>/<flattened test path>/latest.json
//! ```
//!
//! The flattened directory replaces every `/` of the test path with the
//! two-character marker `__`. Test paths may not contain the marker, so the
//! transform is reversible and collision-free.
//!
//! Run files order by `(timestamp, suffix)`; the maximum is the latest run.

use rand::Rng;
use std::cmp::Ordering;
use std::fmt;

use crate::types::TestPath;

/// Replaces the path separator in run directory names
pub const DIR_MARKER: &str = "__";

/// Fixed filename of the per-test latest pointer
pub const LATEST_FILE: &str = "latest.json";

/// Prefix of every run filename
pub const RUN_FILE_PREFIX: &str = "run-";

/// Extension of every run filename
pub const RUN_FILE_EXT: &str = ".json";

/// Suffix length for freshly generated keys
pub const SUFFIX_LEN: usize = 6;

/// Suffix length used when a key is regenerated after an anomalous conflict
pub const EXTENDED_SUFFIX_LEN: usize = 12;

const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Maps test paths onto store paths under a runs root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    runs_root: String,
}

impl RunLayout {
    /// Layout rooted at `runs_root` (surrounding slashes are ignored)
    pub fn new(runs_root: impl AsRef<str>) -> Self {
        Self {
            runs_root: runs_root.as_ref().trim_matches('/').to_string(),
        }
    }

    /// Root directory holding every run directory
    pub fn runs_root(&self) -> &str {
        &self.runs_root
    }

    /// Flattened directory name for a test path (no root)
    pub fn directory_name(test_path: &TestPath) -> String {
        test_path.as_str().replace('/', DIR_MARKER)
    }

    /// Recover the test path from a flattened directory name
    pub fn test_path_for(directory_name: &str) -> TestPath {
        TestPath::new_unchecked(directory_name.replace(DIR_MARKER, "/"))
    }

    /// Full store path of a test's run directory
    pub fn directory(&self, test_path: &TestPath) -> String {
        self.join(&Self::directory_name(test_path))
    }

    /// Full store path of one run file
    pub fn run_path(&self, test_path: &TestPath, run_file: &RunFileName) -> String {
        format!("{}/{}", self.directory(test_path), run_file)
    }

    /// Full store path of a test's latest pointer
    pub fn pointer_path(&self, test_path: &TestPath) -> String {
        format!("{}/{}", self.directory(test_path), LATEST_FILE)
    }

    /// Split a full blob path into `(test path, file name)` if it lies
    /// directly inside a run directory of this layout
    pub fn classify(&self, blob_path: &str) -> Option<(TestPath, String)> {
        let rest = if self.runs_root.is_empty() {
            blob_path
        } else {
            blob_path
                .strip_prefix(self.runs_root.as_str())?
                .strip_prefix('/')?
        };
        let (dir, file) = rest.split_once('/')?;
        if dir.is_empty() || file.is_empty() || file.contains('/') {
            return None;
        }
        Some((Self::test_path_for(dir), file.to_string()))
    }

    fn join(&self, name: &str) -> String {
        if self.runs_root.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.runs_root, name)
        }
    }
}

/// Parsed `run-<timestampMs>-<suffix>.json` filename
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunFileName {
    timestamp_ms: i64,
    suffix: String,
}

impl RunFileName {
    /// Build from parts
    pub fn new(timestamp_ms: i64, suffix: impl Into<String>) -> Self {
        Self {
            timestamp_ms,
            suffix: suffix.into(),
        }
    }

    /// Fresh name at `timestamp_ms` with a random suffix of `suffix_len`
    pub fn generate(timestamp_ms: i64, suffix_len: usize) -> Self {
        Self::new(timestamp_ms, random_suffix(suffix_len))
    }

    /// Parse a filename; `None` for anything that is not a run file
    pub fn parse(name: &str) -> Option<Self> {
        let body = name
            .strip_prefix(RUN_FILE_PREFIX)?
            .strip_suffix(RUN_FILE_EXT)?;
        let (ts, suffix) = body.split_once('-')?;
        if ts.is_empty() || !ts.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return None;
        }
        let timestamp_ms = ts.parse().ok()?;
        Some(Self::new(timestamp_ms, suffix))
    }

    /// Millisecond timestamp encoded in the name
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    /// Random suffix
    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

impl Ord for RunFileName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp_ms
            .cmp(&other.timestamp_ms)
            .then_with(|| self.suffix.cmp(&other.suffix))
    }
}

impl PartialOrd for RunFileName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RunFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}-{}{}",
            RUN_FILE_PREFIX, self.timestamp_ms, self.suffix, RUN_FILE_EXT
        )
    }
}

/// Lowercase base-36 string of `len` random characters
pub fn random_suffix(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect()
}
