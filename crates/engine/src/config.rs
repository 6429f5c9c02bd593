//! Ledger configuration via `tally.toml`
//!
//! On first start a default `tally.toml` can be written next to the
//! dashboard's data. To change settings, edit the file and restart.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tally_concurrency::RetryConfig;
use tally_core::{RunLayout, TallyError, TallyResult};

/// Config file name
pub const CONFIG_FILE_NAME: &str = "tally.toml";

/// Ledger configuration loaded from `tally.toml`.
///
/// # Example
///
/// ```toml
/// branch = "main"
/// runs_root = "runs"
/// default_executor = "unknown"
/// cache_ttl_secs = 60
///
/// [retry]
/// max_attempts = 5
/// base_delay_ms = 100
/// max_delay_ms = 1000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TallyConfig {
    /// Branch every read and write targets
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Directory holding one sub-directory of runs per test
    #[serde(default = "default_runs_root")]
    pub runs_root: String,
    /// Executor recorded when a request names none
    #[serde(default = "default_executor")]
    pub default_executor: String,
    /// Lifetime of cached traceability matrices in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Conflict retry policy
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_runs_root() -> String {
    "runs".to_string()
}

fn default_executor() -> String {
    "unknown".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    60
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            branch: default_branch(),
            runs_root: default_runs_root(),
            default_executor: default_executor(),
            cache_ttl_secs: default_cache_ttl_secs(),
            retry: RetryConfig::default(),
        }
    }
}

impl TallyConfig {
    /// Key layout derived from `runs_root`
    pub fn layout(&self) -> RunLayout {
        RunLayout::new(&self.runs_root)
    }

    /// Matrix cache lifetime
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Check every field
    ///
    /// # Errors
    ///
    /// Returns `Config` for an empty branch or runs root, or an unusable
    /// retry section.
    pub fn validate(&self) -> TallyResult<()> {
        if self.branch.trim().is_empty() {
            return Err(TallyError::config("branch cannot be empty"));
        }
        if self.runs_root.trim_matches('/').trim().is_empty() {
            return Err(TallyError::config("runs_root cannot be empty"));
        }
        self.retry.validate()
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Tally ledger configuration
#
# Branch of the content repository that holds runs
branch = "main"

# Directory holding one sub-directory of run records per test
runs_root = "runs"

# Recorded as executed_by when a submission names no executor
default_executor = "unknown"

# Seconds a built traceability matrix is served from cache
cache_ttl_secs = 60

# Conflict retry policy for run appends
[retry]
max_attempts = 5      # total put attempts
base_delay_ms = 100   # first backoff, doubles each retry
max_delay_ms = 1000   # backoff cap
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> TallyResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TallyError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: TallyConfig = toml::from_str(&content).map_err(|e| {
            TallyError::config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> TallyResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                TallyError::config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> TallyResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TallyError::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            TallyError::config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
