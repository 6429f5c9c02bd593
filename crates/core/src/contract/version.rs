//! Object version tokens
//!
//! Every blob in the object store carries an opaque version token (the
//! hosting platform hands out content hashes). Writers pass the token they
//! last observed; the store rejects the write when the stored token differs.
//!
//! Tokens are compared for equality only. There is no ordering between two
//! versions of the same path, and none across paths.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque version token of a stored object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectVersion(String);

impl ObjectVersion {
    /// Wrap a raw token
    pub fn new(token: impl Into<String>) -> Self {
        ObjectVersion(token.into())
    }

    /// Raw token
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render an optional version for diagnostics (`none` when absent)
    pub fn describe(version: Option<&ObjectVersion>) -> String {
        match version {
            Some(v) => v.0.clone(),
            None => "none".to_string(),
        }
    }
}

impl fmt::Display for ObjectVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectVersion {
    fn from(s: &str) -> Self {
        ObjectVersion(s.to_string())
    }
}
