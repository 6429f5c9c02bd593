//! Identity and outcome types for test executions
//!
//! This module defines:
//! - TestPath: validated hierarchical identity of a test case
//! - RunOutcome: overall result of one execution (pass/fail)
//! - StepResult / StepOutcome: optional per-step detail of an execution

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{TallyError, TallyResult};
use crate::key::DIR_MARKER;

/// Hierarchical, slash-separated identity of a test case
///
/// ## Validation Rules
///
/// - Not empty after trimming
/// - No empty segments (`a//b`, leading or trailing `/`)
/// - Must not contain the directory marker `__`, and no segment may start
///   or end with `_`; either would make the flattened run directory
///   ambiguous
///
/// ## Examples
///
/// Valid: `"auth/login/happy-path"`, `"smoke"`
///
/// Invalid: `""`, `"/auth"`, `"auth//login"`, `"auth/log__in"`, `"auth_/login"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TestPath(String);

impl TestPath {
    /// Validate and wrap a test path
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the path breaks any validation rule.
    pub fn new(path: impl AsRef<str>) -> TallyResult<Self> {
        let path = path.as_ref().trim();
        if path.is_empty() {
            return Err(TallyError::invalid_input("test path cannot be empty"));
        }
        if path.split('/').any(|segment| segment.trim().is_empty()) {
            return Err(TallyError::invalid_input(format!(
                "test path '{}' has an empty segment",
                path
            )));
        }
        if path.contains(DIR_MARKER) {
            return Err(TallyError::invalid_input(format!(
                "test path '{}' contains reserved marker '{}'",
                path, DIR_MARKER
            )));
        }
        if path
            .split('/')
            .any(|segment| segment.starts_with('_') || segment.ends_with('_'))
        {
            return Err(TallyError::invalid_input(format!(
                "test path '{}' has a segment starting or ending with '_'",
                path
            )));
        }
        Ok(TestPath(path.to_string()))
    }

    /// Wrap without validation
    ///
    /// Used when re-deriving a path from a run directory that was itself
    /// produced from a validated path.
    pub fn new_unchecked(path: impl Into<String>) -> Self {
        TestPath(path.into())
    }

    /// Borrow as str
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TestPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Overall result of a test execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    /// The test passed
    Pass,
    /// The test failed
    Fail,
}

impl RunOutcome {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Pass => "pass",
            RunOutcome::Fail => "fail",
        }
    }

    /// Parse a wire name (case-insensitive)
    pub fn parse(s: &str) -> TallyResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pass" => Ok(RunOutcome::Pass),
            "fail" => Ok(RunOutcome::Fail),
            other => Err(TallyError::invalid_input(format!(
                "result must be 'pass' or 'fail', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single step within an execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepResult {
    /// Step passed
    Pass,
    /// Step failed
    Fail,
    /// Step deliberately skipped
    Skip,
    /// Step not filled in
    #[default]
    Unset,
}

/// Per-step outcome recorded alongside a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Step label as authored in the test case
    pub name: String,
    /// Step result
    #[serde(default)]
    pub result: StepResult,
    /// Free-text notes
    #[serde(default)]
    pub notes: String,
}

impl StepOutcome {
    /// Build a step outcome with empty notes
    pub fn new(name: impl Into<String>, result: StepResult) -> Self {
        Self {
            name: name.into(),
            result,
            notes: String::new(),
        }
    }

    /// Attach notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}
