//! Read-only inputs owned by the authoring layer
//!
//! Test cases, stories and defects are created and edited elsewhere. The
//! core only reads them to build the traceability matrix.

use serde::{Deserialize, Serialize};

/// Open/closed state of a platform issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    /// Issue is open
    #[default]
    Open,
    /// Issue is closed
    Closed,
}

impl IssueState {
    /// True for `Open`
    pub fn is_open(&self) -> bool {
        matches!(self, IssueState::Open)
    }
}

/// A test case as authored
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TestCase {
    /// Hierarchical, slash-separated identity
    pub path: String,
    /// Free-text story reference (issue number, `#N`, custom ID, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_ref: Option<String>,
    /// Suite name
    #[serde(default)]
    pub suite: String,
    /// Priority label
    #[serde(default)]
    pub priority: String,
    /// Assignee login
    #[serde(default)]
    pub assigned_to: String,
    /// Authoring status (draft, ready, ...)
    #[serde(default)]
    pub status: String,
}

impl TestCase {
    /// Test case at `path` referencing `story_ref`
    pub fn new(path: impl Into<String>, story_ref: Option<&str>) -> Self {
        Self {
            path: path.into(),
            story_ref: story_ref.map(str::to_string),
            ..Default::default()
        }
    }
}

/// A story issue
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Story {
    /// Platform issue number
    pub number: u64,
    /// Issue title
    pub title: String,
    /// Issue body (markdown)
    #[serde(default)]
    pub body: String,
    /// Label names
    #[serde(default)]
    pub labels: Vec<String>,
    /// Assignee logins
    #[serde(default)]
    pub assignees: Vec<String>,
    /// Milestone title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone: Option<String>,
    /// Open/closed
    #[serde(default)]
    pub state: IssueState,
}

impl Story {
    /// Open story with the given number and title
    pub fn new(number: u64, title: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
            ..Default::default()
        }
    }

    /// Replace the body
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }
}

/// A defect issue with its parsed links
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Defect {
    /// Platform issue number
    pub number: u64,
    /// Issue title
    #[serde(default)]
    pub title: String,
    /// Open/closed
    #[serde(default)]
    pub state: IssueState,
    /// Label names
    #[serde(default)]
    pub labels: Vec<String>,
    /// Free-text story reference parsed from the issue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_ref: Option<String>,
    /// Exact test path parsed from the issue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_path: Option<String>,
}

impl Defect {
    /// Open defect with no links
    pub fn new(number: u64, title: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
            ..Default::default()
        }
    }

    /// Link to a story reference
    pub fn with_story_ref(mut self, story_ref: impl Into<String>) -> Self {
        self.story_ref = Some(story_ref.into());
        self
    }

    /// Link to an exact test path
    pub fn with_test_path(mut self, test_path: impl Into<String>) -> Self {
        self.test_path = Some(test_path.into());
        self
    }

    /// True when the defect carries neither kind of link
    pub fn is_unlinked(&self) -> bool {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        blank(&self.story_ref) && blank(&self.test_path)
    }
}
