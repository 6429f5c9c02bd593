//! Platform issues and the link fields parsed out of them
//!
//! Stories and defects arrive as raw issues. Links live in the issue body
//! as header fields, written any of these ways:
//!
//! ```text
//! Story: MS-005
//! **Story:** MS-005
//! **Story**: MS-005
//! ### Story
//! MS-005
//! ```
//!
//! Field names match case-insensitively. The first matching field wins.

use serde::{Deserialize, Serialize};
use tally_core::{Defect, IssueState, Story};

/// Body fields that carry a story custom ID
pub const STORY_ID_FIELDS: &[&str] = &["Story ID", "Story", "ID", "Custom ID"];

/// Body fields a defect uses to name its story
pub const DEFECT_STORY_FIELDS: &[&str] = &["Story", "Story ID", "Related story", "User story"];

/// Body fields a defect uses to name its test
pub const DEFECT_TEST_FIELDS: &[&str] = &["Test path", "Test", "Test case"];

/// An issue as the hosting platform returns it
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Issue {
    /// Issue number
    pub number: u64,
    /// Title
    pub title: String,
    /// Markdown body
    #[serde(default)]
    pub body: Option<String>,
    /// Label names
    #[serde(default)]
    pub labels: Vec<String>,
    /// Assignee logins
    #[serde(default)]
    pub assignees: Vec<String>,
    /// Milestone title
    #[serde(default)]
    pub milestone: Option<String>,
    /// Open/closed
    #[serde(default)]
    pub state: IssueState,
}

impl Issue {
    /// Issue with a title and body
    pub fn new(number: u64, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
            body: Some(body.into()),
            ..Default::default()
        }
    }

    fn body_text(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }
}

impl From<Issue> for Story {
    fn from(issue: Issue) -> Self {
        Story {
            number: issue.number,
            body: issue.body.unwrap_or_default(),
            title: issue.title,
            labels: issue.labels,
            assignees: issue.assignees,
            milestone: issue.milestone,
            state: issue.state,
        }
    }
}

impl From<Issue> for Defect {
    fn from(issue: Issue) -> Self {
        let story_ref = header_field(issue.body_text(), DEFECT_STORY_FIELDS);
        let test_path = header_field(issue.body_text(), DEFECT_TEST_FIELDS)
            .map(|value| value.trim_matches('`').to_string());
        Defect {
            number: issue.number,
            title: issue.title,
            state: issue.state,
            labels: issue.labels,
            story_ref,
            test_path,
        }
    }
}

/// Value of the first header field in `body` whose name is one of `names`
///
/// Issue-form sections (`### Name`) take their value from the next
/// non-empty line. Form placeholders such as `_No response_` count as empty.
pub fn header_field(body: &str, names: &[&str]) -> Option<String> {
    header_fields(body, names).into_iter().next()
}

/// Every non-empty value of the named fields, in body order
pub fn header_fields(body: &str, names: &[&str]) -> Vec<String> {
    let mut values = Vec::new();
    let mut lines = body.lines().map(str::trim);
    while let Some(line) = lines.next() {
        if let Some(heading) = line.strip_prefix("###") {
            let heading = heading.trim().trim_end_matches(':');
            if is_field(heading, names) {
                let value = lines.by_ref().find(|l| !l.is_empty()).unwrap_or("");
                values.extend(clean_value(value));
            }
            continue;
        }

        if let Some((name, value)) = split_field(line) {
            if is_field(name, names) {
                values.extend(clean_value(value));
            }
        }
    }
    values
}

/// `Name: value`, `**Name:** value` or `**Name**: value`
fn split_field(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_start_matches(['-', '*', ' '].as_slice());
    let (name, value) = line.split_once(':')?;
    let name = name.trim().trim_end_matches('*').trim();
    let value = value.trim().trim_start_matches('*').trim();
    Some((name, value))
}

fn is_field(name: &str, names: &[&str]) -> bool {
    names.iter().any(|n| n.eq_ignore_ascii_case(name.trim()))
}

fn clean_value(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("_no response_") {
        None
    } else {
        Some(value.to_string())
    }
}
