//! Traceability aggregator
//!
//! Joins stories, test cases, defects and latest run results into one
//! matrix entry per story, and reports the gaps between them:
//!
//! - stories no test resolves to
//! - tests whose story reference resolves to nothing (or is missing)
//! - defects linked to neither a story nor a test
//!
//! A test is listed under every story its reference names, so the result
//! does not depend on story order. Summary totals count each test once.
//!
//! [`build_matrix`] is a pure function of its inputs; only `fetched_at` is
//! supplied by the caller.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tally_core::{Defect, IssueState, LatestLookup, LatestPointer, RunOutcome, Story, TestCase};
use tracing::debug;

use crate::resolver::StoryIndex;

/// One test under a story, with its latest result and linked defects
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestStatus {
    /// Test path
    pub path: String,
    /// Story reference as authored
    pub story_ref: Option<String>,
    /// Latest run, if any
    pub latest: Option<LatestPointer>,
    /// Defects whose test-path link equals this path
    pub defects: Vec<u64>,
}

impl TestStatus {
    /// Latest result, `None` when the test never ran
    pub fn result(&self) -> Option<RunOutcome> {
        self.latest.as_ref().map(|p| p.result)
    }
}

/// Matrix row for one story
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixEntry {
    /// Issue number
    pub story_number: u64,
    /// Issue title
    pub title: String,
    /// Canonical custom ID
    pub custom_id: Option<String>,
    /// Open/closed
    pub state: IssueState,
    /// Tests resolving to this story, in input order
    pub tests: Vec<TestStatus>,
    /// Number of tests
    pub test_count: usize,
    /// Tests whose latest run passed
    pub pass: usize,
    /// Tests whose latest run failed
    pub fail: usize,
    /// Tests with no run
    pub no_run: usize,
    /// `pass / test_count` as a percentage, one decimal
    pub coverage_percent: f64,
    /// Defects whose story reference resolves to this story
    pub defects: Vec<u64>,
    /// Open defects linked to the story or to one of its tests
    pub open_defects: usize,
}

/// Disconnected entities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Gaps {
    /// Stories with no matched test
    pub stories_without_tests: Vec<u64>,
    /// Tests whose reference resolves to no story
    pub orphan_tests: Vec<String>,
    /// Defects with neither a story nor a test link
    pub unlinked_defects: Vec<u64>,
}

/// Totals across the whole matrix
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatrixSummary {
    /// Stories in the matrix
    pub stories: usize,
    /// Test cases supplied
    pub tests: usize,
    /// Tests matched to at least one story
    pub matched_tests: usize,
    /// Matched tests that passed
    pub pass: usize,
    /// Matched tests that failed
    pub fail: usize,
    /// Matched tests with no run
    pub no_run: usize,
    /// Coverage across matched tests
    pub coverage_percent: f64,
}

/// Traceability matrix
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Matrix {
    /// One entry per story, in input order
    pub entries: Vec<MatrixEntry>,
    /// Gap report
    pub gaps: Gaps,
    /// Totals
    pub summary: MatrixSummary,
    /// When the inputs were read
    pub fetched_at: DateTime<Utc>,
}

impl Matrix {
    /// Entry for an issue number
    pub fn entry(&self, story_number: u64) -> Option<&MatrixEntry> {
        self.entries.iter().find(|e| e.story_number == story_number)
    }
}

/// `pass / total * 100` rounded to one decimal, 0 for no tests
pub fn coverage_percent(pass: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = pass as f64 / total as f64 * 100.0;
    (raw * 10.0).round() / 10.0
}

/// Build the matrix
pub fn build_matrix(
    stories: &[Story],
    tests: &[TestCase],
    defects: &[Defect],
    latest: &LatestLookup,
    fetched_at: DateTime<Utc>,
) -> Matrix {
    let index = StoryIndex::new(stories);

    let mut tests_by_story: Vec<Vec<&TestCase>> = vec![Vec::new(); stories.len()];
    let mut gaps = Gaps::default();
    let mut matched_tests: Vec<&TestCase> = Vec::new();
    for test in tests {
        let positions = test
            .story_ref
            .as_deref()
            .map(|r| index.matching(r))
            .unwrap_or_default();
        if positions.is_empty() {
            gaps.orphan_tests.push(test.path.clone());
            continue;
        }
        for position in positions {
            tests_by_story[position].push(test);
        }
        matched_tests.push(test);
    }

    let mut defects_by_story: Vec<Vec<&Defect>> = vec![Vec::new(); stories.len()];
    for defect in defects {
        if defect.is_unlinked() {
            gaps.unlinked_defects.push(defect.number);
            continue;
        }
        if let Some(reference) = defect.story_ref.as_deref() {
            for position in index.matching(reference) {
                defects_by_story[position].push(defect);
            }
        }
    }

    let mut summary = MatrixSummary {
        stories: stories.len(),
        tests: tests.len(),
        matched_tests: matched_tests.len(),
        ..Default::default()
    };
    for test in &matched_tests {
        match latest.result_for(&test.path) {
            Some(RunOutcome::Pass) => summary.pass += 1,
            Some(RunOutcome::Fail) => summary.fail += 1,
            None => summary.no_run += 1,
        }
    }

    let mut entries = Vec::with_capacity(stories.len());
    for (position, story) in stories.iter().enumerate() {
        let matched = &tests_by_story[position];
        let story_defects = &defects_by_story[position];

        let mut open: BTreeSet<u64> = story_defects
            .iter()
            .filter(|d| d.state.is_open())
            .map(|d| d.number)
            .collect();

        let mut statuses = Vec::with_capacity(matched.len());
        let (mut pass, mut fail, mut no_run) = (0, 0, 0);
        for test in matched {
            let linked: Vec<&Defect> = defects
                .iter()
                .filter(|d| d.test_path.as_deref().map(str::trim) == Some(test.path.as_str()))
                .collect();
            open.extend(linked.iter().filter(|d| d.state.is_open()).map(|d| d.number));

            let pointer = latest.get(&test.path).cloned();
            match pointer.as_ref().map(|p| p.result) {
                Some(RunOutcome::Pass) => pass += 1,
                Some(RunOutcome::Fail) => fail += 1,
                None => no_run += 1,
            }
            statuses.push(TestStatus {
                path: test.path.clone(),
                story_ref: test.story_ref.clone(),
                latest: pointer,
                defects: linked.iter().map(|d| d.number).collect(),
            });
        }

        if matched.is_empty() {
            gaps.stories_without_tests.push(story.number);
        }

        entries.push(MatrixEntry {
            story_number: story.number,
            title: story.title.clone(),
            custom_id: index
                .keys(position)
                .and_then(|k| k.custom_id().map(str::to_string)),
            state: story.state,
            test_count: matched.len(),
            pass,
            fail,
            no_run,
            coverage_percent: coverage_percent(pass, matched.len()),
            tests: statuses,
            defects: story_defects.iter().map(|d| d.number).collect(),
            open_defects: open.len(),
        });
    }
    summary.coverage_percent = coverage_percent(summary.pass, summary.matched_tests);

    debug!(
        target: "tally::trace",
        stories = summary.stories,
        tests = summary.tests,
        orphans = gaps.orphan_tests.len(),
        uncovered = gaps.stories_without_tests.len(),
        "Built traceability matrix"
    );

    Matrix {
        entries,
        gaps,
        summary,
        fetched_at,
    }
}
