//! Traceability for Tally
//!
//! Joins stories, test cases and defects into a coverage matrix:
//! - resolver: canonical story keys and reference resolution
//! - issue: link fields parsed from platform issues
//! - matrix: the aggregator and its output types
//! - cache / service: TTL-cached matrix builds

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod issue;
pub mod matrix;
pub mod resolver;
pub mod service;

pub use cache::{fingerprint, Cache, TtlCache};
pub use issue::{header_field, header_fields, Issue};
pub use matrix::{
    build_matrix, coverage_percent, Gaps, Matrix, MatrixEntry, MatrixSummary, TestStatus,
};
pub use resolver::{canonicalize, extract_custom_id, parse_custom_id, StoryIndex, StoryKeys};
pub use service::{MatrixService, DEFAULT_MATRIX_TTL};
