//! Ledger Comprehensive Test Suite
//!
//! End-to-end tests through the `tally` facade over the in-memory store.
//!
//! ## Test Structure
//!
//! - **recorder**: idempotence, key layout, payload shape
//! - **conflicts**: verify, regenerate and backoff behaviour
//! - **latest_index**: pointer fallback and rebuild-on-delete
//! - **batch**: per-item isolation
//! - **traceability**: resolution, coverage, gaps, caching
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test ledger_comprehensive
//! ```

mod test_utils;

mod batch_tests;
mod conflict_tests;
mod latest_index_tests;
mod recorder_tests;
mod traceability_tests;
