//! Execution ledger for Tally
//!
//! This crate records and reads test runs on top of an object store:
//! - RunRecorder: append one immutable run record per execution
//! - LatestIndex: read and repair per-test latest pointers
//! - BatchSubmitter: sequential submission with per-item isolation
//! - Ledger: facade wiring the above from a `TallyConfig`
//!
//! Writes only ever create new run files. The latest pointer is a hint that
//! readers verify by scanning when it is missing or broken.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod config;
pub mod index;
pub mod ledger;
pub mod recorder;

pub use batch::{BatchReport, BatchSubmitter, ItemReport, ItemStatus};
pub use config::{TallyConfig, CONFIG_FILE_NAME};
pub use index::{LatestIndex, RebuildOutcome, RunScan};
pub use ledger::Ledger;
pub use recorder::{RecordOutcome, RunRecorder, RunRef, RunRequest};
