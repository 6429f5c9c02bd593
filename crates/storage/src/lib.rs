//! Storage layer for Tally
//!
//! This crate provides the object store implementation the ledger runs on
//! in tests and embedded use:
//! - InMemoryObjectStore: DashMap-backed versioned blob store
//! - StoreStats: traffic counters for asserting write behaviour
//! - testing: fault injection (spurious conflicts, concurrent-writer
//!   conflicts, outages)
//!
//! A client for the hosting platform's content API implements the same
//! `tally_core::ObjectStore` trait outside this workspace.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;
pub mod testing;

pub use memory::{InMemoryObjectStore, StoreStats, DEFAULT_BRANCH};
