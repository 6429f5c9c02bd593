//! Testing utilities for the object store
//!
//! - **Faults**: rule-based injection of conflicts and outages into
//!   [`InMemoryObjectStore`](crate::InMemoryObjectStore) calls
//!
//! # Example
//!
//! ```ignore
//! use tally_storage::testing::{Fault, FaultOp, FaultRule};
//!
//! let store = InMemoryObjectStore::new();
//! store.inject(FaultRule::new(FaultOp::Put, Fault::Unavailable).after(1));
//! ```

mod faults;

pub use faults::{Fault, FaultOp, FaultPlan, FaultRule};
