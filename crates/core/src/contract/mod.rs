//! Contract types shared by every store implementation
//!
//! - `version`: opaque version tokens used for optimistic concurrency
//! - `stored`: blobs and directory entries as returned by the store

pub mod stored;
pub mod version;

// Re-exports
pub use stored::{DirectoryEntry, EntryKind, StoredObject};
pub use version::ObjectVersion;
