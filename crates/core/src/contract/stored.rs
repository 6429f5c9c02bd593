//! Shapes returned by the object store

use serde::{Deserialize, Serialize};

use super::version::ObjectVersion;

/// A blob read from the store together with its version token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Full store path
    pub path: String,
    /// Raw bytes
    pub content: Vec<u8>,
    /// Version token to pass back on conditional writes
    pub version: ObjectVersion,
}

impl StoredObject {
    /// Whether the blob carries any bytes
    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }
}

/// Kind of a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A blob
    File,
    /// A sub-directory
    Dir,
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Last path segment
    pub name: String,
    /// Full store path
    pub path: String,
    /// File or directory
    pub kind: EntryKind,
}

impl DirectoryEntry {
    /// True for blobs
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}
