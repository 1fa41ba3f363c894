use std::fmt;

use serde::{Deserialize, Serialize};

/// Sequential identifier assigned to an indexed document.
/// Equal to the document's position in insertion order.
pub type DocId = usize;

/// A single log entry.
///
/// `raw` is an opaque payload (usually a JSON blob). `timestamp_ms` is the
/// only thing the store looks at: it is the sort key applied when a chunk
/// is closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp_ms: i64,
    pub raw: Vec<u8>,
}

impl LogEntry {
    pub fn new(timestamp_ms: i64, raw: impl Into<Vec<u8>>) -> Self {
        LogEntry {
            timestamp_ms,
            raw: raw.into(),
        }
    }
}

/// Identifier of a chunk within one storage root.
///
/// Assigned from a counter owned by the storage instance, strictly
/// increasing, never reused by that instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkId(pub u64);

impl ChunkId {
    /// Stable on-disk file name for this chunk.
    pub fn file_name(self) -> String {
        format!("chunk-{:08}.chunk", self.0)
    }

    /// Inverse of [`ChunkId::file_name`]. Returns None for anything else
    /// found in a storage root (temp files, foreign files).
    pub fn from_file_name(name: &str) -> Option<Self> {
        let digits = name.strip_prefix("chunk-")?.strip_suffix(".chunk")?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(ChunkId)
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chunk-{}", self.0)
    }
}
