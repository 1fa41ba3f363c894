use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::storage::decode_chunk;
use crate::types::LogEntry;

/// Reads a closed chunk file back into memory.
///
/// Chunk files are written whole, so there is no partial-record recovery
/// here: the file either decodes completely or the read fails with a
/// deserialization error.
pub struct ChunkReader {
    entries: Vec<LogEntry>,
}

impl ChunkReader {
    /// Load and decode the chunk file at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        Ok(ChunkReader {
            entries: decode_chunk(&data)?,
        })
    }

    /// Entries in timestamp order.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }
}
