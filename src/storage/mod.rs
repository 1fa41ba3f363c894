pub mod disk;
pub mod mem;
pub mod reader;
pub mod writer;

pub use disk::{DiskChunk, DiskStorage};
pub use mem::{ClosedChunk, MemChunk, MemStorage};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::record::{Record, RecordKind};
use crate::types::{ChunkId, LogEntry};

/// A sequence of log entries: buffered while open, frozen once closed.
///
/// Durability: entries are only in memory until [`LogChunk::close`]
/// succeeds. A crash loses exactly the entries of chunks that are still
/// open, and nothing else; the appender's watermark bounds that loss.
pub trait LogChunk {
    /// Identifier assigned by the storage that allocated this chunk.
    fn id(&self) -> ChunkId;

    /// Buffer a single entry. Fails with `AlreadyClosed` once closed.
    fn append(&mut self, entry: LogEntry) -> Result<()>;

    /// Number of entries in the chunk.
    fn size(&self) -> usize;

    fn is_closed(&self) -> bool;

    /// Sort entries by timestamp and persist them as one immutable record.
    ///
    /// A second call fails with `AlreadyClosed` and does no I/O. If
    /// persisting fails the chunk stays open with every entry still
    /// buffered, so close can be retried.
    fn close(&mut self) -> Result<()>;
}

/// A single machine's interface to a stream of chunks.
pub trait Storage {
    type Chunk: LogChunk;

    /// Allocate a new empty chunk with the next id.
    fn create_chunk(&mut self) -> Result<Self::Chunk>;
}

/// Two-phase chunk lifecycle shared by every storage backend.
#[derive(Debug)]
pub(crate) enum ChunkState {
    Open { entries: Vec<LogEntry> },
    Closed { len: usize },
}

impl ChunkState {
    pub(crate) fn new() -> Self {
        ChunkState::Open {
            entries: Vec::new(),
        }
    }

    pub(crate) fn append(&mut self, id: ChunkId, entry: LogEntry) -> Result<()> {
        match self {
            ChunkState::Open { entries } => {
                entries.push(entry);
                Ok(())
            }
            ChunkState::Closed { .. } => Err(Error::AlreadyClosed(id)),
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            ChunkState::Open { entries } => entries.len(),
            ChunkState::Closed { len } => *len,
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        matches!(self, ChunkState::Closed { .. })
    }

    /// Stable sort of the buffer by timestamp, for backends that take the
    /// entries by value afterwards via [`ChunkState::freeze`].
    pub(crate) fn sort(&mut self, id: ChunkId) -> Result<()> {
        self.sorted_entries(id).map(|_| ())
    }

    /// First half of close: order the buffer for persisting.
    ///
    /// The sort is stable, so entries with equal timestamps keep their
    /// append order. Re-sorting after a failed close is harmless.
    pub(crate) fn sorted_entries(&mut self, id: ChunkId) -> Result<&[LogEntry]> {
        match self {
            ChunkState::Open { entries } => {
                entries.sort_by_key(|e| e.timestamp_ms);
                Ok(entries.as_slice())
            }
            ChunkState::Closed { .. } => Err(Error::AlreadyClosed(id)),
        }
    }

    /// Second half of close: freeze, handing back the buffer.
    pub(crate) fn freeze(&mut self) -> Vec<LogEntry> {
        let len = self.len();
        match std::mem::replace(self, ChunkState::Closed { len }) {
            ChunkState::Open { entries } => entries,
            ChunkState::Closed { .. } => Vec::new(),
        }
    }
}

/// Payload of a chunk record.
#[derive(Serialize)]
pub(crate) struct PersistedChunkRef<'a> {
    pub entries: &'a [LogEntry],
}

/// Owned form of [`PersistedChunkRef`], produced when reading a chunk back.
#[derive(Deserialize)]
pub(crate) struct PersistedChunk {
    pub entries: Vec<LogEntry>,
}

/// Encode sorted entries as a complete chunk file.
pub(crate) fn encode_chunk(entries: &[LogEntry]) -> Result<Vec<u8>> {
    Record::from_value(RecordKind::Chunk, &PersistedChunkRef { entries })?.encode()
}

/// Decode a complete chunk file, checking the entries are timestamp-ordered.
pub(crate) fn decode_chunk(data: &[u8]) -> Result<Vec<LogEntry>> {
    let chunk: PersistedChunk = Record::decode(data)?.into_value(RecordKind::Chunk)?;
    if let Some(pair) = chunk
        .entries
        .windows(2)
        .find(|w| w[0].timestamp_ms > w[1].timestamp_ms)
    {
        return Err(Error::Deserialization(format!(
            "chunk entries out of order: {} before {}",
            pair[0].timestamp_ms, pair[1].timestamp_ms
        )));
    }
    Ok(chunk.entries)
}
