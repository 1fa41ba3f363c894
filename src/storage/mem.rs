use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::storage::{ChunkState, LogChunk, Storage};
use crate::types::{ChunkId, LogEntry};

/// A chunk that has been closed into a [`MemStorage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedChunk {
    pub id: ChunkId,
    /// Entries in timestamp order.
    pub entries: Vec<LogEntry>,
}

/// In-memory storage. Closing a chunk hands its sorted entries to the
/// storage instead of a file, so close never fails on I/O.
#[derive(Debug, Default)]
pub struct MemStorage {
    next_chunk_id: u64,
    closed: Arc<Mutex<Vec<ClosedChunk>>>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every chunk closed so far, in close order.
    pub fn closed_chunks(&self) -> Vec<ClosedChunk> {
        self.closed.lock().clone()
    }
}

impl Storage for MemStorage {
    type Chunk = MemChunk;

    fn create_chunk(&mut self) -> Result<MemChunk> {
        let id = ChunkId(self.next_chunk_id);
        self.next_chunk_id += 1;
        Ok(MemChunk {
            id,
            state: ChunkState::new(),
            sink: Arc::clone(&self.closed),
        })
    }
}

#[derive(Debug)]
pub struct MemChunk {
    id: ChunkId,
    state: ChunkState,
    sink: Arc<Mutex<Vec<ClosedChunk>>>,
}

impl LogChunk for MemChunk {
    fn id(&self) -> ChunkId {
        self.id
    }

    fn append(&mut self, entry: LogEntry) -> Result<()> {
        self.state.append(self.id, entry)
    }

    fn size(&self) -> usize {
        self.state.len()
    }

    fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    fn close(&mut self) -> Result<()> {
        self.state.sort(self.id)?;
        let entries = self.state.freeze();
        debug!(chunk = %self.id, entries = entries.len(), "closed in-memory chunk");
        self.sink.lock().push(ClosedChunk {
            id: self.id,
            entries,
        });
        Ok(())
    }
}
