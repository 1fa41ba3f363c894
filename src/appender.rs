use tracing::{debug, warn};

use crate::error::{AppendStage, Error, Result};
use crate::options::Options;
use crate::storage::{LogChunk, Storage};
use crate::types::{ChunkId, LogEntry};

/// Routes appends into storage-backed chunks and rotates them.
///
/// Watermark rotation: after an append, if the open chunk holds more than
/// `max_entries_per_chunk` entries it is closed, and the next append opens a
/// fresh one. A chunk therefore holds at most `max_entries_per_chunk + 1`
/// entries, including when a close fails and has to be retried.
///
/// One writer at a time: every mutating method takes `&mut self`.
pub struct Appender<S: Storage> {
    storage: S,
    max_entries_per_chunk: usize,
    open_chunk: Option<S::Chunk>,
}

impl<S: Storage> Appender<S> {
    pub fn new(storage: S, max_entries_per_chunk: usize) -> Self {
        Appender {
            storage,
            max_entries_per_chunk,
            open_chunk: None,
        }
    }

    pub fn with_options(storage: S, opts: &Options) -> Self {
        Self::new(storage, opts.max_entries_per_chunk)
    }

    /// Append a single entry, opening and closing chunks as needed.
    ///
    /// Failures and what they leave behind:
    /// - `Create`: no chunk is open; the entry was not accepted
    /// - `Append`: the open chunk is unchanged; the entry was not accepted
    /// - `Close`: a close left pending by an earlier call failed again; the
    ///   entry was not accepted and the chunk is unchanged
    /// - `Rotate`: the entry WAS accepted and is buffered, but closing the
    ///   now-full chunk failed. Do not resend it. The close is retried at
    ///   the start of the next call (or by `flush`), and no entry is
    ///   accepted until it succeeds, so a chunk never holds more than
    ///   `max_entries_per_chunk + 1` entries.
    pub fn handle_append(&mut self, entry: LogEntry) -> Result<()> {
        self.close_pending()?;

        // Make sure we have a chunk to write to
        let (mut chunk, created) = match self.open_chunk.take() {
            Some(chunk) => (chunk, false),
            None => {
                let chunk = self
                    .storage
                    .create_chunk()
                    .map_err(|e| wrap(AppendStage::Create, e))?;
                (chunk, true)
            }
        };

        if let Err(e) = chunk.append(entry) {
            if !created {
                self.open_chunk = Some(chunk);
            }
            return Err(wrap(AppendStage::Append, e));
        }

        if self.is_full(&chunk) {
            if let Err(e) = chunk.close() {
                warn!(chunk = %chunk.id(), error = %e, "rotation failed, entry stays buffered");
                self.open_chunk = Some(chunk);
                return Err(wrap(AppendStage::Rotate, e));
            }
            debug!(chunk = %chunk.id(), entries = chunk.size(), "rotated chunk");
            return Ok(());
        }

        self.open_chunk = Some(chunk);
        Ok(())
    }

    /// Retry a close that an earlier rotation left undone.
    fn close_pending(&mut self) -> Result<()> {
        let Some(chunk) = self.open_chunk.as_mut() else {
            return Ok(());
        };
        if chunk.size() <= self.max_entries_per_chunk {
            return Ok(());
        }
        chunk.close().map_err(|e| wrap(AppendStage::Close, e))?;
        debug!(chunk = %chunk.id(), entries = chunk.size(), "closed pending chunk");
        self.open_chunk = None;
        Ok(())
    }

    fn is_full(&self, chunk: &S::Chunk) -> bool {
        chunk.size() > self.max_entries_per_chunk
    }

    /// Close the open chunk, if any, regardless of its size.
    /// Returns the id of the chunk that was closed.
    pub fn flush(&mut self) -> Result<Option<ChunkId>> {
        let Some(mut chunk) = self.open_chunk.take() else {
            return Ok(None);
        };
        if let Err(e) = chunk.close() {
            self.open_chunk = Some(chunk);
            return Err(wrap(AppendStage::Close, e));
        }
        Ok(Some(chunk.id()))
    }

    /// Entries buffered in the open chunk (0 when none is open).
    pub fn open_chunk_size(&self) -> usize {
        self.open_chunk.as_ref().map_or(0, |c| c.size())
    }

    pub fn open_chunk_id(&self) -> Option<ChunkId> {
        self.open_chunk.as_ref().map(|c| c.id())
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

fn wrap(stage: AppendStage, source: Error) -> Error {
    Error::Append {
        stage,
        source: Box::new(source),
    }
}
