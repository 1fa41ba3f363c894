use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::options::{Options, SyncPolicy};
use crate::storage::reader::ChunkReader;
use crate::storage::{ChunkState, LogChunk, Storage, encode_chunk, writer};
use crate::types::{ChunkId, LogEntry};

/// Storage backed by a directory on disk. One file per closed chunk:
///
/// ```text
/// <root>/chunk-00000000.chunk
/// <root>/chunk-00000001.chunk
/// ...
/// ```
///
/// Files are create-once. Storage never rewrites or deletes a chunk file.
#[derive(Debug)]
pub struct DiskStorage {
    root: PathBuf,
    next_chunk_id: u64,
    sync: SyncPolicy,
}

impl DiskStorage {
    /// Storage over an existing directory, ids starting at 0.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DiskStorage {
            root: root.into(),
            next_chunk_id: 0,
            sync: SyncPolicy::default(),
        }
    }

    pub fn with_sync(mut self, sync: SyncPolicy) -> Self {
        self.sync = sync;
        self
    }

    /// Open (creating if needed) a storage root and resume allocation after
    /// the highest chunk id already persisted there.
    pub fn open(root: impl Into<PathBuf>, opts: &Options) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        let mut storage = DiskStorage::new(root).with_sync(opts.sync);
        if let Some(last) = storage.list_chunks()?.last() {
            storage.next_chunk_id = last.0 + 1;
        }

        info!(
            root = %storage.root.display(),
            next_chunk = storage.next_chunk_id,
            "opened disk storage"
        );
        Ok(storage)
    }

    /// Path a chunk is (or will be) persisted at.
    pub fn chunk_path(&self, id: ChunkId) -> PathBuf {
        self.root.join(id.file_name())
    }

    /// Ids of every closed chunk under the root, ascending.
    pub fn list_chunks(&self) -> Result<Vec<ChunkId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if let Some(id) = entry.file_name().to_str().and_then(ChunkId::from_file_name) {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    /// Entries of a closed chunk, in timestamp order.
    pub fn read_chunk(&self, id: ChunkId) -> Result<Vec<LogEntry>> {
        Ok(ChunkReader::open(&self.chunk_path(id))?.into_entries())
    }

    fn check_allocatable(&self, path: &Path) -> io::Result<()> {
        let meta = fs::metadata(&self.root)?;
        if !meta.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("storage root {} is not a directory", self.root.display()),
            ));
        }
        if path.try_exists()? {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", path.display()),
            ));
        }
        Ok(())
    }
}

impl Storage for DiskStorage {
    type Chunk = DiskChunk;

    fn create_chunk(&mut self) -> Result<DiskChunk> {
        let id = ChunkId(self.next_chunk_id);
        self.next_chunk_id += 1;

        let path = self.chunk_path(id);
        self.check_allocatable(&path)
            .map_err(|source| Error::Allocation { chunk: id, source })?;

        debug!(chunk = %id, "allocated chunk");
        Ok(DiskChunk {
            id,
            dir: self.root.clone(),
            path,
            sync: self.sync,
            state: ChunkState::new(),
        })
    }
}

/// A chunk that buffers in memory and is published as a single file on close.
#[derive(Debug)]
pub struct DiskChunk {
    id: ChunkId,
    dir: PathBuf,
    path: PathBuf,
    sync: SyncPolicy,
    state: ChunkState,
}

impl DiskChunk {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogChunk for DiskChunk {
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
        let bytes = encode_chunk(self.state.sorted_entries(self.id)?)?;

        if let Err(source) = writer::publish_new(&self.dir, &self.path, &bytes, self.sync) {
            warn!(chunk = %self.id, error = %source, "chunk publish failed, chunk stays open");
            return Err(Error::Write {
                chunk: self.id,
                source,
            });
        }

        let entries = self.state.freeze();
        info!(
            chunk = %self.id,
            entries = entries.len(),
            path = %self.path.display(),
            "wrote chunk file"
        );
        Ok(())
    }
}
