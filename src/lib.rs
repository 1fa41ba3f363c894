//! # yarder
//!
//! A small log-aggregation core: chunked log storage plus an inverted index.
//!
//! ## Core idea
//! Entries are buffered in memory inside an open chunk. When the chunk grows
//! past a watermark it is closed: entries are sorted by timestamp and written
//! once, whole, to an immutable file. Nothing is ever rewritten in place, so a
//! chunk file either exists complete or does not exist at all.
//!
//! Alongside the store, an inverted index maps terms to sorted document-id
//! lists and answers AND queries with a multi-way sorted merge.

pub mod appender;
pub mod error;
pub mod index;
pub mod options;
pub mod record;
pub mod storage;
pub mod types;

// Public re-exports for the top-level API
pub use appender::Appender;
pub use error::{Error, Result};
pub use index::{Index, MapIndex};
pub use options::{Options, SyncPolicy};
pub use storage::{DiskStorage, LogChunk, MemStorage, Storage};
pub use types::{ChunkId, DocId, LogEntry};
