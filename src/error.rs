use std::fmt;
use std::io;

use thiserror::Error;

use crate::types::ChunkId;

/// Which step of [`Appender::handle_append`](crate::Appender::handle_append) failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendStage {
    Create,
    Append,
    /// Retrying a close left pending by an earlier call.
    Close,
    /// Closing a chunk the current entry filled. The entry itself is buffered.
    Rotate,
}

impl fmt::Display for AppendStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppendStage::Create => write!(f, "create chunk"),
            AppendStage::Append => write!(f, "append entry"),
            AppendStage::Close => write!(f, "close chunk"),
            AppendStage::Rotate => write!(f, "rotate chunk (entry buffered)"),
        }
    }
}

/// Unified error type for the log store and the index.
#[derive(Debug, Error)]
pub enum Error {
    /// A new chunk could not be allocated under the storage root.
    #[error("unable to allocate {chunk}: {source}")]
    Allocation {
        chunk: ChunkId,
        #[source]
        source: io::Error,
    },

    /// Publishing a closed chunk's file failed. The chunk is still open.
    #[error("unable to write {chunk}: {source}")]
    Write {
        chunk: ChunkId,
        #[source]
        source: io::Error,
    },

    /// Append or close on a chunk that has already been closed.
    #[error("{0} is already closed")]
    AlreadyClosed(ChunkId),

    /// A persisted record is malformed (bad CRC, truncated, wrong kind, bad payload).
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// Encoding a payload failed.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error outside of chunk allocation/publish (reads, snapshots).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Storage failure surfaced through an appender, tagged with the step.
    #[error("unable to {stage}: {source}")]
    Append {
        stage: AppendStage,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Strip appender context and return the underlying storage error.
    pub fn root(&self) -> &Error {
        match self {
            Error::Append { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
