pub mod postings;

pub use postings::{Postings, intersect};

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::options::SyncPolicy;
use crate::record::{Record, RecordKind};
use crate::storage::writer;
use crate::types::DocId;

/// An inverted index answering exact AND queries over documents.
///
/// Term extraction is the caller's job: documents arrive with their terms
/// already split out, and queries are lists of terms.
pub trait Index {
    /// Add a document under each of `terms`, assigning the next id.
    fn add<S: AsRef<str>>(&self, document: impl Into<String>, terms: &[S]) -> DocId;

    /// Documents containing every one of `terms`, in insertion order.
    /// An empty query matches nothing.
    fn match_terms<S: AsRef<str>>(&self, terms: &[S]) -> Vec<String>;

    /// Write the whole index as one snapshot record.
    fn write_to<W: Write>(&self, w: W) -> Result<()>;
}

/// [`Index`] over an in-memory term map.
///
/// Readers-writer exclusion: `add` takes the lock exclusively; queries and
/// snapshots share it, so they run concurrently with each other but never
/// alongside an `add`.
#[derive(Debug, Default)]
pub struct MapIndex {
    postings: RwLock<Postings>,
}

impl MapIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild an index from a snapshot produced by [`Index::write_to`].
    pub fn read_from<R: Read>(mut r: R) -> Result<Self> {
        let mut data = Vec::new();
        r.read_to_end(&mut data)?;

        let postings: Postings =
            Record::decode(&data)?.into_value(RecordKind::IndexSnapshot)?;
        postings.validate()?;

        debug!(
            documents = postings.len(),
            terms = postings.term_count(),
            "read index snapshot"
        );
        Ok(MapIndex {
            postings: RwLock::new(postings),
        })
    }

    /// Atomically replace the snapshot file at `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes)?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        writer::replace(dir, path, &bytes, SyncPolicy::Fsync)?;
        debug!(path = %path.display(), bytes = bytes.len(), "saved index snapshot");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::read_from(fs::File::open(path)?)
    }

    pub fn len(&self) -> usize {
        self.postings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.read().is_empty()
    }

    pub fn document(&self, id: DocId) -> Option<String> {
        self.postings.read().document(id).map(str::to_owned)
    }

    /// Copy of the current postings, for inspection and comparison.
    pub fn snapshot(&self) -> Postings {
        self.postings.read().clone()
    }
}

impl Index for MapIndex {
    fn add<S: AsRef<str>>(&self, document: impl Into<String>, terms: &[S]) -> DocId {
        self.postings.write().add(document.into(), terms)
    }

    fn match_terms<S: AsRef<str>>(&self, terms: &[S]) -> Vec<String> {
        self.postings.read().match_terms(terms)
    }

    fn write_to<W: Write>(&self, mut w: W) -> Result<()> {
        let record = {
            let postings = self.postings.read();
            Record::from_value(RecordKind::IndexSnapshot, &*postings)?
        };
        w.write_all(&record.encode()?)?;
        w.flush()?;
        Ok(())
    }
}
