use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::DocId;

/// The inverted index proper: documents in insertion order, plus one
/// posting list per term.
///
/// Invariants:
///   - ids are contiguous: document `i` is `documents[i]`
///   - every posting list is strictly ascending (sorted, no duplicates)
///   - every id in a posting list is `< documents.len()`
///
/// The first two fall out of `add` for free: ids are handed out in
/// increasing order and a document is pushed onto a list at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Postings {
    documents: Vec<String>,
    terms: HashMap<String, Vec<DocId>>,
}

impl Postings {
    /// Add a document and return its id.
    ///
    /// A term repeated within `terms` is recorded once.
    pub fn add<S: AsRef<str>>(&mut self, document: String, terms: &[S]) -> DocId {
        let id = self.documents.len();
        self.documents.push(document);
        for term in terms {
            let list = self.terms.entry(term.as_ref().to_owned()).or_default();
            if list.last() != Some(&id) {
                list.push(id);
            }
        }
        id
    }

    /// Documents containing every term, in ascending id order.
    pub fn match_terms<S: AsRef<str>>(&self, terms: &[S]) -> Vec<String> {
        let mut lists = Vec::with_capacity(terms.len());
        for term in terms {
            match self.terms.get(term.as_ref()) {
                Some(list) if !list.is_empty() => lists.push(list.as_slice()),
                // AND with an empty set is empty
                _ => return Vec::new(),
            }
        }

        intersect(&lists)
            .into_iter()
            .map(|id| self.documents[id].clone())
            .collect()
    }

    pub fn postings(&self, term: &str) -> &[DocId] {
        self.terms.get(term).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn document(&self, id: DocId) -> Option<&str> {
        self.documents.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Check the structural invariants of a deserialized index.
    pub fn validate(&self) -> Result<()> {
        let doc_count = self.documents.len();
        for (term, list) in &self.terms {
            if let Some(&bad) = list.iter().find(|&&id| id >= doc_count) {
                return Err(Error::Deserialization(format!(
                    "term {term:?} references document {bad}, index holds {doc_count}"
                )));
            }
            if list.windows(2).any(|w| w[0] >= w[1]) {
                return Err(Error::Deserialization(format!(
                    "posting list for {term:?} is not strictly ascending"
                )));
            }
        }
        Ok(())
    }
}

/// Multi-way sorted merge intersection.
///
/// One cursor per list. Each round takes the smallest id under any cursor;
/// if every cursor is on it, it is a match. Every cursor on that id then
/// advances, and as soon as one runs off its list no larger id can be in
/// all lists, so the merge stops. O(sum of list lengths).
///
/// Lists must be strictly ascending. An empty slice of lists, or any empty
/// list, yields no matches. Passing the same list twice is harmless.
pub fn intersect(lists: &[&[DocId]]) -> Vec<DocId> {
    let mut matches = Vec::new();
    if lists.is_empty() || lists.iter().any(|l| l.is_empty()) {
        return matches;
    }

    let mut cursors = vec![0usize; lists.len()];
    loop {
        // All cursors are in bounds here
        let mut heads = lists.iter().zip(&cursors).map(|(list, &pos)| list[pos]);
        let Some(min) = heads.clone().min() else {
            return matches;
        };
        if heads.all(|id| id == min) {
            matches.push(min);
        }

        let mut exhausted = false;
        for (list, pos) in lists.iter().zip(cursors.iter_mut()) {
            if list[*pos] == min {
                *pos += 1;
                exhausted |= *pos >= list.len();
            }
        }
        if exhausted {
            return matches;
        }
    }
}
