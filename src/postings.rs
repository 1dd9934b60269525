//! Postings and postings lists.
//!
//! A [`Posting`] records every offset at which a term occurs in one document;
//! a [`PostingsList`] holds the postings of one term in strictly ascending
//! document order. Both types keep their invariants on every mutation, so the
//! set operations in [`algebra`] can rely on sorted, duplicate-free input.

pub mod algebra;

use serde::{Deserialize, Serialize};

/// Dense document identifier, assigned sequentially from 0.
pub type DocId = u64;

/// A single posting: one document and the offsets of a term inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    /// Document ID.
    pub doc_id: DocId,
    /// Ascending, unique token offsets of the term in the document.
    offsets: Vec<u32>,
}

impl Posting {
    /// Create a posting with no offsets.
    pub fn new(doc_id: DocId) -> Self {
        Posting {
            doc_id,
            offsets: Vec::new(),
        }
    }

    /// Create a posting from offsets in any order; duplicates are dropped.
    pub fn with_offsets(doc_id: DocId, mut offsets: Vec<u32>) -> Self {
        offsets.sort_unstable();
        offsets.dedup();
        Posting { doc_id, offsets }
    }

    /// Add an offset, keeping the offset set sorted and unique.
    pub fn add_offset(&mut self, offset: u32) {
        match self.offsets.last() {
            Some(&last) if last < offset => self.offsets.push(offset),
            None => self.offsets.push(offset),
            _ => {
                if let Err(pos) = self.offsets.binary_search(&offset) {
                    self.offsets.insert(pos, offset);
                }
            }
        }
    }

    /// The offsets of the term in this document.
    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    /// Number of occurrences of the term in this document.
    pub fn frequency(&self) -> u32 {
        self.offsets.len() as u32
    }

    /// Merge another posting's offsets into this one.
    pub(crate) fn merge_offsets(&mut self, other: &[u32]) {
        self.offsets = algebra::union_offsets(&self.offsets, other);
    }

    pub(crate) fn from_sorted_offsets(doc_id: DocId, offsets: Vec<u32>) -> Self {
        debug_assert!(offsets.windows(2).all(|w| w[0] < w[1]));
        Posting { doc_id, offsets }
    }
}

/// The postings of one term, in strictly ascending document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingsList {
    postings: Vec<Posting>,
}

impl PostingsList {
    /// Create a new empty postings list.
    pub fn new() -> Self {
        PostingsList {
            postings: Vec::new(),
        }
    }

    /// Build a list from postings in any order.
    ///
    /// Postings that share a document ID are combined and their offsets
    /// unioned.
    pub fn from_postings(mut postings: Vec<Posting>) -> Self {
        postings.sort_by_key(|p| p.doc_id);

        let mut list = PostingsList::new();
        for posting in postings {
            match list.postings.last_mut() {
                Some(last) if last.doc_id == posting.doc_id => {
                    last.merge_offsets(&posting.offsets);
                }
                _ => list.postings.push(posting),
            }
        }
        list
    }

    /// Record one occurrence of the term in `doc_id` at `offset`.
    ///
    /// Appending to the last document is the common case while indexing;
    /// out-of-order documents are inserted at their sorted position.
    pub fn add_occurrence(&mut self, doc_id: DocId, offset: u32) {
        match self.postings.last_mut() {
            Some(last) if last.doc_id == doc_id => {
                last.add_offset(offset);
                return;
            }
            Some(last) if last.doc_id > doc_id => {}
            _ => {
                self.postings
                    .push(Posting::from_sorted_offsets(doc_id, vec![offset]));
                return;
            }
        }

        match self.postings.binary_search_by_key(&doc_id, |p| p.doc_id) {
            Ok(pos) => self.postings[pos].add_offset(offset),
            Err(pos) => self
                .postings
                .insert(pos, Posting::from_sorted_offsets(doc_id, vec![offset])),
        }
    }

    /// Append a posting whose document ID is greater than every present one.
    pub(crate) fn push(&mut self, posting: Posting) {
        debug_assert!(
            self.postings
                .last()
                .is_none_or(|last| last.doc_id < posting.doc_id)
        );
        self.postings.push(posting);
    }

    /// Get the length of the postings list.
    pub fn len(&self) -> usize {
        self.postings.len()
    }

    /// Check if the postings list is empty.
    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// Get an iterator over the postings.
    pub fn iter(&self) -> std::slice::Iter<'_, Posting> {
        self.postings.iter()
    }

    /// The postings as a slice.
    pub fn postings(&self) -> &[Posting] {
        &self.postings
    }

    /// Find the posting of a document.
    pub fn get(&self, doc_id: DocId) -> Option<&Posting> {
        self.postings
            .binary_search_by_key(&doc_id, |p| p.doc_id)
            .ok()
            .map(|pos| &self.postings[pos])
    }

    /// The document IDs in ascending order.
    pub fn doc_ids(&self) -> Vec<DocId> {
        self.postings.iter().map(|p| p.doc_id).collect()
    }

    /// Total number of occurrences across all documents.
    pub fn total_frequency(&self) -> u64 {
        self.postings.iter().map(|p| p.frequency() as u64).sum()
    }
}

impl<'a> IntoIterator for &'a PostingsList {
    type Item = &'a Posting;
    type IntoIter = std::slice::Iter<'a, Posting>;

    fn into_iter(self) -> Self::IntoIter {
        self.postings.iter()
    }
}

impl IntoIterator for PostingsList {
    type Item = Posting;
    type IntoIter = std::vec::IntoIter<Posting>;

    fn into_iter(self) -> Self::IntoIter {
        self.postings.into_iter()
    }
}
