//! In-memory segment accumulation.

use std::collections::BTreeMap;

use crate::error::{PilumError, Result};
use crate::postings::{DocId, PostingsList};

/// Accumulates term to postings entries for the segment being built.
///
/// Terms are kept in a `BTreeMap`, so draining yields them in ascending
/// lexicographic order, ready for the segment writer. The builder is full
/// once it holds `term_limit` distinct terms; it must be drained before it
/// accepts another insert.
#[derive(Debug)]
pub struct SegmentBuilder {
    terms: BTreeMap<String, PostingsList>,
    term_limit: usize,
    occurrences: u64,
}

impl SegmentBuilder {
    /// Create a builder that fills up at `term_limit` distinct terms.
    pub fn new(term_limit: usize) -> Self {
        SegmentBuilder {
            terms: BTreeMap::new(),
            term_limit: term_limit.max(1),
            occurrences: 0,
        }
    }

    /// Record `term` at `offset` in `doc_id`.
    ///
    /// Returns `true` when this insert made the segment full and it should
    /// be flushed.
    pub fn insert(&mut self, term: &str, doc_id: DocId, offset: u32) -> Result<bool> {
        if self.is_full() {
            return Err(PilumError::invalid_operation(format!(
                "segment holds {} terms and must be flushed before inserting {term:?}",
                self.terms.len()
            )));
        }

        match self.terms.get_mut(term) {
            Some(postings) => postings.add_occurrence(doc_id, offset),
            None => {
                let mut postings = PostingsList::new();
                postings.add_occurrence(doc_id, offset);
                self.terms.insert(term.to_string(), postings);
            }
        }
        self.occurrences += 1;

        Ok(self.is_full())
    }

    /// Whether the distinct-term limit has been reached.
    pub fn is_full(&self) -> bool {
        self.terms.len() >= self.term_limit
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Number of distinct terms in the segment.
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Number of occurrences inserted since the last drain.
    pub fn occurrence_count(&self) -> u64 {
        self.occurrences
    }

    pub fn term_limit(&self) -> usize {
        self.term_limit
    }

    /// Postings of a term in the current segment.
    pub fn get(&self, term: &str) -> Option<&PostingsList> {
        self.terms.get(term)
    }

    /// Iterate the current segment in term order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PostingsList)> {
        self.terms.iter().map(|(term, postings)| (term.as_str(), postings))
    }

    /// Take the accumulated segment and reset the builder to empty.
    pub fn drain(&mut self) -> BTreeMap<String, PostingsList> {
        self.occurrences = 0;
        std::mem::take(&mut self.terms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_order() {
        let mut builder = SegmentBuilder::new(10);
        builder.insert("zebra", 0, 0).unwrap();
        builder.insert("apple", 0, 1).unwrap();
        builder.insert("mango", 1, 0).unwrap();
        builder.insert("apple", 1, 1).unwrap();

        assert_eq!(builder.term_count(), 3);
        assert_eq!(builder.occurrence_count(), 4);
        assert_eq!(builder.get("apple").unwrap().doc_ids(), vec![0, 1]);

        let terms: Vec<&str> = builder.iter().map(|(term, _)| term).collect();
        assert_eq!(terms, vec!["apple", "mango", "zebra"]);
    }

    #[test]
    fn test_threshold_counts_distinct_terms() {
        let mut builder = SegmentBuilder::new(2);

        assert!(!builder.insert("cat", 0, 0).unwrap());
        assert!(!builder.insert("cat", 0, 5).unwrap());
        assert!(!builder.insert("cat", 1, 0).unwrap());
        assert!(builder.insert("dog", 0, 1).unwrap());
        assert!(builder.is_full());

        // Full until drained
        assert!(builder.insert("cat", 2, 0).is_err());
    }

    #[test]
    fn test_drain_resets() {
        let mut builder = SegmentBuilder::new(2);
        builder.insert("cat", 0, 0).unwrap();
        builder.insert("dog", 0, 1).unwrap();

        let segment = builder.drain();
        assert_eq!(segment.len(), 2);
        assert!(builder.is_empty());
        assert_eq!(builder.occurrence_count(), 0);
        assert!(!builder.is_full());

        assert!(!builder.insert("cat", 1, 0).unwrap());
        assert_eq!(builder.get("cat").unwrap().doc_ids(), vec![1]);
    }
}
