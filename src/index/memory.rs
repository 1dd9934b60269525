//! In-memory index implementation.

use ahash::AHashMap;

use crate::doc_info::{DocumentInfo, DocumentTable};
use crate::error::Result;
use crate::index::Index;
use crate::postings::{DocId, PostingsList};

/// An index holding every postings list in memory.
///
/// Suitable for small collections and as a reference for the disk-resident
/// index in tests.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    terms: AHashMap<String, PostingsList>,
    documents: DocumentTable,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct terms.
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// All indexed terms in ascending order.
    pub fn terms(&self) -> Vec<&str> {
        let mut terms: Vec<&str> = self.terms.keys().map(String::as_str).collect();
        terms.sort_unstable();
        terms
    }
}

impl Index for MemoryIndex {
    fn insert(&mut self, term: &str, doc_id: DocId, offset: u32) -> Result<()> {
        self.terms
            .entry(term.to_string())
            .or_default()
            .add_occurrence(doc_id, offset);
        Ok(())
    }

    fn add_document(&mut self, path: &str, length: u64) -> Result<DocId> {
        Ok(self.documents.add(path, length))
    }

    fn cleanup(&mut self) -> Result<()> {
        Ok(())
    }

    fn get_postings(&self, term: &str) -> Result<Option<PostingsList>> {
        Ok(self.terms.get(term).cloned())
    }

    fn document(&self, doc_id: DocId) -> Option<&DocumentInfo> {
        self.documents.get(doc_id)
    }

    fn doc_count(&self) -> usize {
        self.documents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_index() {
        let mut index = MemoryIndex::new();
        let doc = index.add_document("a.txt", 3).unwrap();
        index.insert("the", doc, 0).unwrap();
        index.insert("cat", doc, 1).unwrap();
        index.insert("the", doc, 2).unwrap();
        index.cleanup().unwrap();

        assert_eq!(index.term_count(), 2);
        assert_eq!(index.terms(), vec!["cat", "the"]);
        assert_eq!(
            index.get_postings("the").unwrap().unwrap().get(0).unwrap().offsets(),
            &[0, 2]
        );
        assert!(index.get_postings("dog").unwrap().is_none());
        assert_eq!(index.document(0).unwrap().path, "a.txt");
        assert_eq!(index.doc_count(), 1);
    }
}
