//! The index interface seen by tokenizers and query layers.
//!
//! Tokenizers feed `(term, docID, offset)` triples through [`Index::insert`]
//! and register documents with [`Index::add_document`]; [`Index::cleanup`]
//! ends the indexing pass. Query layers then call [`Index::get_postings`].
//!
//! Implementations:
//! - [`PersistentIndex`]: disk-resident, built in bounded memory
//! - [`IndexReader`]: read-only view of an index built earlier
//! - [`MemoryIndex`]: everything in a hash map

use std::fmt::Debug;

use crate::doc_info::DocumentInfo;
use crate::error::Result;
use crate::postings::{DocId, PostingsList};

/// Common interface of all index implementations.
pub trait Index: Send + Sync + Debug {
    /// Record one occurrence of `term` (build phase only).
    fn insert(&mut self, term: &str, doc_id: DocId, offset: u32) -> Result<()>;

    /// Register a document and get its ID (build phase only).
    fn add_document(&mut self, path: &str, length: u64) -> Result<DocId>;

    /// End the indexing pass and make the index queryable.
    fn cleanup(&mut self) -> Result<()>;

    /// Postings of `term`; `None` when the term does not occur.
    fn get_postings(&self, term: &str) -> Result<Option<PostingsList>>;

    /// Metadata of a document.
    fn document(&self, doc_id: DocId) -> Option<&DocumentInfo>;

    /// Number of registered documents.
    fn doc_count(&self) -> usize;
}

pub mod memory;
pub mod persistent;

pub use memory::MemoryIndex;
pub use persistent::{IndexReader, PersistentIndex};
