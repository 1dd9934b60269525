//! Per-document metadata and the doc-info file.
//!
//! Documents get dense IDs from a growable table indexed by [`DocId`]. The
//! table is persisted as a line-oriented text file, one
//! `docID;docPath;docLength` line per document, in ID order.

use std::io::{BufRead, BufReader, Write};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{PilumError, Result};
use crate::postings::DocId;
use crate::storage::{Storage, StorageOutput};

/// Metadata of one indexed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub doc_id: DocId,
    pub path: String,
    /// Length of the document in tokens.
    pub length: u64,
}

impl DocumentInfo {
    fn to_line(&self) -> String {
        format!("{};{};{}\n", self.doc_id, self.path, self.length)
    }

    /// Parse one line. The path may itself contain `;`, so the line is split
    /// on its first and last delimiter.
    fn parse_line(line: &str) -> Result<Self> {
        let malformed = || PilumError::malformed(format!("bad doc-info line {line:?}"));

        let (id, rest) = line.split_once(';').ok_or_else(malformed)?;
        let (path, length) = rest.rsplit_once(';').ok_or_else(malformed)?;

        Ok(DocumentInfo {
            doc_id: id.parse().map_err(|_| malformed())?,
            path: path.to_string(),
            length: length.parse().map_err(|_| malformed())?,
        })
    }
}

/// Arena of document metadata, indexed by sequentially assigned IDs.
#[derive(Debug, Clone, Default)]
pub struct DocumentTable {
    documents: Vec<DocumentInfo>,
}

impl DocumentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document and return its ID. IDs start at 0 and are never
    /// reused.
    pub fn add(&mut self, path: impl Into<String>, length: u64) -> DocId {
        let doc_id = self.documents.len() as DocId;
        self.documents.push(DocumentInfo {
            doc_id,
            path: path.into(),
            length,
        });
        doc_id
    }

    pub fn get(&self, doc_id: DocId) -> Option<&DocumentInfo> {
        usize::try_from(doc_id)
            .ok()
            .and_then(|index| self.documents.get(index))
    }

    /// Update the recorded length of a document.
    pub fn set_length(&mut self, doc_id: DocId, length: u64) -> Result<()> {
        let info = usize::try_from(doc_id)
            .ok()
            .and_then(|index| self.documents.get_mut(index))
            .ok_or_else(|| PilumError::invalid_argument(format!("unknown document {doc_id}")))?;
        info.length = length;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DocumentInfo> {
        self.documents.iter()
    }

    /// Sum of all document lengths.
    pub fn total_length(&self) -> u64 {
        self.documents.iter().map(|d| d.length).sum()
    }

    /// Write every document to `name`, replacing its contents. The file is
    /// created even when the table is empty.
    pub fn write_to(&self, storage: &Arc<dyn Storage>, name: &str) -> Result<usize> {
        let mut output = storage.create_output(name)?;
        for info in &self.documents {
            output.write_all(info.to_line().as_bytes())?;
        }
        output.close()?;
        Ok(self.documents.len())
    }

    /// Load a table from `name`. Lines must list IDs 0, 1, 2, ... in order.
    pub fn load(storage: &Arc<dyn Storage>, name: &str) -> Result<Self> {
        let reader = BufReader::new(storage.open_input(name)?);
        let mut table = DocumentTable::new();

        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }

            let info = DocumentInfo::parse_line(&line)?;
            if info.doc_id != table.documents.len() as DocId {
                return Err(PilumError::malformed(format!(
                    "doc-info lists document {} where {} was expected",
                    info.doc_id,
                    table.documents.len()
                )));
            }
            table.documents.push(info);
        }

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_sequential_ids() {
        let mut table = DocumentTable::new();
        assert_eq!(table.add("a.txt", 3), 0);
        assert_eq!(table.add("b.txt", 5), 1);
        assert_eq!(table.add("c.txt", 0), 2);

        assert_eq!(table.get(1).unwrap().path, "b.txt");
        assert!(table.get(3).is_none());
        assert_eq!(table.total_length(), 8);

        table.set_length(2, 7).unwrap();
        assert_eq!(table.get(2).unwrap().length, 7);
        assert!(table.set_length(9, 1).is_err());
    }

    #[test]
    fn test_write_and_load() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new_default());
        let mut table = DocumentTable::new();
        table.add("docs/a.txt", 3);
        table.add("docs/odd;name.txt", 5);
        assert_eq!(table.write_to(&storage, "docInfo").unwrap(), 2);

        table.add("docs/c.txt", 1);
        assert_eq!(table.write_to(&storage, "docInfo").unwrap(), 3);

        let loaded = DocumentTable::load(&storage, "docInfo").unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.get(1).unwrap().path, "docs/odd;name.txt");
        assert_eq!(loaded.get(1).unwrap().length, 5);
        assert_eq!(loaded.get(2).unwrap().path, "docs/c.txt");

        DocumentTable::new().write_to(&storage, "empty").unwrap();
        assert_eq!(storage.file_size("empty").unwrap(), 0);
        assert!(DocumentTable::load(&storage, "empty").unwrap().is_empty());
    }

    #[test]
    fn test_parse_line() {
        let info = DocumentInfo::parse_line("4;x;y;12").unwrap();
        assert_eq!(info.doc_id, 4);
        assert_eq!(info.path, "x;y");
        assert_eq!(info.length, 12);

        assert!(DocumentInfo::parse_line("4;x").is_err());
        assert!(DocumentInfo::parse_line("a;x;1").is_err());
        assert!(DocumentInfo::parse_line("1;x;-1").is_err());
    }

    #[test]
    fn test_load_rejects_gaps() {
        let storage = MemoryStorage::new_default();
        storage.put_file("docInfo", b"0;a;1\n2;b;1\n".to_vec());
        let storage: Arc<dyn Storage> = Arc::new(storage);

        assert!(DocumentTable::load(&storage, "docInfo").unwrap_err().is_malformed());
    }
}
