//! Segment file readers: random access by offset and sequential scans.

use std::io::{Seek, SeekFrom};
use std::sync::Arc;

use tracing::warn;

use crate::error::{PilumError, Result};
use crate::segment::record::{DataRecord, SEGMENT_MAGIC, read_header, read_record};
use crate::storage::{Storage, StorageInput};

/// Random-access reader over a segment or data file.
#[derive(Debug)]
pub struct SegmentReader {
    name: String,
    input: Box<dyn StorageInput>,
    size: u64,
}

impl SegmentReader {
    /// Open `name` and check its header.
    pub fn open(storage: &Arc<dyn Storage>, name: &str) -> Result<Self> {
        let mut input = storage.open_input(name)?;
        read_header(&mut input)?;
        let size = input.size()?;

        Ok(SegmentReader {
            name: name.to_string(),
            input,
            size,
        })
    }

    /// Read the record starting at `offset`.
    ///
    /// An offset at or past the end of the file yields `Ok(None)`.
    pub fn read_at(&mut self, offset: u64) -> Result<Option<DataRecord>> {
        if offset < SEGMENT_MAGIC.len() as u64 {
            return Err(PilumError::malformed(format!(
                "offset {offset} points into the header of {}",
                self.name
            )));
        }
        if offset >= self.size {
            return Ok(None);
        }

        self.input.seek(SeekFrom::Start(offset))?;
        Ok(read_record(&mut self.input)?.map(|(record, _)| record))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// File size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Forward-only cursor yielding `(offset, record)` pairs in file order.
///
/// A malformed record ends the readable data: the cursor logs a warning,
/// reports no more records, and remembers that it stopped early. I/O errors
/// are returned as errors.
#[derive(Debug)]
pub struct SegmentCursor {
    name: String,
    input: Box<dyn StorageInput>,
    position: u64,
    records_read: u64,
    exhausted: bool,
    stopped_early: bool,
}

impl SegmentCursor {
    /// Open `name` positioned at its first record.
    pub fn open(storage: &Arc<dyn Storage>, name: &str) -> Result<Self> {
        let mut input = storage.open_input(name)?;
        read_header(&mut input)?;

        Ok(SegmentCursor {
            name: name.to_string(),
            input,
            position: SEGMENT_MAGIC.len() as u64,
            records_read: 0,
            exhausted: false,
            stopped_early: false,
        })
    }

    /// Read the next record, or `None` once the readable data is exhausted.
    pub fn next_record(&mut self) -> Result<Option<(u64, DataRecord)>> {
        if self.exhausted {
            return Ok(None);
        }

        match read_record(&mut self.input) {
            Ok(Some((record, len))) => {
                let offset = self.position;
                self.position += len;
                self.records_read += 1;
                Ok(Some((offset, record)))
            }
            Ok(None) => {
                self.exhausted = true;
                Ok(None)
            }
            Err(e) if e.is_malformed() => {
                warn!(
                    file = %self.name,
                    offset = self.position,
                    error = %e,
                    "stopping at malformed record"
                );
                self.exhausted = true;
                self.stopped_early = true;
                Ok(None)
            }
            Err(e) => {
                self.exhausted = true;
                Err(e)
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Byte offset of the next record.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Whether the scan ended on a malformed record instead of end of file.
    pub fn stopped_early(&self) -> bool {
        self.stopped_early
    }
}

impl Iterator for SegmentCursor {
    type Item = Result<(u64, DataRecord)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::io::Write;

    use super::*;
    use crate::postings::PostingsList;
    use crate::segment::writer::write_segment;
    use crate::storage::{MemoryStorage, StorageOutput};

    fn sample_storage() -> (Arc<dyn Storage>, Vec<u64>) {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new_default());
        let mut segment = BTreeMap::new();
        for (doc_id, term) in ["apple", "banana", "cherry"].iter().enumerate() {
            let mut postings = PostingsList::new();
            postings.add_occurrence(doc_id as u64, 0);
            postings.add_occurrence(doc_id as u64 + 1, 2);
            segment.insert(term.to_string(), postings);
        }
        write_segment(&storage, "data", &segment).unwrap();

        let offsets = SegmentCursor::open(&storage, "data")
            .unwrap()
            .map(|item| item.unwrap().0)
            .collect();
        (storage, offsets)
    }

    #[test]
    fn test_cursor_reads_in_order() {
        let (storage, offsets) = sample_storage();
        assert_eq!(offsets.len(), 3);
        assert_eq!(offsets[0], 8);

        let mut cursor = SegmentCursor::open(&storage, "data").unwrap();
        let terms: Vec<String> = cursor
            .by_ref()
            .map(|item| item.unwrap().1.term)
            .collect();
        assert_eq!(terms, vec!["apple", "banana", "cherry"]);
        assert_eq!(cursor.records_read(), 3);
        assert!(!cursor.stopped_early());
        assert!(cursor.next_record().unwrap().is_none());
    }

    #[test]
    fn test_read_at_offsets() {
        let (storage, offsets) = sample_storage();
        let mut reader = SegmentReader::open(&storage, "data").unwrap();

        let record = reader.read_at(offsets[1]).unwrap().unwrap();
        assert_eq!(record.term, "banana");
        assert_eq!(record.postings.doc_ids(), vec![1, 2]);

        let record = reader.read_at(offsets[0]).unwrap().unwrap();
        assert_eq!(record.term, "apple");

        assert!(reader.read_at(reader.size()).unwrap().is_none());
        assert!(reader.read_at(0).is_err());
    }

    #[test]
    fn test_cursor_stops_at_truncated_record() {
        let (storage, _) = sample_storage();
        let mut output = storage.create_output_append("data").unwrap();
        output.write_all(b"000000099").unwrap();
        output.write_all(b"5:trunc").unwrap();
        output.close().unwrap();

        let mut cursor = SegmentCursor::open(&storage, "data").unwrap();
        let records: Vec<_> = cursor.by_ref().collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 3);
        assert!(cursor.stopped_early());
    }

    #[test]
    fn test_open_rejects_foreign_file() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new_default());
        let mut output = storage.create_output("notes").unwrap();
        output.write_all(b"hello world").unwrap();
        output.close().unwrap();

        assert!(SegmentCursor::open(&storage, "notes").is_err());
        assert!(SegmentReader::open(&storage, "notes").is_err());
    }
}
