//! Append-only segment file writer.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{PilumError, Result};
use crate::postings::PostingsList;
use crate::segment::SegmentInfo;
use crate::segment::record::{write_header, write_record};
use crate::storage::{Storage, StorageOutput};

/// Writes one segment file: a header then records in ascending term order.
#[derive(Debug)]
pub struct SegmentWriter {
    name: String,
    output: Box<dyn StorageOutput>,
    free_pointer: u64,
    records: u64,
    last_term: Option<String>,
}

impl SegmentWriter {
    /// Create (or truncate) `name` and write the segment header.
    pub fn create(storage: &Arc<dyn Storage>, name: &str) -> Result<Self> {
        let mut output = storage.create_output(name)?;
        let free_pointer = write_header(&mut output)?;

        Ok(SegmentWriter {
            name: name.to_string(),
            output,
            free_pointer,
            records: 0,
            last_term: None,
        })
    }

    /// Append a record and return the byte offset it starts at.
    ///
    /// Terms must arrive in strictly ascending order.
    pub fn write(&mut self, term: &str, postings: &PostingsList) -> Result<u64> {
        if let Some(last) = &self.last_term {
            if last.as_str() >= term {
                return Err(PilumError::invalid_operation(format!(
                    "segment {} received term {term:?} after {last:?}",
                    self.name
                )));
            }
        }

        let offset = self.free_pointer;
        self.free_pointer += write_record(&mut self.output, term, postings)?;
        self.records += 1;
        self.last_term = Some(term.to_string());

        Ok(offset)
    }

    /// Byte offset where the next record will start.
    pub fn free_pointer(&self) -> u64 {
        self.free_pointer
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    /// Flush, sync and close the file.
    pub fn finish(mut self) -> Result<SegmentInfo> {
        self.output.close()?;

        Ok(SegmentInfo {
            name: self.name,
            records: self.records,
            bytes: self.free_pointer,
        })
    }
}

/// Write a whole drained segment to `name`.
pub fn write_segment(
    storage: &Arc<dyn Storage>,
    name: &str,
    segment: &BTreeMap<String, PostingsList>,
) -> Result<SegmentInfo> {
    let mut writer = SegmentWriter::create(storage, name)?;
    for (term, postings) in segment {
        writer.write(term, postings)?;
    }
    writer.finish()
}
