//! Segments: immutable, term-sorted term to postings files.
//!
//! This module handles everything between the in-memory segment and its
//! on-disk form:
//! - Segment builder accumulating postings under a distinct-term limit
//! - Record codec for the length-prefixed data record format
//! - Segment writer appending records to a fresh file
//! - Segment reader for offset lookups and sequential scans

use serde::{Deserialize, Serialize};

/// Information about a segment file written to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentInfo {
    /// File name of the segment in its storage.
    pub name: String,

    /// Number of records (distinct terms) in the segment.
    pub records: u64,

    /// Size of the file in bytes, header included. This is the free pointer
    /// after the last record.
    pub bytes: u64,
}

pub mod builder;
pub mod reader;
pub mod record;
pub mod writer;

pub use builder::SegmentBuilder;
pub use reader::{SegmentCursor, SegmentReader};
pub use record::DataRecord;
pub use writer::SegmentWriter;
