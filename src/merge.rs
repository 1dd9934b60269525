//! Merging of term-sorted segment files.
//!
//! This module handles the cumulative merge of the build pipeline:
//! - Merge engine performing one streaming merge-join of two segment files
//! - Merge worker running the engine on a background thread

use serde::{Deserialize, Serialize};

/// Statistics about a merge operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    /// File names of the two inputs, older first.
    pub inputs: Vec<String>,

    /// File name of the merge output.
    pub output: String,

    /// Records read from the older input.
    pub left_records: u64,

    /// Records read from the newer input.
    pub right_records: u64,

    /// Terms found in both inputs whose postings were unioned.
    pub terms_merged: u64,

    /// Records written to the output.
    pub records_written: u64,

    /// Size of the output in bytes.
    pub bytes_written: u64,

    /// Time taken for merge (in milliseconds).
    pub merge_time_ms: u64,
}

/// A merge to perform: two inputs and the output to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeTask {
    /// Previous cumulative file.
    pub older: String,

    /// Newly flushed spill segment.
    pub newer: String,

    /// File to create.
    pub output: String,
}

impl MergeTask {
    pub fn new(
        older: impl Into<String>,
        newer: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        MergeTask {
            older: older.into(),
            newer: newer.into(),
            output: output.into(),
        }
    }
}

pub mod engine;
pub mod worker;

pub use engine::MergeEngine;
pub use worker::MergeWorker;
