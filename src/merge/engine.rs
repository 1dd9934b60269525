//! Streaming two-way merge of segment files.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::error::{PilumError, Result};
use crate::merge::{MergeStats, MergeTask};
use crate::postings::algebra::union_merge;
use crate::segment::{DataRecord, SegmentCursor, SegmentWriter};
use crate::storage::Storage;

/// Merges two term-sorted segment files into a new one.
///
/// Both inputs are read forward exactly once. A term present in both inputs
/// is written once with the union of its postings; every other record is
/// copied unchanged. Inputs are never modified.
#[derive(Debug, Clone)]
pub struct MergeEngine {
    storage: Arc<dyn Storage>,
}

impl MergeEngine {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        MergeEngine { storage }
    }

    /// Run one merge pass.
    pub fn merge(&self, task: &MergeTask) -> Result<MergeStats> {
        if task.output == task.older || task.output == task.newer {
            return Err(PilumError::invalid_argument(format!(
                "merge output {} must differ from its inputs",
                task.output
            )));
        }

        let start = Instant::now();
        debug!(
            older = %task.older,
            newer = %task.newer,
            output = %task.output,
            "merge started"
        );

        let mut left = SegmentCursor::open(&self.storage, &task.older)?;
        let mut right = SegmentCursor::open(&self.storage, &task.newer)?;
        let mut writer = SegmentWriter::create(&self.storage, &task.output)?;
        let mut terms_merged = 0u64;

        let mut left_head = next(&mut left)?;
        let mut right_head = next(&mut right)?;

        loop {
            match (left_head.take(), right_head.take()) {
                (Some(l), Some(r)) => match l.term.cmp(&r.term) {
                    Ordering::Equal => {
                        let postings = union_merge(&l.postings, &r.postings);
                        writer.write(&l.term, &postings)?;
                        terms_merged += 1;
                        left_head = next(&mut left)?;
                        right_head = next(&mut right)?;
                    }
                    Ordering::Less => {
                        writer.write(&l.term, &l.postings)?;
                        left_head = next(&mut left)?;
                        right_head = Some(r);
                    }
                    Ordering::Greater => {
                        writer.write(&r.term, &r.postings)?;
                        left_head = Some(l);
                        right_head = next(&mut right)?;
                    }
                },
                (Some(l), None) => {
                    writer.write(&l.term, &l.postings)?;
                    left_head = next(&mut left)?;
                }
                (None, Some(r)) => {
                    writer.write(&r.term, &r.postings)?;
                    right_head = next(&mut right)?;
                }
                (None, None) => break,
            }
        }

        let records_written = writer.records();
        let info = writer.finish()?;

        let stats = MergeStats {
            inputs: vec![task.older.clone(), task.newer.clone()],
            output: info.name,
            left_records: left.records_read(),
            right_records: right.records_read(),
            terms_merged,
            records_written,
            bytes_written: info.bytes,
            merge_time_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            output = %stats.output,
            left_records = stats.left_records,
            right_records = stats.right_records,
            terms_merged = stats.terms_merged,
            records = stats.records_written,
            bytes = stats.bytes_written,
            elapsed_ms = stats.merge_time_ms,
            "merge finished"
        );

        Ok(stats)
    }
}

fn next(cursor: &mut SegmentCursor) -> Result<Option<DataRecord>> {
    Ok(cursor.next_record()?.map(|(_, record)| record))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::postings::PostingsList;
    use crate::segment::writer::write_segment;
    use crate::storage::MemoryStorage;

    fn segment(entries: &[(&str, u64, u32)]) -> BTreeMap<String, PostingsList> {
        let mut segment: BTreeMap<String, PostingsList> = BTreeMap::new();
        for (term, doc_id, offset) in entries {
            segment
                .entry(term.to_string())
                .or_default()
                .add_occurrence(*doc_id, *offset);
        }
        segment
    }

    fn read_all(storage: &Arc<dyn Storage>, name: &str) -> Vec<DataRecord> {
        SegmentCursor::open(storage, name)
            .unwrap()
            .map(|item| item.unwrap().1)
            .collect()
    }

    #[test]
    fn test_merge_partial_overlap() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new_default());
        write_segment(
            &storage,
            "merged_000000",
            &segment(&[("apple", 0, 0), ("cat", 0, 1), ("cat", 1, 3), ("zoo", 1, 0)]),
        )
        .unwrap();
        write_segment(
            &storage,
            "spill_000001",
            &segment(&[("banana", 2, 0), ("cat", 1, 3), ("cat", 2, 1)]),
        )
        .unwrap();

        let engine = MergeEngine::new(Arc::clone(&storage));
        let stats = engine
            .merge(&MergeTask::new("merged_000000", "spill_000001", "merged_000001"))
            .unwrap();

        assert_eq!(stats.left_records, 3);
        assert_eq!(stats.right_records, 2);
        assert_eq!(stats.terms_merged, 1);
        assert_eq!(stats.records_written, 4);
        assert_eq!(stats.bytes_written, storage.file_size("merged_000001").unwrap());

        let records = read_all(&storage, "merged_000001");
        let terms: Vec<&str> = records.iter().map(|r| r.term.as_str()).collect();
        assert_eq!(terms, vec!["apple", "banana", "cat", "zoo"]);

        let cat = &records[2].postings;
        assert_eq!(cat.doc_ids(), vec![0, 1, 2]);
        assert_eq!(cat.get(1).unwrap().offsets(), &[3]);

        // Inputs are untouched
        assert_eq!(read_all(&storage, "spill_000001").len(), 2);
    }

    #[test]
    fn test_merge_with_empty_side() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new_default());
        write_segment(&storage, "a", &BTreeMap::new()).unwrap();
        write_segment(&storage, "b", &segment(&[("x", 0, 0), ("y", 0, 1)])).unwrap();

        let engine = MergeEngine::new(Arc::clone(&storage));
        let stats = engine.merge(&MergeTask::new("a", "b", "c")).unwrap();
        assert_eq!(stats.records_written, 2);
        assert_eq!(read_all(&storage, "c").len(), 2);
    }

    #[test]
    fn test_merge_rejects_output_over_input() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new_default());
        let engine = MergeEngine::new(storage);
        assert!(engine.merge(&MergeTask::new("a", "b", "a")).is_err());
    }

    #[test]
    fn test_merge_missing_input_fails() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new_default());
        write_segment(&storage, "a", &segment(&[("x", 0, 0)])).unwrap();

        let engine = MergeEngine::new(Arc::clone(&storage));
        assert!(engine.merge(&MergeTask::new("a", "missing", "c")).is_err());
    }
}
