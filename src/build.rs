//! Bounded-memory index construction.
//!
//! The [`BuildOrchestrator`] drives the pipeline
//!
//! ```text
//! BUILDING -> FLUSHING -> MERGING (background) -> ... -> CLOSING
//!          -> FINAL_MERGE -> DICTIONARY_BUILD -> READY
//! ```
//!
//! Inserts accumulate in a [`SegmentBuilder`]. When it holds the configured
//! number of distinct terms it is written to a spill file and handed, with
//! the previous cumulative file, to a [`MergeWorker`] that runs while the
//! next segment is being built. At most one merge is in flight. Closing the
//! build flushes the last segment, merges it and fills a staged dictionary
//! from the result. Only then are the data file, the dictionary and any
//! other staged files renamed to their canonical names.
//!
//! Any failure aborts the build. The error reports the phase it happened in,
//! the index is never promoted to READY, and the artifacts of an earlier
//! build stay in place.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::IndexConfig;
use crate::dictionary::{DictionaryStats, DictionaryWriter};
use crate::error::{PilumError, Result};
use crate::merge::{MergeEngine, MergeStats, MergeTask, MergeWorker};
use crate::postings::DocId;
use crate::segment::writer::write_segment;
use crate::segment::{SegmentBuilder, SegmentCursor, SegmentInfo, SegmentWriter};
use crate::storage::Storage;

/// States of the build pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildPhase {
    Building,
    Flushing,
    Merging,
    Closing,
    FinalMerge,
    DictionaryBuild,
    Ready,
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildPhase::Building => "BUILDING",
            BuildPhase::Flushing => "FLUSHING",
            BuildPhase::Merging => "MERGING",
            BuildPhase::Closing => "CLOSING",
            BuildPhase::FinalMerge => "FINAL_MERGE",
            BuildPhase::DictionaryBuild => "DICTIONARY_BUILD",
            BuildPhase::Ready => "READY",
        };
        f.write_str(name)
    }
}

/// Statistics of a completed build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Spill segments written.
    pub segments_flushed: u64,
    /// Merges run, background and final.
    pub merges_run: u64,
    /// Occurrences inserted.
    pub occurrences: u64,
    /// Documents registered with the index.
    pub documents: u64,
    /// Size of the canonical data file in bytes.
    pub data_bytes: u64,
    /// Dictionary fill statistics; `entries` is the vocabulary size.
    pub dictionary: DictionaryStats,
}

/// Drives the build state machine for one indexing pass.
#[derive(Debug)]
pub struct BuildOrchestrator {
    storage: Arc<dyn Storage>,
    config: IndexConfig,
    builder: SegmentBuilder,
    phase: BuildPhase,
    failed: Option<BuildPhase>,
    next_spill: u64,
    generation: u64,
    cumulative: Option<String>,
    in_flight: Option<MergeWorker>,
    staged: Vec<(String, String)>,
    stats: BuildStats,
}

impl BuildOrchestrator {
    /// Start a build writing into `storage`.
    pub fn new(storage: Arc<dyn Storage>, config: IndexConfig) -> Result<Self> {
        config.validate()?;

        Ok(BuildOrchestrator {
            builder: SegmentBuilder::new(config.segment_term_limit),
            storage,
            config,
            phase: BuildPhase::Building,
            failed: None,
            next_spill: 0,
            generation: 0,
            cumulative: None,
            in_flight: None,
            staged: Vec::new(),
            stats: BuildStats::default(),
        })
    }

    /// Current phase of the pipeline.
    pub fn phase(&self) -> BuildPhase {
        self.phase
    }

    /// Statistics gathered so far.
    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Record `term` at `offset` in `doc_id`, flushing the segment when it
    /// reaches the term limit.
    pub fn insert(&mut self, term: &str, doc_id: DocId, offset: u32) -> Result<()> {
        self.ensure_building()?;

        let full = self.builder.insert(term, doc_id, offset)?;
        self.stats.occurrences += 1;

        if full {
            self.guard(|this| this.flush())?;
        }
        Ok(())
    }

    /// Flush the current segment and finish the build: final merge, rename
    /// to the canonical data file and dictionary construction.
    pub fn finish(&mut self) -> Result<BuildStats> {
        self.ensure_building()?;
        self.guard(|this| this.close())?;
        Ok(self.stats.clone())
    }

    /// Have `staged` renamed to `target` when the build commits, together
    /// with the data file and the dictionary. `staged` must exist by then.
    pub fn stage_file(&mut self, staged: impl Into<String>, target: impl Into<String>) -> Result<()> {
        self.ensure_building()?;
        self.staged.push((staged.into(), target.into()));
        Ok(())
    }

    fn ensure_building(&self) -> Result<()> {
        if let Some(phase) = self.failed {
            return Err(PilumError::invalid_operation(format!(
                "build already failed during {phase}"
            )));
        }
        if self.phase != BuildPhase::Building {
            return Err(PilumError::invalid_operation(format!(
                "cannot accept input in phase {}",
                self.phase
            )));
        }
        Ok(())
    }

    /// Run a pipeline step, tagging its error with the current phase and
    /// poisoning the build on failure.
    fn guard<T>(&mut self, step: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        step(self).map_err(|e| {
            let err = e.in_phase(self.phase);
            let phase = err.phase().unwrap_or(self.phase);
            self.failed = Some(phase);
            warn!(phase = %phase, error = %err, "build aborted");
            err
        })
    }

    fn enter(&mut self, phase: BuildPhase) {
        debug!(from = %self.phase, to = %phase, "build phase transition");
        self.phase = phase;
    }

    fn write_spill(&mut self) -> Result<Option<SegmentInfo>> {
        let segment = self.builder.drain();
        if segment.is_empty() {
            return Ok(None);
        }

        let name = self.config.spill_name(self.next_spill);
        self.next_spill += 1;

        let info = write_segment(&self.storage, &name, &segment)?;
        self.stats.segments_flushed += 1;
        info!(
            segment = %info.name,
            terms = info.records,
            bytes = info.bytes,
            "flushed segment"
        );
        Ok(Some(info))
    }

    /// FLUSHING then MERGING: write the spill, wait for the previous merge,
    /// hand the spill to a new background merge, and resume BUILDING.
    fn flush(&mut self) -> Result<()> {
        self.enter(BuildPhase::Flushing);
        let Some(spill) = self.write_spill()? else {
            self.enter(BuildPhase::Building);
            return Ok(());
        };

        self.enter(BuildPhase::Merging);
        self.join_in_flight()?;

        match self.cumulative.clone() {
            None => {
                // First segment: it becomes the cumulative file as is.
                let merged = self.config.merged_name(self.generation);
                self.storage.rename_file(&spill.name, &merged)?;
                debug!(spill = %spill.name, cumulative = %merged, "bootstrapped cumulative file");
                self.cumulative = Some(merged);
            }
            Some(older) => {
                self.generation += 1;
                let task = MergeTask::new(
                    older,
                    spill.name,
                    self.config.merged_name(self.generation),
                );
                self.in_flight = Some(MergeWorker::spawn(Arc::clone(&self.storage), task)?);
            }
        }

        self.enter(BuildPhase::Building);
        Ok(())
    }

    fn join_in_flight(&mut self) -> Result<Option<MergeStats>> {
        let Some(worker) = self.in_flight.take() else {
            return Ok(None);
        };

        let stats = worker.join()?;
        self.stats.merges_run += 1;
        self.cumulative = Some(stats.output.clone());
        Ok(Some(stats))
    }

    fn close(&mut self) -> Result<()> {
        self.enter(BuildPhase::Closing);
        let final_spill = self.write_spill()?;

        self.enter(BuildPhase::Merging);
        self.join_in_flight()?;

        self.enter(BuildPhase::FinalMerge);
        let final_file = match (self.cumulative.take(), final_spill) {
            (Some(older), Some(spill)) => {
                self.generation += 1;
                let task = MergeTask::new(
                    older,
                    spill.name,
                    self.config.merged_name(self.generation),
                );
                let stats = MergeEngine::new(Arc::clone(&self.storage)).merge(&task)?;
                self.storage.delete_file(&task.older)?;
                self.storage.delete_file(&task.newer)?;
                self.stats.merges_run += 1;
                stats.output
            }
            (Some(older), None) => older,
            (None, Some(spill)) => spill.name,
            (None, None) => {
                let name = self.config.merged_name(self.generation);
                SegmentWriter::create(&self.storage, &name)?.finish()?;
                name
            }
        };
        self.stats.data_bytes = self.storage.file_size(&final_file)?;

        self.enter(BuildPhase::DictionaryBuild);
        let staged_dictionary = self.config.staging_name(&self.config.dictionary_file);
        self.stats.dictionary = match self.build_dictionary(&final_file, &staged_dictionary) {
            Ok(stats) => stats,
            Err(e) => {
                if let Err(cleanup) = self.storage.delete_file(&staged_dictionary) {
                    warn!(file = %staged_dictionary, error = %cleanup, "could not remove partial dictionary");
                }
                return Err(e);
            }
        };

        self.commit(final_file, staged_dictionary)?;

        self.enter(BuildPhase::Ready);
        info!(
            segments = self.stats.segments_flushed,
            merges = self.stats.merges_run,
            terms = self.stats.dictionary.entries,
            "index ready"
        );
        Ok(())
    }

    /// DICTIONARY_BUILD: one sequential scan of the merged file, filling a
    /// table under a staging name. Record offsets do not change when the
    /// merged file is later renamed.
    fn build_dictionary(&self, source: &str, table: &str) -> Result<DictionaryStats> {
        let mut dictionary = DictionaryWriter::create(&self.storage, table, self.config.table_size)?;

        let mut cursor = SegmentCursor::open(&self.storage, source)?;
        while let Some((offset, record)) = cursor.next_record()? {
            dictionary.put(&record.term, offset)?;
        }

        let stats = dictionary.finish()?;
        info!(
            entries = stats.entries,
            collisions = stats.collisions,
            max_probe = stats.max_probe_length,
            load_factor = stats.load_factor(),
            "dictionary built"
        );
        Ok(stats)
    }

    /// Rename every finished artifact to its canonical name.
    fn commit(&mut self, data: String, dictionary: String) -> Result<()> {
        let mut renames = vec![
            (data, self.config.data_file.clone()),
            (dictionary, self.config.dictionary_file.clone()),
        ];
        renames.append(&mut self.staged);

        for (from, to) in &renames {
            if self.storage.file_exists(to) {
                warn!(file = %to, "replacing existing file");
                self.storage.delete_file(to)?;
            }
            self.storage.rename_file(from, to)?;
            debug!(from = %from, to = %to, "committed build artifact");
        }

        info!(
            data = %self.config.data_file,
            bytes = self.stats.data_bytes,
            files = renames.len(),
            "build committed"
        );
        Ok(())
    }
}

impl Drop for BuildOrchestrator {
    fn drop(&mut self) {
        if let Some(worker) = self.in_flight.take() {
            if let Err(e) = worker.join() {
                warn!(error = %e, "background merge failed during shutdown");
            }
        }
    }
}
