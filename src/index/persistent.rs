//! Disk-resident index: bounded-memory build, then dictionary lookups.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::build::{BuildOrchestrator, BuildPhase, BuildStats};
use crate::config::IndexConfig;
use crate::dictionary::DiskDictionary;
use crate::doc_info::{DocumentInfo, DocumentTable};
use crate::error::{PilumError, Result};
use crate::index::Index;
use crate::postings::{DocId, PostingsList};
use crate::storage::Storage;

/// Read-only view of a READY index: dictionary, data file and doc-info.
///
/// Lookups open their own file handles, so a reader may be shared across
/// threads freely.
#[derive(Debug, Clone)]
pub struct IndexReader {
    dictionary: DiskDictionary,
    documents: DocumentTable,
    config: IndexConfig,
}

impl IndexReader {
    /// Open an index built earlier in `storage`.
    pub fn open(storage: Arc<dyn Storage>, config: IndexConfig) -> Result<Self> {
        config.validate()?;

        let documents = if storage.file_exists(&config.doc_info_file) {
            DocumentTable::load(&storage, &config.doc_info_file)?
        } else {
            warn!(file = %config.doc_info_file, "no doc-info file, opening without document metadata");
            DocumentTable::new()
        };

        let dictionary = DiskDictionary::open(storage, &config.dictionary_file, &config.data_file)?;
        debug!(
            table_size = dictionary.table_size(),
            documents = documents.len(),
            "opened index"
        );

        Ok(IndexReader {
            dictionary,
            documents,
            config,
        })
    }

    pub fn dictionary(&self) -> &DiskDictionary {
        &self.dictionary
    }

    pub fn documents(&self) -> &DocumentTable {
        &self.documents
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }
}

impl Index for IndexReader {
    fn insert(&mut self, term: &str, _doc_id: DocId, _offset: u32) -> Result<()> {
        Err(PilumError::invalid_operation(format!(
            "index is read-only, cannot insert {term:?}"
        )))
    }

    fn add_document(&mut self, path: &str, _length: u64) -> Result<DocId> {
        Err(PilumError::invalid_operation(format!(
            "index is read-only, cannot add {path:?}"
        )))
    }

    fn cleanup(&mut self) -> Result<()> {
        Ok(())
    }

    fn get_postings(&self, term: &str) -> Result<Option<PostingsList>> {
        self.dictionary.get(term)
    }

    fn document(&self, doc_id: DocId) -> Option<&DocumentInfo> {
        self.documents.get(doc_id)
    }

    fn doc_count(&self) -> usize {
        self.documents.len()
    }
}

#[derive(Debug)]
enum State {
    Building(Box<BuildOrchestrator>),
    Ready(IndexReader),
    Failed { phase: BuildPhase, reason: String },
}

/// Disk-resident inverted index.
///
/// Starts in the build phase: [`Index::insert`] feeds the bounded-memory
/// pipeline and [`Index::cleanup`] runs the final merge and builds the
/// dictionary. Afterwards the index serves [`Index::get_postings`] from disk.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use pilum::config::IndexConfig;
/// use pilum::index::{Index, PersistentIndex};
/// use pilum::storage::MemoryStorage;
///
/// # fn main() -> pilum::error::Result<()> {
/// let config = IndexConfig { segment_term_limit: 2, table_size: 31, ..IndexConfig::default() };
/// let mut index = PersistentIndex::create(Arc::new(MemoryStorage::new_default()), config)?;
///
/// let doc = index.add_document("a.txt", 2)?;
/// index.insert("cat", doc, 0)?;
/// index.insert("dog", doc, 1)?;
/// index.cleanup()?;
///
/// assert_eq!(index.get_postings("cat")?.unwrap().doc_ids(), vec![0]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct PersistentIndex {
    storage: Arc<dyn Storage>,
    config: IndexConfig,
    documents: DocumentTable,
    state: State,
    stats: Option<BuildStats>,
}

impl PersistentIndex {
    /// Start a fresh build in `storage`.
    ///
    /// An index already in `storage` stays readable until the new build
    /// commits in [`Index::cleanup`].
    pub fn create(storage: Arc<dyn Storage>, config: IndexConfig) -> Result<Self> {
        let build = BuildOrchestrator::new(Arc::clone(&storage), config.clone())?;

        Ok(PersistentIndex {
            storage,
            config,
            documents: DocumentTable::new(),
            state: State::Building(Box::new(build)),
            stats: None,
        })
    }

    /// Open an index built earlier, directly in the READY state.
    pub fn open(storage: Arc<dyn Storage>, config: IndexConfig) -> Result<Self> {
        let reader = IndexReader::open(Arc::clone(&storage), config.clone())?;

        Ok(PersistentIndex {
            storage,
            documents: reader.documents().clone(),
            config,
            state: State::Ready(reader),
            stats: None,
        })
    }

    /// Current phase of the index.
    pub fn phase(&self) -> BuildPhase {
        match &self.state {
            State::Building(build) => build.phase(),
            State::Ready(_) => BuildPhase::Ready,
            State::Failed { phase, .. } => *phase,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    /// Statistics of the build, once `cleanup` has succeeded.
    pub fn stats(&self) -> Option<&BuildStats> {
        self.stats.as_ref()
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// The read-only view, once the index is READY.
    pub fn reader(&self) -> Option<&IndexReader> {
        match &self.state {
            State::Ready(reader) => Some(reader),
            _ => None,
        }
    }

    fn builder(&mut self) -> Result<&mut BuildOrchestrator> {
        match &mut self.state {
            State::Building(build) => Ok(build.as_mut()),
            State::Ready(_) => Err(PilumError::invalid_operation(
                "index is READY; the build phase is over",
            )),
            State::Failed { phase, reason } => Err(PilumError::invalid_operation(format!(
                "index build failed during {phase}: {reason}"
            ))),
        }
    }
}

impl Index for PersistentIndex {
    fn insert(&mut self, term: &str, doc_id: DocId, offset: u32) -> Result<()> {
        self.builder()?.insert(term, doc_id, offset)
    }

    fn add_document(&mut self, path: &str, length: u64) -> Result<DocId> {
        self.builder()?;
        Ok(self.documents.add(path, length))
    }

    fn cleanup(&mut self) -> Result<()> {
        if self.is_ready() {
            return Ok(());
        }

        self.builder()?;
        let staged = self.config.staging_name(&self.config.doc_info_file);
        self.documents
            .write_to(&self.storage, &staged)
            .map_err(|e| e.in_phase(BuildPhase::Closing))?;

        let doc_info_file = self.config.doc_info_file.clone();
        let build = self.builder()?;
        build.stage_file(staged.clone(), doc_info_file)?;

        let mut stats = match build.finish() {
            Ok(stats) => stats,
            Err(e) => {
                if let Err(cleanup) = self.storage.delete_file(&staged) {
                    warn!(file = %staged, error = %cleanup, "could not remove staged doc-info");
                }
                self.state = State::Failed {
                    phase: e.phase().unwrap_or(BuildPhase::Closing),
                    reason: e.to_string(),
                };
                return Err(e);
            }
        };
        stats.documents = self.documents.len() as u64;

        let reader = IndexReader::open(Arc::clone(&self.storage), self.config.clone())?;
        info!(
            documents = stats.documents,
            terms = stats.dictionary.entries,
            "persistent index ready"
        );

        self.state = State::Ready(reader);
        self.stats = Some(stats);
        Ok(())
    }

    fn get_postings(&self, term: &str) -> Result<Option<PostingsList>> {
        match &self.state {
            State::Ready(reader) => reader.get_postings(term),
            _ => Err(PilumError::invalid_operation(
                "postings are served once the index is READY",
            )),
        }
    }

    fn document(&self, doc_id: DocId) -> Option<&DocumentInfo> {
        self.documents.get(doc_id)
    }

    fn doc_count(&self) -> usize {
        self.documents.len()
    }
}
