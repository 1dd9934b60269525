//! On-disk open-addressed hash dictionary.
//!
//! The dictionary file is a flat array of `table_size` big-endian `u64`
//! slots. A term's home slot is `crc32(term) mod table_size`; collisions are
//! resolved by linear probing with wrap-around. A zero slot is empty, any
//! other value is the byte offset of the term's record in the canonical data
//! file. Records never start at offset 0 because data files begin with a
//! header.
//!
//! The table is written once by [`DictionaryWriter`] while streaming the data
//! file, then served read-only by [`DiskDictionary`].

use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PilumError, Result};
use crate::postings::PostingsList;
use crate::segment::SegmentReader;
use crate::storage::{Storage, StorageFile, StorageOutput};

/// Width of a dictionary slot in bytes.
pub const SLOT_WIDTH: u64 = 8;

/// Home slot index of a term.
pub fn home_slot(term: &str, table_size: u64) -> u64 {
    crc32fast::hash(term.as_bytes()) as u64 % table_size
}

/// Statistics gathered while filling the table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryStats {
    /// Number of slots in the table.
    pub table_size: u64,
    /// Number of terms stored.
    pub entries: u64,
    /// Entries that could not take their home slot.
    pub collisions: u64,
    /// Longest probe sequence, counted in slots visited.
    pub max_probe_length: u64,
}

impl DictionaryStats {
    /// Fraction of slots in use.
    pub fn load_factor(&self) -> f64 {
        if self.table_size == 0 {
            0.0
        } else {
            self.entries as f64 / self.table_size as f64
        }
    }
}

/// Builds the dictionary table.
#[derive(Debug)]
pub struct DictionaryWriter {
    file: Box<dyn StorageFile>,
    stats: DictionaryStats,
}

impl DictionaryWriter {
    /// Create `name` as a zeroed table of `table_size` slots.
    pub fn create(storage: &Arc<dyn Storage>, name: &str, table_size: u64) -> Result<Self> {
        if table_size == 0 {
            return Err(PilumError::invalid_argument(
                "dictionary table_size must be greater than 0",
            ));
        }

        let mut output = storage.create_output(name)?;
        let zeros = vec![0u8; 64 * 1024];
        let mut remaining = table_size * SLOT_WIDTH;
        while remaining > 0 {
            let chunk = remaining.min(zeros.len() as u64) as usize;
            output.write_all(&zeros[..chunk])?;
            remaining -= chunk as u64;
        }
        output.close()?;

        debug!(file = name, table_size, "created empty dictionary table");

        Ok(DictionaryWriter {
            file: storage.open_update(name)?,
            stats: DictionaryStats {
                table_size,
                ..DictionaryStats::default()
            },
        })
    }

    /// Store `offset` for `term` in the first empty slot of its probe
    /// sequence.
    pub fn put(&mut self, term: &str, offset: u64) -> Result<()> {
        if offset == 0 {
            return Err(PilumError::invalid_argument(
                "offset 0 is reserved for empty slots",
            ));
        }

        let table_size = self.stats.table_size;
        let mut slot = home_slot(term, table_size);

        for probe in 1..=table_size {
            let position = slot * SLOT_WIDTH;
            self.file.seek(SeekFrom::Start(position))?;
            if self.file.read_u64::<BigEndian>()? == 0 {
                self.file.seek(SeekFrom::Start(position))?;
                self.file.write_u64::<BigEndian>(offset)?;

                self.stats.entries += 1;
                if probe > 1 {
                    self.stats.collisions += 1;
                }
                self.stats.max_probe_length = self.stats.max_probe_length.max(probe);
                return Ok(());
            }
            slot = (slot + 1) % table_size;
        }

        Err(PilumError::TableFull { table_size })
    }

    pub fn stats(&self) -> &DictionaryStats {
        &self.stats
    }

    /// Flush the table to storage.
    pub fn finish(mut self) -> Result<DictionaryStats> {
        self.file.flush()?;
        self.file.close()?;
        Ok(self.stats)
    }
}

/// Read-only view of a built dictionary and its data file.
///
/// Every lookup opens its own file handles, so one dictionary can be shared
/// by any number of reader threads without locking.
#[derive(Debug, Clone)]
pub struct DiskDictionary {
    storage: Arc<dyn Storage>,
    dictionary_file: String,
    data_file: String,
    table_size: u64,
}

impl DiskDictionary {
    /// Open the table `dictionary_file` serving records from `data_file`.
    pub fn open(storage: Arc<dyn Storage>, dictionary_file: &str, data_file: &str) -> Result<Self> {
        let bytes = storage.file_size(dictionary_file)?;
        if bytes == 0 || bytes % SLOT_WIDTH != 0 {
            return Err(PilumError::index(format!(
                "dictionary {dictionary_file} has invalid size {bytes}"
            )));
        }
        if !storage.file_exists(data_file) {
            return Err(PilumError::index(format!(
                "data file {data_file} does not exist"
            )));
        }

        Ok(DiskDictionary {
            storage,
            dictionary_file: dictionary_file.to_string(),
            data_file: data_file.to_string(),
            table_size: bytes / SLOT_WIDTH,
        })
    }

    pub fn table_size(&self) -> u64 {
        self.table_size
    }

    /// Data file offset of the record for `term`.
    pub fn get_offset(&self, term: &str) -> Result<Option<u64>> {
        Ok(self.lookup(term)?.map(|(offset, _)| offset))
    }

    /// Postings of `term`, or `None` when the term is not indexed.
    pub fn get(&self, term: &str) -> Result<Option<PostingsList>> {
        Ok(self.lookup(term)?.map(|(_, postings)| postings))
    }

    fn lookup(&self, term: &str) -> Result<Option<(u64, PostingsList)>> {
        let mut table = self.storage.open_input(&self.dictionary_file)?;
        let mut data = SegmentReader::open(&self.storage, &self.data_file)?;
        let mut slot = home_slot(term, self.table_size);

        for _ in 0..self.table_size {
            let offset = read_slot(&mut table, slot)?;
            if offset == 0 {
                return Ok(None);
            }

            let record = data.read_at(offset)?.ok_or_else(|| {
                PilumError::malformed(format!(
                    "slot {slot} points past the end of {}",
                    self.data_file
                ))
            })?;
            if record.term == term {
                return Ok(Some((offset, record.postings)));
            }

            slot = (slot + 1) % self.table_size;
        }

        Ok(None)
    }
}

fn read_slot<R: Read + Seek>(table: &mut R, slot: u64) -> Result<u64> {
    table.seek(SeekFrom::Start(slot * SLOT_WIDTH))?;
    Ok(table.read_u64::<BigEndian>()?)
}
