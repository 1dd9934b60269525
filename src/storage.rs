//! Storage abstraction layer for Pilum.
//!
//! Every index file (spill segments, cumulative merge files, the canonical
//! data file, the dictionary table and the doc-info file) is reached through
//! the [`Storage`] trait. File and memory backends can be swapped without
//! touching the build pipeline.
//!
//! # Example
//!
//! ```
//! use std::io::Write;
//! use pilum::storage::{MemoryStorage, Storage, StorageOutput};
//!
//! # fn main() -> pilum::error::Result<()> {
//! let storage = MemoryStorage::new_default();
//! let mut output = storage.create_output("data")?;
//! output.write_all(b"PILUMSEG")?;
//! output.close()?;
//! assert_eq!(storage.file_size("data")?, 8);
//! # Ok(())
//! # }
//! ```

pub mod file;
pub mod memory;
pub mod traits;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use traits::*;
