//! # Pilum
//!
//! A disk-resident inverted index built in bounded memory.
//!
//! ## Features
//!
//! - Segment-at-a-time builds with a fixed in-memory term budget
//! - Background merging of flushed segments into one sorted data file
//! - Open-addressing on-disk dictionary for single-seek term lookups
//! - Positional postings with intersection, union and phrase queries
//! - Pluggable storage backends

pub mod build;
pub mod cli;
pub mod config;
pub mod dictionary;
pub mod doc_info;
pub mod error;
pub mod index;
pub mod merge;
pub mod postings;
pub mod search;
pub mod segment;
pub mod storage;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
