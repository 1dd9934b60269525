//! Error types for the Pilum library.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`PilumError`] enum. A lookup that finds no postings for a term is not an
//! error: it is reported as `Ok(None)`.
//!
//! # Examples
//!
//! ```
//! use pilum::error::{PilumError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(PilumError::invalid_argument("Invalid input"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

use crate::build::BuildPhase;

/// The main error type for Pilum operations.
#[derive(Error, Debug)]
pub enum PilumError {
    /// I/O errors on any file handle.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A record whose length prefix or payload cannot be decoded.
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// The on-disk dictionary has no empty slot left.
    #[error("Dictionary table is full ({table_size} slots probed)")]
    TableFull { table_size: u64 },

    /// Index-related errors
    #[error("Index error: {0}")]
    Index(String),

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Query-related errors
    #[error("Query error: {0}")]
    Query(String),

    /// Invalid operation for the current state.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Thread join errors
    #[error("Thread join error: {0}")]
    ThreadJoinError(String),

    /// A build step failed; the index was not promoted to READY.
    #[error("Build failed during {phase}: {source}")]
    Build {
        phase: BuildPhase,
        #[source]
        source: Box<PilumError>,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with PilumError.
pub type Result<T> = std::result::Result<T, PilumError>;

impl PilumError {
    /// Create a new malformed record error.
    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        PilumError::MalformedRecord(msg.into())
    }

    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        PilumError::Index(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        PilumError::Storage(msg.into())
    }

    /// Create a new query error.
    pub fn query<S: Into<String>>(msg: S) -> Self {
        PilumError::Query(msg.into())
    }

    /// Create a new invalid operation error.
    pub fn invalid_operation<S: Into<String>>(msg: S) -> Self {
        PilumError::InvalidOperation(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        PilumError::Other(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        PilumError::Other(format!("Invalid configuration: {}", msg.into()))
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        PilumError::Other(format!("Invalid argument: {}", msg.into()))
    }

    /// Wrap an error with the build phase it happened in.
    ///
    /// Errors that already carry a phase are returned unchanged, so the
    /// innermost phase is the one reported.
    pub fn in_phase(self, phase: BuildPhase) -> Self {
        match self {
            err @ PilumError::Build { .. } => err,
            other => PilumError::Build {
                phase,
                source: Box::new(other),
            },
        }
    }

    /// The build phase this error was raised in, if any.
    pub fn phase(&self) -> Option<BuildPhase> {
        match self {
            PilumError::Build { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// Whether this error means the reader ran into undecodable data.
    pub fn is_malformed(&self) -> bool {
        matches!(self, PilumError::MalformedRecord(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = PilumError::index("Test index error");
        assert_eq!(error.to_string(), "Index error: Test index error");

        let error = PilumError::malformed("bad prefix");
        assert_eq!(error.to_string(), "Malformed record: bad prefix");

        let error = PilumError::TableFull { table_size: 7 };
        assert_eq!(
            error.to_string(),
            "Dictionary table is full (7 slots probed)"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let pilum_error = PilumError::from(io_error);

        match pilum_error {
            PilumError::Io(_) => {} // Expected
            _ => panic!("Expected IO error variant"),
        }
    }

    #[test]
    fn test_in_phase_keeps_innermost_phase() {
        let err = PilumError::TableFull { table_size: 3 }.in_phase(BuildPhase::DictionaryBuild);
        assert_eq!(err.phase(), Some(BuildPhase::DictionaryBuild));
        assert!(err.to_string().starts_with("Build failed during DICTIONARY_BUILD"));

        let rewrapped = err.in_phase(BuildPhase::Flushing);
        assert_eq!(rewrapped.phase(), Some(BuildPhase::DictionaryBuild));
    }
}
