//! Configuration for building and opening a disk-resident index.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PilumError, Result};

/// Suffix of files written by a build that has not committed yet.
pub const STAGING_SUFFIX: &str = ".tmp";

/// Configuration for a disk-resident inverted index.
///
/// These settings control when the in-memory segment is flushed, how large
/// the on-disk dictionary table is, and which file names the index uses
/// inside its storage.
///
/// # Example
///
/// ```
/// use pilum::config::IndexConfig;
///
/// let config = IndexConfig {
///     segment_term_limit: 50_000,
///     table_size: 100_003,
///     ..IndexConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Number of distinct terms the in-memory segment may hold.
    ///
    /// Reaching this count triggers a flush to a spill file.
    pub segment_term_limit: usize,

    /// Number of 8-byte slots in the on-disk dictionary.
    ///
    /// The table is never resized, so it must be sized with headroom over the
    /// expected vocabulary.
    pub table_size: u64,

    /// Name of the canonical data file.
    pub data_file: String,

    /// Name of the dictionary table file.
    pub dictionary_file: String,

    /// Name of the per-document metadata file.
    pub doc_info_file: String,

    /// Prefix of flushed spill segment files.
    pub spill_prefix: String,

    /// Prefix of cumulative merge files.
    pub merged_prefix: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            segment_term_limit: 1_000_000,
            table_size: 3_499_999,
            data_file: "data".to_string(),
            dictionary_file: "dictionary".to_string(),
            doc_info_file: "docInfo".to_string(),
            spill_prefix: "spill".to_string(),
            merged_prefix: "merged".to_string(),
        }
    }
}

impl IndexConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: IndexConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can drive a build.
    pub fn validate(&self) -> Result<()> {
        if self.segment_term_limit == 0 {
            return Err(PilumError::invalid_config(
                "segment_term_limit must be greater than 0",
            ));
        }

        if self.table_size == 0 {
            return Err(PilumError::invalid_config(
                "table_size must be greater than 0",
            ));
        }

        let names = [
            ("data_file", &self.data_file),
            ("dictionary_file", &self.dictionary_file),
            ("doc_info_file", &self.doc_info_file),
            ("spill_prefix", &self.spill_prefix),
            ("merged_prefix", &self.merged_prefix),
        ];

        for (field, name) in names.iter() {
            if name.is_empty() {
                return Err(PilumError::invalid_config(format!(
                    "{field} must not be empty"
                )));
            }
        }

        for (i, (field_a, name_a)) in names.iter().enumerate() {
            for (field_b, name_b) in names.iter().skip(i + 1) {
                if name_a == name_b {
                    return Err(PilumError::invalid_config(format!(
                        "{field_a} and {field_b} both use \"{name_a}\""
                    )));
                }
            }
        }

        Ok(())
    }

    /// File name of the `sequence`-th spill segment.
    pub fn spill_name(&self, sequence: u64) -> String {
        format!("{}_{:06}", self.spill_prefix, sequence)
    }

    /// File name of the cumulative merge file of the given generation.
    pub fn merged_name(&self, generation: u64) -> String {
        format!("{}_{:06}", self.merged_prefix, generation)
    }

    /// Name a new artifact is written under until the build commits it as
    /// `name`.
    pub fn staging_name(&self, name: &str) -> String {
        format!("{name}{STAGING_SUFFIX}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IndexConfig::default();

        assert_eq!(config.segment_term_limit, 1_000_000);
        assert_eq!(config.table_size, 3_499_999);
        assert_eq!(config.data_file, "data");
        assert_eq!(config.dictionary_file, "dictionary");
        assert_eq!(config.doc_info_file, "docInfo");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_names() {
        let config = IndexConfig::default();

        assert_eq!(config.spill_name(3), "spill_000003");
        assert_eq!(config.merged_name(12), "merged_000012");
        assert_eq!(config.staging_name("dictionary"), "dictionary.tmp");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = IndexConfig {
            segment_term_limit: 0,
            ..IndexConfig::default()
        };
        assert!(config.validate().is_err());

        let config = IndexConfig {
            table_size: 0,
            ..IndexConfig::default()
        };
        assert!(config.validate().is_err());

        let config = IndexConfig {
            data_file: String::new(),
            ..IndexConfig::default()
        };
        assert!(config.validate().is_err());

        let config = IndexConfig {
            dictionary_file: "data".to_string(),
            ..IndexConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("data_file and dictionary_file"));
    }

    #[test]
    fn test_from_json_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"segment_term_limit": 2, "table_size": 17}"#).unwrap();

        let config = IndexConfig::from_json_file(&path).unwrap();
        assert_eq!(config.segment_term_limit, 2);
        assert_eq!(config.table_size, 17);
        assert_eq!(config.data_file, "data");
    }
}
