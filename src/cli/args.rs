//! Command line argument parsing for the Pilum CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::search::QueryType;

/// Pilum - a disk-resident inverted index built in bounded memory
#[derive(Parser, Debug, Clone)]
#[command(name = "pilum")]
#[command(about = "Build and query a disk-resident inverted index")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct PilumArgs {
    /// Verbosity level (repeat for more: -v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl PilumArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n + 1,
            }
        }
    }

    /// Maximum level of log events written to stderr.
    pub fn log_level(&self) -> LevelFilter {
        match self.verbosity() {
            0 => LevelFilter::ERROR,
            1 => LevelFilter::WARN,
            2 => LevelFilter::INFO,
            3 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build an index from tokenized documents
    Build(BuildArgs),

    /// Print the postings of one term
    Lookup(LookupArgs),

    /// Search an index
    Search(SearchArgs),

    /// Show index statistics
    Stats(StatsArgs),
}

/// Arguments for building an index
#[derive(Parser, Debug, Clone)]
pub struct BuildArgs {
    /// Path to the index directory
    #[arg(value_name = "INDEX_DIR")]
    pub index_path: PathBuf,

    /// JSON Lines file, one {"path": ..., "tokens": [...]} object per line
    #[arg(value_name = "DOCUMENTS_JSONL")]
    pub documents: PathBuf,

    /// Distinct terms held in memory before a segment is flushed
    #[arg(long, value_name = "TERMS")]
    pub term_limit: Option<usize>,

    /// Number of dictionary slots
    #[arg(long, value_name = "SLOTS")]
    pub table_size: Option<u64>,

    /// Index configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,
}

/// Arguments for looking up a term
#[derive(Parser, Debug, Clone)]
pub struct LookupArgs {
    /// Path to the index directory
    #[arg(value_name = "INDEX_DIR")]
    pub index_path: PathBuf,

    /// Term to look up
    #[arg(value_name = "TERM")]
    pub term: String,
}

/// Arguments for searching
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    /// Path to the index directory
    #[arg(value_name = "INDEX_DIR")]
    pub index_path: PathBuf,

    /// Query terms, already normalized
    #[arg(value_name = "TERMS", required = true, num_args = 1..)]
    pub terms: Vec<String>,

    /// Search mode
    #[arg(short = 'm', long, default_value = "intersection")]
    pub mode: SearchMode,

    /// Maximum number of results to print
    #[arg(short, long)]
    pub limit: Option<usize>,
}

/// Arguments for index statistics
#[derive(Parser, Debug, Clone)]
pub struct StatsArgs {
    /// Path to the index directory
    #[arg(value_name = "INDEX_DIR")]
    pub index_path: PathBuf,
}

/// Search modes available in CLI
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Documents containing every term
    Intersection,
    /// Documents containing the terms in sequence
    Phrase,
    /// Documents containing any term
    Union,
}

impl From<SearchMode> for QueryType {
    fn from(mode: SearchMode) -> Self {
        match mode {
            SearchMode::Intersection => QueryType::Intersection,
            SearchMode::Phrase => QueryType::Phrase,
            SearchMode::Union => QueryType::Union,
        }
    }
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_args() {
        let args = PilumArgs::try_parse_from([
            "pilum",
            "build",
            "/tmp/index",
            "docs.jsonl",
            "--term-limit",
            "5000",
            "--table-size",
            "10007",
        ])
        .unwrap();

        match args.command {
            Command::Build(build) => {
                assert_eq!(build.index_path, PathBuf::from("/tmp/index"));
                assert_eq!(build.documents, PathBuf::from("docs.jsonl"));
                assert_eq!(build.term_limit, Some(5000));
                assert_eq!(build.table_size, Some(10007));
                assert!(build.config.is_none());
            }
            _ => panic!("Expected build command"),
        }
    }

    #[test]
    fn test_search_args() {
        let args = PilumArgs::try_parse_from([
            "pilum", "search", "/tmp/index", "--mode", "phrase", "the", "cat", "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(args.output_format, OutputFormat::Json);
        match args.command {
            Command::Search(search) => {
                assert_eq!(search.terms, vec!["the", "cat"]);
                assert_eq!(search.mode, SearchMode::Phrase);
                assert_eq!(QueryType::from(search.mode), QueryType::Phrase);
            }
            _ => panic!("Expected search command"),
        }

        assert!(PilumArgs::try_parse_from(["pilum", "search", "/tmp/index"]).is_err());
    }

    #[test]
    fn test_verbosity() {
        let args = PilumArgs::try_parse_from(["pilum", "stats", "/tmp/index"]).unwrap();
        assert_eq!(args.verbosity(), 1);
        assert_eq!(args.log_level(), LevelFilter::WARN);

        let args = PilumArgs::try_parse_from(["pilum", "-vv", "stats", "/tmp/index"]).unwrap();
        assert_eq!(args.log_level(), LevelFilter::DEBUG);

        let args =
            PilumArgs::try_parse_from(["pilum", "-v", "-q", "stats", "/tmp/index"]).unwrap();
        assert_eq!(args.verbosity(), 0);
        assert_eq!(args.log_level(), LevelFilter::ERROR);
    }
}
