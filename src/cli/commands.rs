//! Command implementations for the Pilum CLI.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use tracing::{debug, info};

use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::IndexConfig;
use crate::error::{PilumError, Result};
use crate::index::{Index, IndexReader, PersistentIndex};
use crate::search::{QueryType, SearchHit, Searcher};
use crate::storage::{FileStorage, Storage, StorageConfig};

/// Effective configuration of a built index, stored next to its files.
pub const CONFIG_FILE: &str = "pilum.json";

/// One line of the build input.
#[derive(Debug, Deserialize)]
struct DocumentLine {
    path: String,
    tokens: Vec<String>,
}

/// Execute a CLI command.
pub fn execute_command(args: PilumArgs) -> Result<()> {
    match &args.command {
        Command::Build(build_args) => build_index(build_args.clone(), &args),
        Command::Lookup(lookup_args) => lookup_term(lookup_args.clone(), &args),
        Command::Search(search_args) => search_index(search_args.clone(), &args),
        Command::Stats(stats_args) => show_stats(stats_args.clone(), &args),
    }
}

/// Build an index from a JSON Lines document file.
fn build_index(args: BuildArgs, cli_args: &PilumArgs) -> Result<()> {
    let start = Instant::now();

    let mut config = match &args.config {
        Some(path) => IndexConfig::from_json_file(path)?,
        None => IndexConfig::default(),
    };
    if let Some(term_limit) = args.term_limit {
        config.segment_term_limit = term_limit;
    }
    if let Some(table_size) = args.table_size {
        config.table_size = table_size;
    }
    config.validate()?;

    let storage: Arc<dyn Storage> =
        Arc::new(FileStorage::new(&args.index_path, StorageConfig::default())?);
    let mut index = PersistentIndex::create(Arc::clone(&storage), config.clone())?;

    let input = File::open(&args.documents).map_err(|e| {
        PilumError::invalid_argument(format!("{}: {e}", args.documents.display()))
    })?;

    for (line_no, line) in BufReader::new(input).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let document: DocumentLine = serde_json::from_str(&line).map_err(|e| {
            PilumError::invalid_argument(format!(
                "{} line {}: {e}",
                args.documents.display(),
                line_no + 1
            ))
        })?;

        let doc_id = index.add_document(&document.path, document.tokens.len() as u64)?;
        for (offset, token) in document.tokens.iter().enumerate() {
            let offset = u32::try_from(offset).map_err(|_| {
                PilumError::invalid_argument(format!("{} has too many tokens", document.path))
            })?;
            index.insert(token, doc_id, offset)?;
        }
        debug!(doc_id, path = %document.path, tokens = document.tokens.len(), "indexed document");
    }

    index.cleanup()?;

    std::fs::write(
        args.index_path.join(CONFIG_FILE),
        serde_json::to_string_pretty(&config)?,
    )?;

    let stats = index.stats().cloned().unwrap_or_default();
    let duration_ms = start.elapsed().as_millis() as u64;
    info!(
        documents = stats.documents,
        terms = stats.dictionary.entries,
        duration_ms,
        "build finished"
    );

    let result = BuildResult {
        path: args.index_path.display().to_string(),
        documents: stats.documents,
        occurrences: stats.occurrences,
        segments_flushed: stats.segments_flushed,
        merges_run: stats.merges_run,
        data_bytes: stats.data_bytes,
        dictionary: stats.dictionary,
        duration_ms,
    };

    output_result("Index built", &result, cli_args)
}

/// Print the postings of a single term.
fn lookup_term(args: LookupArgs, cli_args: &PilumArgs) -> Result<()> {
    let reader = open_reader(&args.index_path)?;

    let postings = match reader.get_postings(&args.term)? {
        Some(postings) => postings
            .iter()
            .map(|posting| SearchHit {
                doc_id: posting.doc_id,
                path: reader.document(posting.doc_id).map(|d| d.path.clone()),
                offsets: posting.offsets().to_vec(),
            })
            .collect(),
        None => Vec::new(),
    };

    let result = LookupResult {
        term: args.term.clone(),
        found: !postings.is_empty(),
        postings,
    };

    let message = if result.found {
        format!("Postings for {:?}", args.term)
    } else {
        format!("Term {:?} is not indexed", args.term)
    };
    output_hits(&message, &result, &result.postings, cli_args)
}

/// Run an intersection, phrase or union query.
fn search_index(args: SearchArgs, cli_args: &PilumArgs) -> Result<()> {
    let start = Instant::now();
    let reader = open_reader(&args.index_path)?;
    let query_type = QueryType::from(args.mode);

    let mut hits = Searcher::new(&reader).search_hits(&args.terms, query_type)?;
    let total_hits = hits.len() as u64;
    if let Some(limit) = args.limit {
        hits.truncate(limit);
    }

    let result = SearchResults {
        query_type: query_type.to_string(),
        terms: args.terms.clone(),
        hits,
        total_hits,
        duration_ms: start.elapsed().as_millis() as u64,
    };

    let message = format!("{} hit(s) for {query_type} query", result.total_hits);
    output_hits(&message, &result, &result.hits, cli_args)
}

/// Show index statistics.
fn show_stats(args: StatsArgs, cli_args: &PilumArgs) -> Result<()> {
    let reader = open_reader(&args.index_path)?;
    let config = reader.config();
    let storage = FileStorage::new(&args.index_path, StorageConfig::default())?;

    let result = IndexStats {
        total_documents: reader.doc_count() as u64,
        total_tokens: reader.documents().total_length(),
        data_bytes: storage.file_size(&config.data_file)?,
        dictionary_slots: reader.dictionary().table_size(),
        dictionary_bytes: storage.file_size(&config.dictionary_file)?,
    };

    output_result("Index statistics", &result, cli_args)
}

/// Open a built index, using the configuration stored with it when present.
fn open_reader(index_path: &Path) -> Result<IndexReader> {
    if !index_path.is_dir() {
        return Err(PilumError::invalid_argument(format!(
            "index directory not found: {}",
            index_path.display()
        )));
    }

    let config_path = index_path.join(CONFIG_FILE);
    let config = if config_path.exists() {
        IndexConfig::from_json_file(&config_path)?
    } else {
        IndexConfig::default()
    };

    let storage: Arc<dyn Storage> =
        Arc::new(FileStorage::new(index_path, StorageConfig::default())?);
    IndexReader::open(storage, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_build_then_read_commands() {
        let dir = TempDir::new().unwrap();
        let index_path = dir.path().join("index");
        let docs_path = dir.path().join("docs.jsonl");

        let mut docs = File::create(&docs_path).unwrap();
        writeln!(docs, r#"{{"path": "a.txt", "tokens": ["the", "cat", "sat"]}}"#).unwrap();
        writeln!(docs).unwrap();
        writeln!(docs, r#"{{"path": "b.txt", "tokens": ["the", "dog"]}}"#).unwrap();
        drop(docs);

        let index_arg = index_path.to_str().unwrap();
        let args = PilumArgs::try_parse_from([
            "pilum",
            "-q",
            "build",
            index_arg,
            docs_path.to_str().unwrap(),
            "--term-limit",
            "2",
            "--table-size",
            "31",
        ])
        .unwrap();
        execute_command(args).unwrap();

        assert!(index_path.join(CONFIG_FILE).exists());
        let stored = IndexConfig::from_json_file(index_path.join(CONFIG_FILE)).unwrap();
        assert_eq!(stored.table_size, 31);

        let reader = open_reader(&index_path).unwrap();
        assert_eq!(reader.doc_count(), 2);
        assert_eq!(reader.documents().total_length(), 5);
        assert_eq!(
            reader.get_postings("the").unwrap().unwrap().doc_ids(),
            vec![0, 1]
        );

        for command in [
            vec!["pilum", "-q", "lookup", index_arg, "cat"],
            vec!["pilum", "-q", "search", index_arg, "the", "cat", "-m", "phrase"],
            vec!["pilum", "-q", "--format", "json", "stats", index_arg],
        ] {
            execute_command(PilumArgs::try_parse_from(command).unwrap()).unwrap();
        }
    }

    #[test]
    fn test_build_reports_bad_line() {
        let dir = TempDir::new().unwrap();
        let docs_path = dir.path().join("docs.jsonl");
        std::fs::write(&docs_path, "{\"path\": \"a.txt\", \"tokens\": []}\nnot json\n").unwrap();

        let args = PilumArgs::try_parse_from([
            "pilum",
            "-q",
            "build",
            dir.path().join("index").to_str().unwrap(),
            docs_path.to_str().unwrap(),
        ])
        .unwrap();

        let err = execute_command(args).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_missing_index_directory() {
        let dir = TempDir::new().unwrap();
        assert!(open_reader(&dir.path().join("nope")).is_err());
    }
}
