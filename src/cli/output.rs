//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::cli::args::{OutputFormat, PilumArgs};
use crate::dictionary::DictionaryStats;
use crate::error::Result;
use crate::search::SearchHit;

/// Result structure for an index build.
#[derive(Debug, Serialize, Deserialize)]
pub struct BuildResult {
    pub path: String,
    pub documents: u64,
    pub occurrences: u64,
    pub segments_flushed: u64,
    pub merges_run: u64,
    pub data_bytes: u64,
    pub dictionary: DictionaryStats,
    pub duration_ms: u64,
}

/// Result structure for a term lookup.
#[derive(Debug, Serialize, Deserialize)]
pub struct LookupResult {
    pub term: String,
    pub found: bool,
    pub postings: Vec<SearchHit>,
}

/// Result structure for search operations.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResults {
    pub query_type: String,
    pub terms: Vec<String>,
    pub hits: Vec<SearchHit>,
    pub total_hits: u64,
    pub duration_ms: u64,
}

/// Index statistics.
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_documents: u64,
    pub total_tokens: u64,
    pub data_bytes: u64,
    pub dictionary_slots: u64,
    pub dictionary_bytes: u64,
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &PilumArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output search or lookup hits in the specified format.
pub fn output_hits<T: Serialize>(
    message: &str,
    result: &T,
    hits: &[SearchHit],
    args: &PilumArgs,
) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => {
            if args.verbosity() > 0 {
                println!("{message}");
                println!();
            }
            for hit in hits {
                println!("{}", format_hit(hit));
            }
            Ok(())
        }
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in human-readable format.
fn output_human<T: Serialize>(message: &str, result: &T, args: &PilumArgs) -> Result<()> {
    if args.verbosity() > 0 {
        println!("{message}");
        println!();
    }

    let value = serde_json::to_value(result)?;
    output_generic_human(&value, "");
    Ok(())
}

/// Output generic data in human format, nesting objects by indentation.
fn output_generic_human(value: &serde_json::Value, indent: &str) {
    match value {
        serde_json::Value::Object(obj) => {
            for (key, val) in obj {
                if val.is_object() {
                    println!("{indent}{key}:");
                    output_generic_human(val, &format!("{indent}  "));
                } else if key.ends_with("bytes") && val.is_u64() {
                    println!("{indent}{key}: {}", format_bytes(val.as_u64().unwrap_or(0)));
                } else {
                    println!("{indent}{key}: {}", format_value(val));
                }
            }
        }
        _ => println!("{indent}{}", format_value(value)),
    }
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &PilumArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}

/// One line per hit: doc id, path and offsets.
pub fn format_hit(hit: &SearchHit) -> String {
    let offsets: Vec<String> = hit.offsets.iter().map(|o| o.to_string()).collect();
    format!(
        "{}\t{}\t[{}]",
        hit.doc_id,
        hit.path.as_deref().unwrap_or("-"),
        offsets.join(", ")
    )
}

/// Format a JSON value for display.
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            format!("[{}]", items.join(", "))
        }
        serde_json::Value::Object(_) => "{...}".to_string(),
        serde_json::Value::Null => "null".to_string(),
    }
}

/// Format bytes in human-readable format.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1048576), "1.0 MB");
        assert_eq!(format_bytes(1073741824), "1.0 GB");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(
            format_value(&serde_json::Value::String("test".to_string())),
            "test"
        );
        assert_eq!(
            format_value(&serde_json::Value::Number(serde_json::Number::from(42))),
            "42"
        );
        assert_eq!(format_value(&serde_json::json!([1, 2])), "[1, 2]");
        assert_eq!(format_value(&serde_json::Value::Null), "null");
    }

    #[test]
    fn test_format_hit() {
        let hit = SearchHit {
            doc_id: 3,
            path: Some("docs/a.txt".to_string()),
            offsets: vec![1, 4],
        };
        assert_eq!(format_hit(&hit), "3\tdocs/a.txt\t[1, 4]");

        let hit = SearchHit {
            doc_id: 0,
            path: None,
            offsets: vec![],
        };
        assert_eq!(format_hit(&hit), "0\t-\t[]");
    }
}
