//! Boolean and phrase search over any [`Index`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PilumError, Result};
use crate::index::Index;
use crate::postings::algebra::{intersect_all, phrase, union_all};
use crate::postings::{DocId, PostingsList};

/// How the postings of the query terms are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    /// Documents containing every term.
    #[default]
    Intersection,
    /// Documents containing the terms at consecutive offsets.
    Phrase,
    /// Documents containing any term.
    Union,
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryType::Intersection => write!(f, "intersection"),
            QueryType::Phrase => write!(f, "phrase"),
            QueryType::Union => write!(f, "union"),
        }
    }
}

impl FromStr for QueryType {
    type Err = PilumError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "intersection" | "and" => Ok(QueryType::Intersection),
            "phrase" => Ok(QueryType::Phrase),
            "union" | "or" => Ok(QueryType::Union),
            other => Err(PilumError::query(format!("unknown query type: {other}"))),
        }
    }
}

/// A matching document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    /// Path from the doc-info table, when known.
    pub path: Option<String>,
    /// Offsets of the first term, or phrase start offsets for phrase queries.
    pub offsets: Vec<u32>,
}

/// Runs queries against an index.
#[derive(Debug)]
pub struct Searcher<'a, I: Index + ?Sized> {
    index: &'a I,
}

impl<'a, I: Index + ?Sized> Searcher<'a, I> {
    pub fn new(index: &'a I) -> Self {
        Searcher { index }
    }

    /// Combine the postings of `terms` according to `query_type`.
    ///
    /// A term that is not indexed empties intersection and phrase results
    /// and is skipped by union.
    pub fn search<S: AsRef<str>>(&self, terms: &[S], query_type: QueryType) -> Result<PostingsList> {
        if terms.is_empty() {
            return Err(PilumError::query("query has no terms"));
        }

        let mut lists = Vec::with_capacity(terms.len());
        for term in terms {
            let term = term.as_ref();
            match self.index.get_postings(term)? {
                Some(postings) => lists.push(postings),
                None if query_type == QueryType::Union => {
                    debug!(term, "term not indexed, skipped");
                }
                None => {
                    debug!(term, %query_type, "term not indexed, empty result");
                    return Ok(PostingsList::new());
                }
            }
        }

        let refs: Vec<&PostingsList> = lists.iter().collect();
        let result = match query_type {
            QueryType::Intersection => intersect_all(&refs),
            QueryType::Phrase => phrase(&refs),
            QueryType::Union => union_all(&refs),
        };

        debug!(terms = terms.len(), %query_type, hits = result.len(), "search finished");
        Ok(result)
    }

    /// Like [`Searcher::search`], with document paths attached.
    pub fn search_hits<S: AsRef<str>>(&self, terms: &[S], query_type: QueryType) -> Result<Vec<SearchHit>> {
        let result = self.search(terms, query_type)?;

        Ok(result
            .iter()
            .map(|posting| SearchHit {
                doc_id: posting.doc_id,
                path: self.index.document(posting.doc_id).map(|d| d.path.clone()),
                offsets: posting.offsets().to_vec(),
            })
            .collect())
    }
}
