//! Substring and equality search over encrypted registry columns.
//!
//! Encrypted columns are non-deterministic (fresh IVs at every layer), so
//! the same plaintext never produces the same ciphertext twice and the
//! storage layer cannot index or compare these columns at all. The only
//! correct query plan is:
//!
//! 1. fetch every candidate record, restricted only by plaintext predicates
//! 2. decrypt the target field(s) of every candidate in memory
//! 3. apply the match test to the plaintext
//! 4. paginate the *filtered* set
//!
//! This is an inherent O(n) full-decrypt cost per search, not an
//! implementation shortcut: avoiding it would require a deterministic
//! derivation of the plaintext (a blind index) stored alongside the triple,
//! which changes the security posture. [`SearchOutcome::scanned`] surfaces
//! the cost to callers.

use padron_crypto::LayerPipeline;
use padron_fields::{decrypt_record_fields_lossy, Record, UNREADABLE_SENTINEL};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Result type for search operations.
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors from the search adapter.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The query is unusable as given.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

/// How decrypted values are compared against the search term.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchMode {
    /// Normalized substring containment.
    Contains,
    /// Normalized whole-value equality.
    Equals,
}

/// A search over one or more encrypted fields.
///
/// Matching is case-insensitive on trimmed text; accents are significant.
#[derive(Clone, Debug)]
pub struct SearchQuery {
    pub term: String,
    pub fields: Vec<String>,
    pub mode: MatchMode,
    pub offset: usize,
    pub limit: usize,
}

impl SearchQuery {
    /// Substring search over the given fields with default pagination.
    pub fn contains(term: impl Into<String>, fields: &[&str]) -> Self {
        Self {
            term: term.into(),
            fields: fields.iter().map(|f| (*f).to_string()).collect(),
            mode: MatchMode::Contains,
            offset: 0,
            limit: 50,
        }
    }

    /// Equality search over the given fields with default pagination.
    pub fn equals(term: impl Into<String>, fields: &[&str]) -> Self {
        Self {
            mode: MatchMode::Equals,
            ..Self::contains(term, fields)
        }
    }

    /// Sets the page window applied to the filtered result.
    pub fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }
}

/// The filtered, paginated result of one search.
#[derive(Debug)]
pub struct SearchOutcome {
    /// The requested page of matching records, target fields decrypted.
    pub rows: Vec<Record>,
    /// Total matches after filtering — the count pagination applies to,
    /// never the raw candidate count.
    pub total: usize,
    /// Candidate records decrypted to produce this result (the O(n) cost).
    pub scanned: usize,
    /// Records with at least one unreadable target field. These can still
    /// match on their other fields; the sentinel itself never matches.
    pub unreadable: usize,
}

/// Runs a decrypt-and-filter search over the candidate set.
///
/// Candidates are decrypted lossily: a corrupted row degrades to a sentinel
/// and is counted, it does not abort the search. The page window is applied
/// to the filtered matches, so `total` reflects what pagination walks over.
pub fn search(
    pipeline: &LayerPipeline,
    candidates: Vec<Record>,
    query: &SearchQuery,
) -> SearchResult<SearchOutcome> {
    let needle = normalize(&query.term);
    if needle.is_empty() {
        return Err(SearchError::InvalidQuery("empty search term".into()));
    }
    if query.fields.is_empty() {
        return Err(SearchError::InvalidQuery("no fields to search".into()));
    }
    let fields: Vec<&str> = query.fields.iter().map(String::as_str).collect();

    let scanned = candidates.len();
    let mut unreadable = 0;
    let mut matches = Vec::new();

    for mut record in candidates {
        if decrypt_record_fields_lossy(pipeline, &mut record, &fields) > 0 {
            unreadable += 1;
        }
        if record_matches(&record, &fields, &needle, query.mode) {
            matches.push(record);
        }
    }

    let total = matches.len();
    debug!(scanned, total, unreadable, "encrypted search complete");

    let rows = matches
        .into_iter()
        .skip(query.offset)
        .take(query.limit)
        .collect();

    Ok(SearchOutcome {
        rows,
        total,
        scanned,
        unreadable,
    })
}

fn record_matches(record: &Record, fields: &[&str], needle: &str, mode: MatchMode) -> bool {
    fields.iter().any(|field| {
        let value = match record.get(*field).and_then(Value::as_str) {
            Some(value) if value != UNREADABLE_SENTINEL => value,
            _ => return false,
        };
        let haystack = normalize(value);
        match mode {
            MatchMode::Contains => haystack.contains(needle),
            MatchMode::Equals => haystack == needle,
        }
    })
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}
