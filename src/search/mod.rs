//! Full-text search over a documentation corpus.
//!
//! This module provides tokenization, inverted index construction, query parsing,
//! relevance scoring and result assembly for one immutable index snapshot.

// Module declarations
pub(crate) mod index;
pub(crate) mod query;
pub(crate) mod scoring;
pub(crate) mod snippet;
pub(crate) mod suggest;
pub(crate) mod tokenize;

// Public re-exports (used via lib.rs)
pub use index::{
    BuildSummary, Field, FieldWeights, IndexSettings, IndexSnapshot, Posting, PostingsList,
    build_index,
};
pub use query::ParsedQuery;
pub use snippet::make_snippet;
pub use suggest::Suggestion;
pub use tokenize::{Token, terms, tokenize};

use crate::corpus::Category;
use serde::Serialize;

/// Default number of results returned by a query.
pub const DEFAULT_MAX_RESULTS: usize = 20;

/// Default snippet window, in characters.
pub const DEFAULT_SNIPPET_CHARS: usize = 160;

/// Per-query options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Maximum number of ranked results to return
    pub max_results: usize,
    /// Whether a trailing `*` denotes a prefix match
    pub prefix_enabled: bool,
    /// Length of the snippet window in characters (0 disables snippets)
    pub snippet_chars: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            prefix_enabled: true,
            snippet_chars: DEFAULT_SNIPPET_CHARS,
        }
    }
}

impl SearchOptions {
    pub const fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub const fn with_prefix(mut self, prefix_enabled: bool) -> Self {
        self.prefix_enabled = prefix_enabled;
        self
    }
}

/// A ranked, presentable search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub location: String,
    pub page: String,
    pub title: String,
    pub category: Category,
    pub score: f32,
    pub snippet: String,
}
