//! Error handling types and utilities.

use thiserror::Error;

/// A specialized Result type for application glue (file loading, config, server startup).
///
/// This is an alias for `anyhow::Result` with context added via `.context()` and
/// `.with_context()` methods throughout the codebase.
pub type Result<T> = anyhow::Result<T>;

/// Fatal outcomes of building or querying an index.
///
/// Per-record problems are not errors; they are reported through
/// [`crate::corpus::RecordIssue`] in the build summary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// The payload could not be read as a sequence of records at all.
    #[error("invalid corpus: {0}")]
    InvalidCorpus(String),
    /// The build was cancelled before it could be published.
    #[error("index build was cancelled")]
    BuildCancelled,
    /// The caller cancelled its own query.
    #[error("query was cancelled")]
    QueryCancelled,
    /// Another build currently holds the writer slot.
    #[error("an index build is already in progress")]
    BuildInProgress,
}
