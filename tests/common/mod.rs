//! Shared test fixtures and utilities for integration tests.
//!
//! # Available Fixtures
//!
//! - `payload_text`: the sample generator payload in `tests/fixtures/search_index.js`
//! - `loaded_engine`: a `SearchEngine` with the sample payload already published
//! - `payload_dir`: a temp directory holding a copy of the payload on disk

use docsearch_mcp::{RawRecord, SearchEngine, SearchHit, SearchOptions, parse_payload};
use rstest::fixture;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Returns the project root directory (where Cargo.toml lives).
pub fn project_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

/// Path of the sample generator payload.
pub fn payload_path() -> PathBuf {
    project_root().join("tests/fixtures/search_index.js")
}

#[fixture]
#[allow(dead_code)] // Used across different integration test crates
pub fn payload_text() -> String {
    std::fs::read_to_string(payload_path()).expect("Failed to read fixture payload")
}

/// Parsed records of the sample payload.
#[allow(dead_code)] // Used across different integration test crates
pub fn payload_records() -> Vec<RawRecord> {
    parse_payload(&payload_text()).expect("Fixture payload should parse")
}

#[fixture]
pub fn loaded_engine() -> SearchEngine {
    let engine = SearchEngine::default();
    engine
        .rebuild(payload_records())
        .expect("Fixture payload should build");
    engine
}

/// A temporary directory holding a copy of the sample payload.
#[allow(dead_code)] // Used across different integration test crates
pub struct PayloadDir {
    _temp: TempDir,
    path: PathBuf,
}

#[allow(dead_code)] // Used across different integration test crates
impl PayloadDir {
    /// Path of the payload file inside the temp directory.
    pub fn payload(&self) -> &Path {
        &self.path
    }

    /// Overwrites the payload file.
    pub fn write(&self, content: &str) {
        std::fs::write(&self.path, content).expect("Failed to write payload");
    }
}

#[fixture]
pub fn payload_dir() -> PayloadDir {
    let temp = TempDir::new().expect("Failed to create temp directory");
    let path = temp.path().join("search_index.js");
    std::fs::copy(payload_path(), &path).expect("Failed to copy fixture payload");
    PayloadDir { _temp: temp, path }
}

/// Runs a query with default options and returns the hits.
pub fn search(engine: &SearchEngine, query: &str) -> Vec<SearchHit> {
    engine
        .search(query, &SearchOptions::default(), &CancellationToken::new())
        .expect("Query should not fail")
        .to_vec()
}

/// Locations of a hit list, in rank order.
#[allow(dead_code)] // Used across different integration test crates
pub fn locations(hits: &[SearchHit]) -> Vec<&str> {
    hits.iter().map(|hit| hit.location.as_str()).collect()
}
