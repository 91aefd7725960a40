pub mod config;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod search;
pub mod server;
pub mod tools;
pub mod tracing;
pub mod worker;

pub use config::Config;
pub use corpus::{Category, DocId, Document, RawRecord, load_corpus, parse_payload};
pub use engine::{IndexState, RebuildOutcome, SearchEngine};
pub use error::SearchError;
pub use search::{IndexSettings, IndexSnapshot, SearchHit, SearchOptions, build_index};
pub use worker::ServerState;
