//! Ownership and lifecycle of the active index snapshot.
//!
//! A [`SearchEngine`] is an explicitly owned handle: it holds the current snapshot
//! behind an atomic pointer, serializes builds (a second concurrent build is
//! rejected), and caches query results per corpus fingerprint. Hosts decide how many
//! engines exist and how long they live.

use crate::config::Config;
use crate::corpus::RawRecord;
use crate::error::SearchError;
use crate::fingerprint::{Fingerprint, corpus_fingerprint};
use crate::search::{IndexSettings, IndexSnapshot, ParsedQuery, SearchHit, SearchOptions, build_index};
use arc_swap::ArcSwapOption;
use lru::LruCache;
use parking_lot::Mutex;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Lifecycle of the engine's index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    /// Nothing published yet; queries return no results
    Empty,
    /// First build in progress; queries still return no results
    Building,
    /// A snapshot is published and serving
    Ready,
    /// A snapshot is serving while a replacement is being built
    Rebuilding,
}

impl fmt::Display for IndexState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Empty => "empty",
            Self::Building => "building",
            Self::Ready => "ready",
            Self::Rebuilding => "rebuilding",
        })
    }
}

/// Result of a successful [`SearchEngine::rebuild`].
#[derive(Debug, Clone)]
pub enum RebuildOutcome {
    /// A new snapshot was built and published.
    Published(Arc<IndexSnapshot>),
    /// The corpus matched the current snapshot's fingerprint; nothing was rebuilt.
    Unchanged(Arc<IndexSnapshot>),
}

impl RebuildOutcome {
    pub fn snapshot(&self) -> &Arc<IndexSnapshot> {
        match self {
            Self::Published(snapshot) | Self::Unchanged(snapshot) => snapshot,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    fingerprint: Fingerprint,
    query: ParsedQuery,
    max_results: usize,
    snippet_chars: usize,
}

type QueryCache = Mutex<LruCache<CacheKey, Arc<[SearchHit]>>>;

/// Holds the writer slot for the duration of a build.
pub struct BuildGuard<'a> {
    engine: &'a SearchEngine,
    cancel: CancellationToken,
}

impl BuildGuard<'_> {
    pub const fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        *self.engine.build.lock() = None;
    }
}

/// The host-owned search index handle.
pub struct SearchEngine {
    current: ArcSwapOption<IndexSnapshot>,
    /// Cancellation token of the running build, if any
    build: Mutex<Option<CancellationToken>>,
    settings: IndexSettings,
    cache: Option<QueryCache>,
}

impl fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchEngine")
            .field("state", &self.state())
            .field("settings", &self.settings)
            .field("cache_enabled", &self.cache.is_some())
            .finish()
    }
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new(IndexSettings::default(), 0)
    }
}

impl SearchEngine {
    /// Create an empty engine. A `cache_size` of 0 disables the query cache.
    pub fn new(settings: IndexSettings, cache_size: usize) -> Self {
        Self {
            current: ArcSwapOption::empty(),
            build: Mutex::new(None),
            settings,
            cache: NonZeroUsize::new(cache_size).map(|size| Mutex::new(LruCache::new(size))),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.index_settings(), config.query_cache_size)
    }

    pub const fn settings(&self) -> &IndexSettings {
        &self.settings
    }

    /// Current lifecycle state.
    pub fn state(&self) -> IndexState {
        let ready = self.current.load().is_some();
        let building = self.build.lock().is_some();
        match (ready, building) {
            (false, false) => IndexState::Empty,
            (false, true) => IndexState::Building,
            (true, false) => IndexState::Ready,
            (true, true) => IndexState::Rebuilding,
        }
    }

    /// The currently published snapshot. Readers keep it alive for as long as they
    /// hold the `Arc`, regardless of later swaps.
    pub fn snapshot(&self) -> Option<Arc<IndexSnapshot>> {
        self.current.load_full()
    }

    /// Atomically publishes `snapshot`, returning the one it replaced.
    pub fn swap(&self, snapshot: Arc<IndexSnapshot>) -> Option<Arc<IndexSnapshot>> {
        tracing::info!(
            "Publishing index {} ({} documents)",
            snapshot.fingerprint(),
            snapshot.document_count()
        );
        self.current.swap(Some(snapshot))
    }

    /// Claims the writer slot, or fails with [`SearchError::BuildInProgress`].
    pub fn begin_build(&self) -> Result<BuildGuard<'_>, SearchError> {
        let mut slot = self.build.lock();
        if slot.is_some() {
            return Err(SearchError::BuildInProgress);
        }
        let cancel = CancellationToken::new();
        *slot = Some(cancel.clone());
        Ok(BuildGuard {
            engine: self,
            cancel,
        })
    }

    /// Cancels the running build, if any. Returns whether a build was running.
    pub fn cancel_build(&self) -> bool {
        self.build.lock().as_ref().is_some_and(|cancel| {
            cancel.cancel();
            true
        })
    }

    /// Builds a snapshot from `records` and publishes it.
    ///
    /// On failure or cancellation the previously published snapshot stays
    /// authoritative. A corpus identical to the current one is not rebuilt.
    pub fn rebuild(&self, records: Vec<RawRecord>) -> Result<RebuildOutcome, SearchError> {
        let guard = self.begin_build()?;

        if let Some(current) = self.snapshot()
            && current.fingerprint() == corpus_fingerprint(&records)
        {
            tracing::debug!("Corpus unchanged ({}), keeping current index", current.fingerprint());
            return Ok(RebuildOutcome::Unchanged(current));
        }

        match build_index(records, &self.settings, guard.cancel_token()) {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.swap(Arc::clone(&snapshot));
                Ok(RebuildOutcome::Published(snapshot))
            }
            Err(e) => {
                tracing::warn!("Index build discarded: {}", e);
                Err(e)
            }
        }
    }

    /// Evaluates a query against the snapshot current at call time.
    ///
    /// Returns no results while the engine is `Empty` or `Building`.
    pub fn search(
        &self,
        query: &str,
        options: &SearchOptions,
        cancel: &CancellationToken,
    ) -> Result<Arc<[SearchHit]>, SearchError> {
        let Some(snapshot) = self.snapshot() else {
            return Ok(Arc::from(Vec::new()));
        };

        let parsed = ParsedQuery::parse(query, options.prefix_enabled);
        if parsed.is_empty() {
            return Ok(Arc::from(Vec::new()));
        }

        let key = CacheKey {
            fingerprint: snapshot.fingerprint(),
            query: parsed,
            max_results: options.max_results,
            snippet_chars: options.snippet_chars,
        };

        if let Some(cache) = &self.cache
            && let Some(hits) = cache.lock().get(&key)
        {
            tracing::debug!("Query cache hit for '{}'", query);
            return Ok(Arc::clone(hits));
        }

        let hits: Arc<[SearchHit]> = snapshot.search_parsed(&key.query, options, cancel)?.into();

        if let Some(cache) = &self.cache {
            cache.lock().put(key, Arc::clone(&hits));
        }

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};

    fn rotations() -> Vec<RawRecord> {
        vec![
            RawRecord::new("#q", "Lib", "Quaternion Inversion", "method", "compute inverse quaternion"),
            RawRecord::new("#d", "Lib", "DCM Orthonormalization", "method", "gram schmidt orthonormalize"),
        ]
    }

    fn locations(hits: &[SearchHit]) -> Vec<&str> {
        hits.iter().map(|hit| hit.location.as_str()).collect()
    }

    #[test]
    fn test_empty_engine_answers_nothing() {
        let engine = SearchEngine::default();
        check!(engine.state() == IndexState::Empty);
        let_assert!(
            Ok(hits) = engine.search("quaternion", &SearchOptions::default(), &CancellationToken::new())
        );
        check!(hits.is_empty());
    }

    #[test]
    fn test_rebuild_publishes() {
        let engine = SearchEngine::default();
        let_assert!(Ok(RebuildOutcome::Published(_)) = engine.rebuild(rotations()));
        check!(engine.state() == IndexState::Ready);

        let cancel = CancellationToken::new();
        let_assert!(Ok(hits) = engine.search("quaternion", &SearchOptions::default(), &cancel));
        check!(locations(&hits) == ["#q"]);
    }

    #[test]
    fn test_identical_corpus_unchanged() {
        let engine = SearchEngine::default();
        let_assert!(Ok(RebuildOutcome::Published(first)) = engine.rebuild(rotations()));
        let_assert!(Ok(RebuildOutcome::Unchanged(second)) = engine.rebuild(rotations()));
        check!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_build_states_and_rejection() {
        let engine = SearchEngine::default();
        let_assert!(Ok(guard) = engine.begin_build());
        check!(engine.state() == IndexState::Building);
        let_assert!(Err(SearchError::BuildInProgress) = engine.begin_build());
        let_assert!(Err(SearchError::BuildInProgress) = engine.rebuild(rotations()));
        drop(guard);
        check!(engine.state() == IndexState::Empty);

        let_assert!(Ok(_) = engine.rebuild(rotations()));
        let_assert!(Ok(_guard) = engine.begin_build());
        check!(engine.state() == IndexState::Rebuilding);
    }

    #[test]
    fn test_cancel_build_signals_token() {
        let engine = SearchEngine::default();
        check!(!engine.cancel_build());
        let_assert!(Ok(guard) = engine.begin_build());
        check!(engine.cancel_build());
        check!(guard.cancel_token().is_cancelled());
    }

    #[test]
    fn test_failed_build_keeps_previous_snapshot() {
        let engine = SearchEngine::default();
        let_assert!(Ok(_) = engine.rebuild(rotations()));
        let_assert!(Some(before) = engine.snapshot());

        {
            let_assert!(Ok(guard) = engine.begin_build());
            guard.cancel_token().cancel();
            let result = build_index(
                vec![RawRecord::new("#new", "P", "Replacement", "page", "")],
                engine.settings(),
                guard.cancel_token(),
            );
            let_assert!(Err(SearchError::BuildCancelled) = result);
        }

        let_assert!(Some(after) = engine.snapshot());
        check!(Arc::ptr_eq(&before, &after));
        check!(engine.state() == IndexState::Ready);
    }

    #[test]
    fn test_swap_returns_previous() {
        let engine = SearchEngine::default();
        let_assert!(
            Ok(snapshot) =
                build_index(rotations(), engine.settings(), &CancellationToken::new())
        );
        check!(engine.swap(Arc::new(snapshot)).is_none());
        let_assert!(
            Ok(replacement) = build_index(Vec::new(), engine.settings(), &CancellationToken::new())
        );
        let_assert!(Some(previous) = engine.swap(Arc::new(replacement)));
        check!(previous.document_count() == 2);
    }

    #[test]
    fn test_old_snapshot_survives_swap() {
        let engine = SearchEngine::default();
        let_assert!(Ok(_) = engine.rebuild(rotations()));
        let_assert!(Some(old) = engine.snapshot());

        let_assert!(
            Ok(_) = engine.rebuild(vec![RawRecord::new("#r", "Lib", "Rotation", "page", "")])
        );

        let cancel = CancellationToken::new();
        let options = SearchOptions::default();
        let_assert!(Ok(old_hits) = old.search("quaternion", &options, &cancel));
        check!(locations(&old_hits) == ["#q"]);
        let_assert!(Ok(new_hits) = engine.search("quaternion", &options, &cancel));
        check!(new_hits.is_empty());
    }

    #[test]
    fn test_cache_is_keyed_by_corpus() {
        let engine = SearchEngine::new(IndexSettings::default(), 8);
        let options = SearchOptions::default();
        let cancel = CancellationToken::new();

        let_assert!(Ok(_) = engine.rebuild(rotations()));
        let_assert!(Ok(first) = engine.search("quaternion", &options, &cancel));
        let_assert!(Ok(cached) = engine.search("Quaternion", &options, &cancel));
        check!(Arc::ptr_eq(&first, &cached));

        let_assert!(
            Ok(_) = engine.rebuild(vec![RawRecord::new("#r", "Lib", "Rotation", "page", "")])
        );
        let_assert!(Ok(after) = engine.search("quaternion", &options, &cancel));
        check!(after.is_empty());
    }

    #[test]
    fn test_all_stop_word_query_returns_nothing() {
        let engine = SearchEngine::default();
        let_assert!(Ok(_) = engine.rebuild(rotations()));
        let_assert!(
            Ok(hits) = engine.search("the of and", &SearchOptions::default(), &CancellationToken::new())
        );
        check!(hits.is_empty());
    }
}
