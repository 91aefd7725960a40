//! Shared server state and the background payload watcher.
//!
//! The watcher polls the payload file and rebuilds the index when it changes. Builds
//! and queries run on the blocking pool so the async executor stays responsive.

use crate::config::Config;
use crate::corpus::parse_payload;
use crate::engine::{RebuildOutcome, SearchEngine};
use crate::error::{Result, SearchError};
use crate::fingerprint::{Fingerprint, payload_fingerprint};
use crate::search::{SearchHit, SearchOptions};
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::RwLock;
use tokio::time::{Duration, interval};
use tokio_util::sync::CancellationToken;

/// State shared by tool handlers and the background worker.
pub struct ServerState {
    engine: Arc<SearchEngine>,
    config: Config,
    /// Payload file the index was (or will be) built from
    payload_path: RwLock<Option<PathBuf>>,
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("engine", &self.engine)
            .field("payload", &self.config.payload)
            .finish()
    }
}

impl ServerState {
    /// Create state with an empty engine configured from `config`.
    pub fn new(config: Config) -> Self {
        let payload_path = config.payload_path();
        Self {
            engine: Arc::new(SearchEngine::from_config(&config)),
            config,
            payload_path: RwLock::new(payload_path),
        }
    }

    pub const fn engine(&self) -> &Arc<SearchEngine> {
        &self.engine
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Get the configured payload path.
    pub async fn payload_path(&self) -> Option<PathBuf> {
        self.payload_path.read().await.clone()
    }

    /// Read, parse and index a payload file, then remember it as the current payload.
    ///
    /// Any failure leaves the published index untouched.
    pub async fn reload_from_path(&self, path: &Path) -> Result<RebuildOutcome> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read payload {}", path.display()))?;
        self.reload_from_text(path, &content).await
    }

    /// Parse and index payload text already read from `path`.
    pub async fn reload_from_text(&self, path: &Path, content: &str) -> Result<RebuildOutcome> {
        let records = parse_payload(content)
            .with_context(|| format!("Failed to parse payload {}", path.display()))?;

        tracing::info!("Indexing {} records from {}", records.len(), path.display());

        let engine = Arc::clone(&self.engine);
        let outcome = tokio::task::spawn_blocking(move || engine.rebuild(records))
            .await
            .context("Index build task panicked")??;

        *self.payload_path.write().await = Some(path.to_path_buf());
        Ok(outcome)
    }

    /// Run a query on the blocking pool.
    ///
    /// If the returned future is dropped (the client went away), the query's
    /// cancellation token fires and evaluation stops at the next candidate.
    pub async fn search(&self, query: String, options: SearchOptions) -> Result<Arc<[SearchHit]>> {
        let engine = Arc::clone(&self.engine);
        let cancel = CancellationToken::new();
        let _cancel_on_drop = cancel.clone().drop_guard();

        let hits = tokio::task::spawn_blocking(move || engine.search(&query, &options, &cancel))
            .await
            .context("Search task panicked")??;
        Ok(hits)
    }
}

/// Background worker that rebuilds the index whenever the payload file changes.
pub struct ReloadWorker {
    state: Arc<ServerState>,
    period: Duration,
    last_modified: Option<SystemTime>,
    /// Digest of the payload bytes last handed to the engine
    last_payload: Option<Fingerprint>,
}

impl ReloadWorker {
    /// Create a new reload worker polling every `period`.
    pub const fn new(state: Arc<ServerState>, period: Duration) -> Self {
        Self {
            state,
            period,
            last_modified: None,
            last_payload: None,
        }
    }

    /// Run the polling loop forever.
    pub async fn run(mut self) {
        let mut ticker = interval(self.period);
        loop {
            ticker.tick().await;
            self.check_once().await;
        }
    }

    /// Perform one poll: rebuild if the payload's modification time changed.
    pub async fn check_once(&mut self) {
        let Some(path) = self.state.payload_path().await else {
            tracing::trace!("No payload configured");
            return;
        };

        let modified = match tokio::fs::metadata(&path).await.and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                tracing::warn!("Cannot stat payload {}: {}", path.display(), e);
                return;
            }
        };

        if self.last_modified == Some(modified) {
            return;
        }

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Cannot read payload {}: {}", path.display(), e);
                return;
            }
        };

        let digest = payload_fingerprint(content.as_bytes());
        if self.last_payload == Some(digest) {
            tracing::debug!("Payload {} touched but byte-identical", path.display());
            self.last_modified = Some(modified);
            return;
        }

        match self.state.reload_from_text(&path, &content).await {
            Ok(RebuildOutcome::Published(snapshot)) => {
                tracing::info!(
                    "Background reload published index {} from {}",
                    snapshot.fingerprint(),
                    path.display()
                );
            }
            Ok(RebuildOutcome::Unchanged(_)) => {
                tracing::debug!("Payload {} touched but unchanged", path.display());
            }
            Err(e) if e.downcast_ref::<SearchError>() == Some(&SearchError::BuildInProgress) => {
                tracing::debug!("Build already running, retrying on next poll");
                return;
            }
            Err(e) => {
                tracing::warn!(
                    "Background reload of {} failed, previous index keeps serving: {:#}",
                    path.display(),
                    e
                );
            }
        }

        self.last_modified = Some(modified);
        self.last_payload = Some(digest);
    }
}

/// Spawn the reload worker if `reload_interval_secs` is non-zero.
///
/// Returns a handle to the spawned task.
pub fn spawn_reload_worker(state: Arc<ServerState>) -> Option<tokio::task::JoinHandle<()>> {
    let secs = state.config().reload_interval_secs;
    if secs == 0 {
        return None;
    }

    tracing::info!("Watching payload for changes every {}s", secs);
    let worker = ReloadWorker::new(state, Duration::from_secs(secs));
    Some(tokio::spawn(worker.run()))
}
