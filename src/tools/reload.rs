//! Handler that re-reads the generated payload and rebuilds the index.

use crate::{config::expand_tilde, engine::RebuildOutcome, worker::ServerState};
use rmcp::schemars;
use serde::Deserialize;
use std::{fmt::Write as _, path::PathBuf, sync::Arc};

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ReloadRequest {
    /// Path to the generated search payload (defaults to the current payload)
    #[serde(default)]
    pub path: Option<String>,
}

/// Rebuild the index from a payload file and publish it.
///
/// On failure the previous index keeps serving and the error is returned.
pub async fn handle_reload(
    state: &Arc<ServerState>,
    request: ReloadRequest,
) -> Result<String, String> {
    let path = match request.path {
        Some(path) => PathBuf::from(expand_tilde(&path).as_ref()),
        None => state.payload_path().await.ok_or_else(|| {
            "No payload configured. Pass `path` with the location of the generated search payload."
                .to_string()
        })?,
    };

    let outcome = state
        .reload_from_path(&path)
        .await
        .map_err(|e| format!("Reload failed, previous index unchanged: {:#}", e))?;

    let mut response = String::new();
    match &outcome {
        RebuildOutcome::Published(snapshot) => {
            let summary = snapshot.summary();
            let _ = writeln!(response, "Index rebuilt from {}", path.display());
            let _ = writeln!(response, "• Documents: {}", summary.accepted);
            let _ = writeln!(response, "• Unique terms: {}", summary.terms);
            let _ = writeln!(response, "• Skipped records: {}", summary.rejected);
            let _ = writeln!(response, "• Duplicate locations: {}", summary.duplicates);
            let _ = writeln!(response, "• Build time: {:?}", summary.elapsed);
        }
        RebuildOutcome::Unchanged(snapshot) => {
            let _ = writeln!(
                response,
                "Payload {} is unchanged (fingerprint {}); index not rebuilt.",
                path.display(),
                snapshot.fingerprint()
            );
        }
    }

    Ok(response)
}
