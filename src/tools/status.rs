//! Handler reporting the index lifecycle state and build statistics.

use crate::{corpus::RecordIssue, worker::ServerState};
use std::{fmt::Write as _, sync::Arc};

/// Maximum number of record issues listed in the status output.
const MAX_LISTED_ISSUES: usize = 10;

/// Describe the engine state and the currently published snapshot.
pub async fn handle_index_status(state: &Arc<ServerState>) -> String {
    let engine = state.engine();
    let mut output = format!("Index state: {}\n", engine.state());

    if let Some(path) = state.payload_path().await {
        let _ = writeln!(output, "Payload: {}", path.display());
    }

    let Some(snapshot) = engine.snapshot() else {
        output.push_str("No index published yet.\n");
        return output;
    };

    let summary = snapshot.summary();
    let _ = writeln!(output, "Fingerprint: {}", snapshot.fingerprint());
    let _ = writeln!(output, "Documents: {}", snapshot.document_count());
    let _ = writeln!(output, "Unique terms: {}", snapshot.term_count());
    let _ = writeln!(output, "Postings: {}", summary.postings);
    let _ = writeln!(output, "Skipped records: {}", summary.rejected);
    let _ = writeln!(output, "Duplicate locations: {}", summary.duplicates);

    if !summary.issues.is_empty() {
        output.push_str("\nRecord issues:\n");
        for issue in summary.issues.iter().take(MAX_LISTED_ISSUES) {
            let _ = match issue {
                RecordIssue::Rejected { ordinal, reason } => {
                    writeln!(output, "• record {} skipped: {}", ordinal, reason)
                }
                RecordIssue::DuplicateLocation {
                    location,
                    superseded,
                    ordinal,
                } => writeln!(
                    output,
                    "• '{}' at record {} replaced record {}",
                    location, ordinal, superseded
                ),
            };
        }
        if summary.issues.len() > MAX_LISTED_ISSUES {
            let _ = writeln!(output, "• … and {} more", summary.issues.len() - MAX_LISTED_ISSUES);
        }
    }

    output
}
