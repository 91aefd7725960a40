//! Full-text search handler for finding documentation records.

use crate::{
    search::{ParsedQuery, SearchHit},
    worker::ServerState,
};
use rmcp::schemars;
use serde::Deserialize;
use std::{fmt::Write as _, sync::Arc};

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchRequest {
    /// Search query. Quote a phrase ("euler angles") or end a word with * for a prefix match.
    pub query: String,
    /// Maximum number of results to return (default from config, normally 20)
    #[serde(default)]
    pub limit: Option<usize>,
    /// Whether a trailing * performs a prefix match (default from config)
    #[serde(default)]
    pub prefix: Option<bool>,
}

/// Execute the search against the current index snapshot.
pub async fn handle_search(
    state: &Arc<ServerState>,
    request: SearchRequest,
) -> Result<String, String> {
    let mut options = state.config().search_options();
    if let Some(limit) = request.limit {
        options = options.with_max_results(limit);
    }
    if let Some(prefix) = request.prefix {
        options = options.with_prefix(prefix);
    }

    let Some(snapshot) = state.engine().snapshot() else {
        return Ok(format!(
            "No results for '{}': the documentation index is not loaded yet.\n\n\
             Use reload_index with the path of the generated search payload.",
            request.query
        ));
    };

    let results = state
        .search(request.query.clone(), options)
        .await
        .map_err(|e| format!("Search failed: {:#}", e))?;

    if results.is_empty() {
        let parsed = ParsedQuery::parse(&request.query, options.prefix_enabled);
        let mut msg = format!("No results found for '{}'.\n\n", request.query);

        if parsed.is_empty() {
            msg.push_str("The query contains no searchable words (only stop words or very short tokens).\n");
            return Ok(msg);
        }

        let suggestions = snapshot.suggestions(&parsed);
        if !suggestions.is_empty() {
            msg.push_str("Did you mean:\n");
            for (term, candidates) in suggestions {
                let candidates: Vec<&str> = candidates.iter().map(|s| s.term.as_str()).collect();
                let _ = writeln!(msg, "• {} → {}", term, candidates.join(", "));
            }
            msg.push('\n');
        }

        // Provide helpful suggestions
        msg.push_str("Search tips:\n");
        msg.push_str("• All words must match; try fewer words\n");
        msg.push_str("• End a word with * to match prefixes, e.g. 'quat*'\n");
        if !parsed.phrases.is_empty() {
            msg.push_str("• Quoted phrases must match exactly; try removing the quotes\n");
        }

        return Ok(msg);
    }

    Ok(format_search_results(&results, &request.query))
}

/// Format search results into a readable string output.
pub fn format_search_results(results: &[SearchHit], query: &str) -> String {
    let mut output = format!("Search results for '{}':\n\n", query);

    let max_score = results
        .first()
        .map(|r| r.score)
        .filter(|score| *score > 0.0)
        .unwrap_or(1.0);

    for (idx, result) in results.iter().enumerate() {
        let relevance = ((result.score / max_score) * 100.0).round() as u8;

        let _ = writeln!(
            output,
            "{}. {} › {} ({}) - relevance: {}%",
            idx + 1,
            result.page,
            result.title,
            result.category,
            relevance
        );
        let _ = writeln!(output, "   location: {}", result.location);
        if !result.snippet.is_empty() {
            let _ = writeln!(output, "   {}", result.snippet);
        }

        output.push('\n');
    }

    output
}
