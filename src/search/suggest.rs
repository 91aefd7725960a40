//! "Did you mean" suggestions for query terms missing from the vocabulary.

use rapidfuzz::distance::jaro_winkler;

use super::index::IndexSnapshot;

/// Minimum Jaro-Winkler similarity for a vocabulary term to be suggested.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// Maximum suggestions returned per term.
const MAX_SUGGESTIONS: usize = 3;

/// A vocabulary term similar to a query term.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub term: String,
    /// Similarity in 0.0..=1.0, higher is better
    pub score: f64,
}

/// Ranks indexed terms by similarity to `term`.
pub(crate) fn suggest(index: &IndexSnapshot, term: &str) -> Vec<Suggestion> {
    let mut suggestions: Vec<Suggestion> = index
        .vocabulary()
        .filter_map(|candidate| {
            let score = jaro_winkler::similarity(term.chars(), candidate.chars());
            (score >= SUGGESTION_THRESHOLD).then(|| Suggestion {
                term: candidate.to_string(),
                score,
            })
        })
        .collect();

    suggestions.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.term.cmp(&b.term)));
    suggestions.truncate(MAX_SUGGESTIONS);
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::RawRecord;
    use crate::search::{IndexSettings, ParsedQuery, build_index};
    use assert2::{check, let_assert};
    use tokio_util::sync::CancellationToken;

    fn index() -> IndexSnapshot {
        let_assert!(
            Ok(index) = build_index(
                vec![RawRecord::new(
                    "#a",
                    "P",
                    "Quaternion kinematics",
                    "method",
                    "orthonormalize"
                )],
                &IndexSettings::default(),
                &CancellationToken::new(),
            )
        );
        index
    }

    #[test]
    fn test_misspelling_suggested() {
        let suggestions = suggest(&index(), "quaternoin");
        check!(suggestions.first().map(|s| s.term.as_str()) == Some("quaternion"));
    }

    #[test]
    fn test_unrelated_term_has_no_suggestions() {
        check!(suggest(&index(), "zzzz").is_empty());
    }

    #[test]
    fn test_snapshot_suggestions_only_for_missing_terms() {
        let index = index();
        let query = ParsedQuery::parse("quaternion kinematcs", true);
        let suggestions = index.suggestions(&query);
        check!(suggestions.len() == 1);
        check!(suggestions[0].0 == "kinematcs");
        check!(suggestions[0].1[0].term == "kinematics");
    }
}
