//! Candidate selection and relevance ranking.
//!
//! score(doc) = Σ over matched tokens of tf × field weight × idf
//!            + phrase bonus × satisfied phrases
//!            + category tier bonus
//!
//! Ties are broken by ascending `DocId` so rankings never depend on hash iteration order.

use crate::corpus::DocId;
use crate::error::SearchError;
use tokio_util::sync::CancellationToken;

use super::index::{Field, IndexSnapshot, PostingsList};
use super::query::ParsedQuery;

/// A ranked document plus the index terms it matched.
#[derive(Debug, Clone)]
pub(crate) struct ScoredDoc<'a> {
    pub(crate) doc: DocId,
    pub(crate) score: f32,
    pub(crate) matched: Vec<&'a str>,
}

/// One query constraint: a required token (single list) or an expanded prefix (many lists).
struct TermGroup<'a> {
    lists: Vec<(&'a str, &'a PostingsList)>,
    /// Documents satisfying the constraint, ascending
    docs: Vec<DocId>,
}

impl<'a> TermGroup<'a> {
    fn required(index: &'a IndexSnapshot, term: &str) -> Option<Self> {
        let (key, list) = index.entry(term)?;
        Some(Self {
            lists: vec![(key, list)],
            docs: list.doc_ids(),
        })
    }

    fn prefix(index: &'a IndexSnapshot, prefix: &'a str) -> Option<Self> {
        let lists: Vec<_> = index.terms_with_prefix(prefix).collect();
        if lists.is_empty() {
            return None;
        }

        let mut docs: Vec<DocId> = lists.iter().flat_map(|(_, list)| list.doc_ids()).collect();
        docs.sort_unstable();
        docs.dedup();
        Some(Self { lists, docs })
    }
}

/// Intersects two ascending, deduplicated document lists.
fn intersect(left: &[DocId], right: &[DocId]) -> Vec<DocId> {
    let mut out = Vec::with_capacity(left.len().min(right.len()));
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        match left[i].cmp(&right[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(left[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

/// Positions of `term` in one field of one document.
fn positions<'a>(index: &'a IndexSnapshot, term: &str, doc: DocId, field: Field) -> &'a [u32] {
    index
        .postings(term)
        .and_then(|list| list.for_doc(doc).iter().find(|p| p.field == field))
        .map(|posting| posting.positions.as_slice())
        .unwrap_or_default()
}

/// True if the phrase occurs contiguously, in order, inside a single field of `doc`.
fn phrase_matches(index: &IndexSnapshot, phrase: &[String], doc: DocId) -> bool {
    let Some((first, rest)) = phrase.split_first() else {
        return false;
    };

    [Field::Title, Field::Category, Field::Body].into_iter().any(|field| {
        positions(index, first, doc, field).iter().any(|&start| {
            rest.iter().zip(1u32..).all(|(term, offset)| {
                positions(index, term, doc, field)
                    .binary_search(&(start + offset))
                    .is_ok()
            })
        })
    })
}

/// Selects candidates, scores them and returns the top `max_results`.
///
/// The cancellation token is checked once per candidate.
pub(crate) fn rank<'a>(
    index: &'a IndexSnapshot,
    query: &'a ParsedQuery,
    max_results: usize,
    cancel: &CancellationToken,
) -> Result<Vec<ScoredDoc<'a>>, SearchError> {
    if query.is_empty() || max_results == 0 || index.document_count() == 0 {
        return Ok(Vec::new());
    }

    let mut groups = Vec::with_capacity(query.required.len() + query.prefixes.len());
    for term in &query.required {
        let Some(group) = TermGroup::required(index, term) else {
            return Ok(Vec::new());
        };
        groups.push(group);
    }
    for prefix in &query.prefixes {
        let Some(group) = TermGroup::prefix(index, prefix) else {
            return Ok(Vec::new());
        };
        groups.push(group);
    }

    // Intersect starting from the most selective constraint
    groups.sort_by_key(|group| group.docs.len());
    let candidates = groups
        .iter()
        .skip(1)
        .fold(groups[0].docs.clone(), |acc, group| intersect(&acc, &group.docs));

    let settings = index.settings();
    let mut scored = Vec::with_capacity(candidates.len());

    for doc in candidates {
        if cancel.is_cancelled() {
            return Err(SearchError::QueryCancelled);
        }

        if !query
            .phrases
            .iter()
            .all(|phrase| phrase_matches(index, phrase, doc))
        {
            continue;
        }

        let mut score = 0.0;
        let mut matched: Vec<&str> = Vec::new();
        for group in &groups {
            for &(term, list) in &group.lists {
                if matched.contains(&term) {
                    continue;
                }
                let postings = list.for_doc(doc);
                if postings.is_empty() {
                    continue;
                }
                let idf = index.idf(list);
                for posting in postings {
                    score += posting.tf as f32 * settings.weights.weight(posting.field) * idf;
                }
                matched.push(term);
            }
        }

        score += query.phrases.len() as f32 * settings.phrase_bonus;
        if let Some(document) = index.document(doc) {
            score += document.category.tier_bonus();
        }

        scored.push(ScoredDoc {
            doc,
            score,
            matched,
        });
    }

    scored.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.doc.cmp(&b.doc)));
    scored.truncate(max_results);

    Ok(scored)
}
