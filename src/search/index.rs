//! Inverted index snapshot and its builder.

use crate::corpus::{DocId, Document, LoadedCorpus, RawRecord, RecordIssue, load_corpus};
use crate::error::SearchError;
use crate::fingerprint::{Fingerprint, corpus_fingerprint};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    time::{Duration, Instant},
};
use tokio_util::sync::CancellationToken;

use super::query::ParsedQuery;
use super::tokenize::tokenize;
use super::{SearchHit, SearchOptions, scoring, snippet, suggest};

/// The field of a document a token occurrence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Field {
    Title,
    Category,
    Body,
}

/// Multipliers applied to term frequency depending on the field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldWeights {
    pub title: f32,
    pub category: f32,
    pub body: f32,
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self {
            title: 5.0,
            category: 3.0,
            body: 1.0,
        }
    }
}

impl FieldWeights {
    pub const fn weight(&self, field: Field) -> f32 {
        match field {
            Field::Title => self.title,
            Field::Category => self.category,
            Field::Body => self.body,
        }
    }
}

/// Scoring parameters fixed at build time and carried by the snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexSettings {
    pub weights: FieldWeights,
    /// Added once per satisfied phrase constraint
    pub phrase_bonus: f32,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            weights: FieldWeights::default(),
            phrase_bonus: 10.0,
        }
    }
}

/// One (token, document, field) occurrence group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub doc: DocId,
    pub field: Field,
    /// Term frequency within the field
    pub tf: u32,
    /// Token positions within the field, ascending
    pub positions: Vec<u32>,
}

/// All postings for one token, sorted by `(doc, field)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingsList {
    postings: Vec<Posting>,
    doc_freq: u32,
}

impl PostingsList {
    pub fn postings(&self) -> &[Posting] {
        &self.postings
    }

    /// Number of distinct documents containing the token.
    pub const fn doc_freq(&self) -> u32 {
        self.doc_freq
    }

    /// Distinct documents containing the token, ascending.
    pub fn doc_ids(&self) -> Vec<DocId> {
        let mut docs: Vec<DocId> = self.postings.iter().map(|p| p.doc).collect();
        docs.dedup();
        docs
    }

    /// The postings belonging to one document (at most one per field).
    pub fn for_doc(&self, doc: DocId) -> &[Posting] {
        let start = self.postings.partition_point(|p| p.doc < doc);
        let end = start + self.postings[start..].partition_point(|p| p.doc == doc);
        &self.postings[start..end]
    }
}

/// Statistics reported after a build.
#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub accepted: usize,
    pub rejected: usize,
    pub duplicates: usize,
    pub issues: Vec<RecordIssue>,
    pub terms: usize,
    pub postings: usize,
    pub elapsed: Duration,
}

/// An immutable, fully built index over one corpus.
#[derive(Debug)]
pub struct IndexSnapshot {
    documents: Vec<Document>,
    /// Total token count per document, indexed by `DocId`
    doc_lengths: Vec<u32>,
    terms: BTreeMap<String, PostingsList>,
    settings: IndexSettings,
    fingerprint: Fingerprint,
    summary: BuildSummary,
}

impl IndexSnapshot {
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn document(&self, id: DocId) -> Option<&Document> {
        self.documents.get(id.index())
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn doc_length(&self, id: DocId) -> u32 {
        self.doc_lengths.get(id.index()).copied().unwrap_or(0)
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    pub const fn settings(&self) -> &IndexSettings {
        &self.settings
    }

    pub const fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub const fn summary(&self) -> &BuildSummary {
        &self.summary
    }

    pub fn postings(&self, term: &str) -> Option<&PostingsList> {
        self.terms.get(term)
    }

    /// Looks up a term, returning the index-owned key alongside its postings.
    pub(crate) fn entry(&self, term: &str) -> Option<(&str, &PostingsList)> {
        self.terms
            .get_key_value(term)
            .map(|(key, list)| (key.as_str(), list))
    }

    /// All indexed terms starting with `prefix`, in lexicographic order.
    pub fn terms_with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a PostingsList)> + 'a {
        self.terms
            .range::<str, _>((std::ops::Bound::Included(prefix), std::ops::Bound::Unbounded))
            .take_while(move |(term, _)| term.starts_with(prefix))
            .map(|(term, list)| (term.as_str(), list))
    }

    pub fn vocabulary(&self) -> impl Iterator<Item = &str> {
        self.terms.keys().map(String::as_str)
    }

    /// Inverse document frequency: `ln(total_docs / doc_freq)`, floored at 1.
    pub fn idf(&self, list: &PostingsList) -> f32 {
        let total = self.documents.len() as f32;
        let doc_freq = list.doc_freq().max(1) as f32;
        (total / doc_freq).ln().max(1.0)
    }

    /// Parses and evaluates a query against this snapshot.
    ///
    /// An empty or all-stop-word query yields no results rather than every document.
    pub fn search(
        &self,
        query: &str,
        options: &SearchOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let parsed = ParsedQuery::parse(query, options.prefix_enabled);
        self.search_parsed(&parsed, options, cancel)
    }

    /// Evaluates an already parsed query.
    pub fn search_parsed(
        &self,
        query: &ParsedQuery,
        options: &SearchOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let ranked = scoring::rank(self, query, options.max_results, cancel)?;
        tracing::trace!("Query {:?} ranked {} documents", query, ranked.len());
        Ok(snippet::assemble(self, ranked, options.snippet_chars))
    }

    /// "Did you mean" suggestions for required terms that are not indexed.
    pub fn suggestions(&self, query: &ParsedQuery) -> Vec<(String, Vec<suggest::Suggestion>)> {
        query
            .required
            .iter()
            .filter(|term| !self.terms.contains_key(term.as_str()))
            .map(|term| (term.clone(), suggest::suggest(self, term)))
            .filter(|(_, suggestions)| !suggestions.is_empty())
            .collect()
    }
}

/// Accumulates postings for documents in id order before finalization.
#[derive(Default)]
pub(crate) struct IndexBuilder {
    /// Map from term to postings, appended in ascending document order
    postings: AHashMap<String, Vec<Posting>>,
    /// Total token count per document
    doc_lengths: Vec<u32>,
}

impl IndexBuilder {
    fn with_capacity(documents: usize) -> Self {
        Self {
            postings: AHashMap::default(),
            doc_lengths: Vec::with_capacity(documents),
        }
    }

    /// Tokenizes every field of a document and records its postings.
    fn add_document(&mut self, doc: &Document) {
        let length = self.add_field(doc.id, Field::Title, &doc.title)
            + self.add_field(doc.id, Field::Category, doc.category.label())
            + self.add_field(doc.id, Field::Body, &doc.text);
        self.doc_lengths.push(length);
    }

    fn add_field(&mut self, doc: DocId, field: Field, text: &str) -> u32 {
        let tokens = tokenize(text);
        let length = tokens.len() as u32;

        let mut positions: AHashMap<String, Vec<u32>> = AHashMap::with_capacity(tokens.len());
        for token in tokens {
            positions.entry(token.term).or_default().push(token.position);
        }

        for (term, positions) in positions {
            self.postings.entry(term).or_default().push(Posting {
                doc,
                field,
                tf: positions.len() as u32,
                positions,
            });
        }

        length
    }

    /// Sorts every postings list and freezes the builder into a snapshot.
    fn finalize(
        self,
        corpus: LoadedCorpus,
        settings: IndexSettings,
        fingerprint: Fingerprint,
        start: Instant,
    ) -> IndexSnapshot {
        let mut postings_total = 0;
        let terms: BTreeMap<String, PostingsList> = self
            .postings
            .into_iter()
            .map(|(term, mut postings)| {
                postings.sort_by_key(|p| (p.doc, p.field));
                postings_total += postings.len();
                let mut doc_freq = 0;
                let mut last = None;
                for posting in &postings {
                    if last != Some(posting.doc) {
                        doc_freq += 1;
                        last = Some(posting.doc);
                    }
                }
                (term, PostingsList { postings, doc_freq })
            })
            .collect();

        let summary = BuildSummary {
            accepted: corpus.documents.len(),
            rejected: corpus.rejected_count(),
            duplicates: corpus.duplicate_count(),
            issues: corpus.issues,
            terms: terms.len(),
            postings: postings_total,
            elapsed: start.elapsed(),
        };

        tracing::info!(
            "Built search index {}: {} documents, {} unique terms, {} postings ({} skipped, {} duplicates) in {:?}",
            fingerprint,
            summary.accepted,
            summary.terms,
            summary.postings,
            summary.rejected,
            summary.duplicates,
            summary.elapsed
        );

        IndexSnapshot {
            documents: corpus.documents,
            doc_lengths: self.doc_lengths,
            terms,
            settings,
            fingerprint,
            summary,
        }
    }
}

/// Builds a complete snapshot from one corpus in a single pass.
///
/// Nothing is visible to readers until the returned snapshot is published. The
/// cancellation token is checked once per document.
pub fn build_index(
    records: Vec<RawRecord>,
    settings: &IndexSettings,
    cancel: &CancellationToken,
) -> Result<IndexSnapshot, SearchError> {
    let start = Instant::now();
    let fingerprint = corpus_fingerprint(&records);
    let corpus = load_corpus(records);

    let mut builder = IndexBuilder::with_capacity(corpus.documents.len());
    for doc in &corpus.documents {
        if cancel.is_cancelled() {
            tracing::info!("Index build cancelled after {} documents", doc.id.0);
            return Err(SearchError::BuildCancelled);
        }
        builder.add_document(doc);
    }

    Ok(builder.finalize(corpus, *settings, fingerprint, start))
}
