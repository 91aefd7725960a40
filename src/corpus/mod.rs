//! Corpus loading: validates generator records and assigns stable document ids.

mod payload;

pub use payload::parse_payload;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, str::FromStr};

/// Stable identifier of an accepted document: its ordinal in the accepted sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocId(pub u32);

impl DocId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Closed set of record categories emitted by the documentation generator.
///
/// Declaration order is the ranking tier order, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Page,
    Section,
    Type,
    Method,
    Function,
    Other,
}

impl Category {
    pub const ALL: [Self; 6] = [
        Self::Page,
        Self::Section,
        Self::Type,
        Self::Method,
        Self::Function,
        Self::Other,
    ];

    /// The label as it appears in the payload, also indexed as the category field.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Section => "section",
            Self::Type => "type",
            Self::Method => "method",
            Self::Function => "function",
            Self::Other => "other",
        }
    }

    /// Additive ranking bonus for documents of this category.
    ///
    /// - page: 4.0
    /// - section: 3.0
    /// - type: 2.0
    /// - method, function: 1.0
    /// - other: 0.0
    pub const fn tier_bonus(self) -> f32 {
        match self {
            Self::Page => 4.0,
            Self::Section => 3.0,
            Self::Type => 2.0,
            Self::Method | Self::Function => 1.0,
            Self::Other => 0.0,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = RejectReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| RejectReason::UnknownCategory(trimmed.to_string()))
    }
}

/// A record exactly as supplied by the generator. Every field is optional so that
/// validation can reject individual records instead of failing the whole payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub location: Option<String>,
    pub page: Option<String>,
    pub title: Option<String>,
    pub category: Option<String>,
    pub text: Option<String>,
}

impl RawRecord {
    /// Creates a record with every field present.
    pub fn new(
        location: impl Into<String>,
        page: impl Into<String>,
        title: impl Into<String>,
        category: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            location: Some(location.into()),
            page: Some(page.into()),
            title: Some(title.into()),
            category: Some(category.into()),
            text: Some(text.into()),
        }
    }

    /// Extracts the string fields of a JSON value. Anything that is not a string
    /// (or a value that is not an object at all) is treated as a missing field.
    pub fn from_value(value: &Value) -> Self {
        let field = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_owned);
        Self {
            location: field("location"),
            page: field("page"),
            title: field("title"),
            category: field("category"),
            text: field("text"),
        }
    }
}

/// An accepted documentation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub id: DocId,
    pub location: String,
    pub page: String,
    pub title: String,
    pub category: Category,
    pub text: String,
}

/// Why a record was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    MissingField(&'static str),
    UnknownCategory(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing field `{}`", field),
            Self::UnknownCategory(category) => write!(f, "unknown category '{}'", category),
        }
    }
}

/// A non-fatal problem found while loading the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordIssue {
    /// The record at `ordinal` (input position) was skipped.
    Rejected { ordinal: usize, reason: RejectReason },
    /// The record at `superseded` was replaced by a later record at `ordinal`.
    DuplicateLocation {
        location: String,
        superseded: usize,
        ordinal: usize,
    },
}

/// Outcome of loading one corpus.
#[derive(Debug, Clone, Default)]
pub struct LoadedCorpus {
    pub documents: Vec<Document>,
    pub issues: Vec<RecordIssue>,
}

impl LoadedCorpus {
    pub fn rejected_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| matches!(issue, RecordIssue::Rejected { .. }))
            .count()
    }

    pub fn duplicate_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| matches!(issue, RecordIssue::DuplicateLocation { .. }))
            .count()
    }
}

/// A validated record that has not been assigned an id yet.
struct Candidate {
    ordinal: usize,
    location: String,
    page: String,
    title: String,
    category: Category,
    text: String,
}

fn validate(ordinal: usize, raw: RawRecord) -> Result<Candidate, RejectReason> {
    let location = raw
        .location
        .filter(|location| !location.is_empty())
        .ok_or(RejectReason::MissingField("location"))?;
    let page = raw.page.ok_or(RejectReason::MissingField("page"))?;
    let title = raw.title.ok_or(RejectReason::MissingField("title"))?;
    let category = raw
        .category
        .ok_or(RejectReason::MissingField("category"))?
        .parse::<Category>()?;
    let text = raw.text.ok_or(RejectReason::MissingField("text"))?;
    Ok(Candidate {
        ordinal,
        location,
        page,
        title,
        category,
        text,
    })
}

/// Validates records and assigns each accepted one a [`DocId`] equal to its position
/// in the accepted sequence.
///
/// Invalid records are skipped. When two valid records share a `location`, the later
/// one wins and the earlier one is dropped, so ids stay dense and in input order.
pub fn load_corpus(records: Vec<RawRecord>) -> LoadedCorpus {
    let mut issues = Vec::new();
    let mut candidates = Vec::with_capacity(records.len());

    for (ordinal, raw) in records.into_iter().enumerate() {
        match validate(ordinal, raw) {
            Ok(candidate) => candidates.push(candidate),
            Err(reason) => {
                tracing::debug!("Skipping record {}: {}", ordinal, reason);
                issues.push(RecordIssue::Rejected { ordinal, reason });
            }
        }
    }

    let mut superseded = vec![false; candidates.len()];
    let mut latest: AHashMap<&str, usize> = AHashMap::with_capacity(candidates.len());
    for (idx, candidate) in candidates.iter().enumerate() {
        if let Some(previous) = latest.insert(candidate.location.as_str(), idx) {
            superseded[previous] = true;
            tracing::warn!(
                "Duplicate location '{}': record {} replaces record {}",
                candidate.location,
                candidate.ordinal,
                candidates[previous].ordinal
            );
            issues.push(RecordIssue::DuplicateLocation {
                location: candidate.location.clone(),
                superseded: candidates[previous].ordinal,
                ordinal: candidate.ordinal,
            });
        }
    }

    let documents = candidates
        .into_iter()
        .zip(superseded)
        .filter(|(_, superseded)| !superseded)
        .enumerate()
        .map(|(id, (candidate, _))| Document {
            id: DocId(id as u32),
            location: candidate.location,
            page: candidate.page,
            title: candidate.title,
            category: candidate.category,
            text: candidate.text,
        })
        .collect();

    LoadedCorpus { documents, issues }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use rstest::rstest;

    #[rstest]
    #[case("page", Category::Page)]
    #[case("Section", Category::Section)]
    #[case(" type ", Category::Type)]
    #[case("method", Category::Method)]
    #[case("function", Category::Function)]
    #[case("other", Category::Other)]
    fn test_category_parse(#[case] input: &str, #[case] expected: Category) {
        check!(input.parse::<Category>() == Ok(expected));
    }

    #[test]
    fn test_category_unknown() {
        check!(
            "macro".parse::<Category>() == Err(RejectReason::UnknownCategory("macro".into()))
        );
    }

    #[test]
    fn test_category_tiers_strictly_ordered() {
        check!(Category::Page.tier_bonus() > Category::Section.tier_bonus());
        check!(Category::Section.tier_bonus() > Category::Type.tier_bonus());
        check!(Category::Type.tier_bonus() > Category::Method.tier_bonus());
        check!(Category::Method.tier_bonus() == Category::Function.tier_bonus());
        check!(Category::Function.tier_bonus() > Category::Other.tier_bonus());
    }

    #[test]
    fn test_ids_follow_accepted_order() {
        let loaded = load_corpus(vec![
            RawRecord::new("#a", "Home", "Alpha", "page", ""),
            RawRecord::default(),
            RawRecord::new("#b", "Home", "Beta", "section", "body"),
        ]);

        check!(loaded.documents.len() == 2);
        check!(loaded.documents[0].id == DocId(0));
        check!(loaded.documents[1].id == DocId(1));
        check!(loaded.documents[1].location == "#b");
        check!(loaded.rejected_count() == 1);
        check!(loaded.duplicate_count() == 0);
    }

    #[rstest]
    #[case(RawRecord { text: None, ..RawRecord::new("#a", "P", "T", "page", "") }, RejectReason::MissingField("text"))]
    #[case(RawRecord { location: Some(String::new()), ..RawRecord::new("#a", "P", "T", "page", "") }, RejectReason::MissingField("location"))]
    #[case(RawRecord::new("#a", "P", "T", "macro", ""), RejectReason::UnknownCategory("macro".into()))]
    fn test_rejections(#[case] record: RawRecord, #[case] expected: RejectReason) {
        let loaded = load_corpus(vec![record]);
        check!(loaded.documents.is_empty());
        check!(loaded.issues == [RecordIssue::Rejected { ordinal: 0, reason: expected }]);
    }

    #[test]
    fn test_duplicate_location_last_wins() {
        let loaded = load_corpus(vec![
            RawRecord::new("#dup", "Home", "First", "section", "old"),
            RawRecord::new("#other", "Home", "Other", "section", ""),
            RawRecord::new("#dup", "Home", "Second", "section", "new"),
        ]);

        check!(loaded.documents.len() == 2);
        check!(loaded.documents[0].location == "#other");
        check!(loaded.documents[1].title == "Second");
        check!(loaded.documents[1].id == DocId(1));
        check!(loaded.duplicate_count() == 1);
        check!(
            loaded.issues
                == [RecordIssue::DuplicateLocation {
                    location: "#dup".into(),
                    superseded: 0,
                    ordinal: 2,
                }]
        );
    }

    #[test]
    fn test_invalid_record_does_not_count_as_duplicate() {
        let loaded = load_corpus(vec![
            RawRecord::new("#x", "Home", "X", "section", ""),
            RawRecord::new("#x", "Home", "X", "bogus", ""),
        ]);
        check!(loaded.documents.len() == 1);
        check!(loaded.duplicate_count() == 0);
        check!(loaded.rejected_count() == 1);
    }

    #[test]
    fn test_from_value_treats_non_strings_as_missing() {
        let raw = RawRecord::from_value(&serde_json::json!({
            "location": "#a", "page": 3, "title": "T", "category": "page", "text": ""
        }));
        check!(raw.page.is_none());
        check!(RawRecord::from_value(&serde_json::json!(42)) == RawRecord::default());
    }
}
