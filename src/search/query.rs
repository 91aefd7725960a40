//! Query string parsing.
//!
//! Syntax on top of plain keywords:
//! - `"inverse quaternion"`: phrase, tokens must be contiguous and in order within one field
//! - `quat*`: prefix, matches every indexed token starting with `quat`

use super::tokenize::{is_stop_word, terms, tokenize_keep_stop_words};

/// Abstract query produced from a raw query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ParsedQuery {
    /// Distinct tokens that must all occur (phrase tokens included)
    pub required: Vec<String>,
    /// Phrases of two or more tokens
    pub phrases: Vec<Vec<String>>,
    /// Distinct prefixes, each of which must match at least one token
    pub prefixes: Vec<String>,
}

impl ParsedQuery {
    /// Parses a raw query using the same normalizer as the index.
    ///
    /// Quoted segments are phrases; an unterminated quote runs to the end of the input.
    /// With `prefix_enabled` off, `*` is an ordinary separator.
    pub fn parse(input: &str, prefix_enabled: bool) -> Self {
        let mut query = Self::default();

        for (i, segment) in input.split('"').enumerate() {
            if i % 2 == 1 {
                query.add_phrase(terms(segment));
            } else {
                for word in segment.split_whitespace() {
                    query.add_word(word, prefix_enabled);
                }
            }
        }

        query
    }

    /// True when nothing searchable remains (e.g. empty or all stop words).
    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.prefixes.is_empty()
    }

    fn add_word(&mut self, word: &str, prefix_enabled: bool) {
        if prefix_enabled && let Some(stem) = word.strip_suffix('*') {
            let stem = stem.trim_end_matches('*');
            let mut fragments = tokenize_keep_stop_words(stem);
            // The prefix is the fragment touching the `*`; if that one was too short
            // to keep, there is no prefix at all.
            let prefix = fragments
                .last()
                .is_some_and(|last| last.end == stem.len())
                .then(|| fragments.pop())
                .flatten();
            for fragment in fragments {
                if !is_stop_word(&fragment.term) {
                    self.add_required(fragment.term);
                }
            }
            if let Some(prefix) = prefix
                && !self.prefixes.contains(&prefix.term)
            {
                self.prefixes.push(prefix.term);
            }
            return;
        }

        for term in terms(word) {
            self.add_required(term);
        }
    }

    fn add_phrase(&mut self, tokens: Vec<String>) {
        for token in &tokens {
            self.add_required(token.clone());
        }
        if tokens.len() > 1 && !self.phrases.contains(&tokens) {
            self.phrases.push(tokens);
        }
    }

    fn add_required(&mut self, term: String) {
        if !self.required.contains(&term) {
            self.required.push(term);
        }
    }
}
