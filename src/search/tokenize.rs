//! Text normalization and tokenization shared by indexing and query parsing.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Minimum token length (in characters) kept after normalization.
pub(crate) const MIN_TOKEN_LENGTH: usize = 2;

/// Common English stop words to filter out from indexing.
/// These high-frequency words add little value to search relevance.
pub(crate) const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it",
    "its", "of", "on", "or", "that", "the", "this", "to", "was", "will", "with",
];

/// A normalized token together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Case-folded, accent-folded text of the token
    pub term: String,
    /// Ordinal among the tokens kept for this field (stop words do not consume a position)
    pub position: u32,
    /// Byte offset of the first source character
    pub start: usize,
    /// Byte offset one past the last source character
    pub end: usize,
}

/// Tokenizes a field into normalized tokens, dropping short tokens and stop words.
///
/// Normalization lowercases, decomposes (NFKD) and strips combining marks so that
/// "Déjà" and "deja" produce the same token. Any character that is not alphanumeric
/// after folding is a boundary.
pub fn tokenize(text: &str) -> Vec<Token> {
    scan(text, false)
}

/// Same as [`tokenize`], but keeps stop words. Used for prefix fragments like `the*`,
/// where the fragment is a prefix of a longer word rather than a word on its own.
pub(crate) fn tokenize_keep_stop_words(text: &str) -> Vec<Token> {
    scan(text, true)
}

/// Convenience wrapper returning only the normalized terms.
pub fn terms(text: &str) -> Vec<String> {
    tokenize(text).into_iter().map(|t| t.term).collect()
}

/// Returns true if the (already normalized) term is a stop word.
pub(crate) fn is_stop_word(term: &str) -> bool {
    STOP_WORDS.contains(&term)
}

fn fold_char(c: char) -> impl Iterator<Item = char> {
    std::iter::once(c)
        .nfkd()
        .filter(|folded| !is_combining_mark(*folded))
        .flat_map(char::to_lowercase)
}

fn scan(text: &str, keep_stop_words: bool) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut start = 0;
    let mut end = 0;

    for (i, c) in text.char_indices() {
        for folded in fold_char(c) {
            if folded.is_alphanumeric() {
                if current.is_empty() {
                    start = i;
                }
                current.push(folded);
                end = i + c.len_utf8();
            } else {
                flush(&mut tokens, &mut current, start, end, keep_stop_words);
            }
        }
    }
    flush(&mut tokens, &mut current, start, end, keep_stop_words);

    tokens
}

fn flush(
    tokens: &mut Vec<Token>,
    current: &mut String,
    start: usize,
    end: usize,
    keep_stop_words: bool,
) {
    if current.is_empty() {
        return;
    }

    let term = std::mem::take(current);
    if term.chars().count() < MIN_TOKEN_LENGTH || (!keep_stop_words && is_stop_word(&term)) {
        return;
    }

    tokens.push(Token {
        term,
        position: tokens.len() as u32,
        start,
        end,
    });
}
