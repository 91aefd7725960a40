//! Result assembly: maps ranked documents to presentable hits with snippets.

use regex::Regex;
use std::sync::LazyLock;

use super::SearchHit;
use super::index::IndexSnapshot;
use super::scoring::ScoredDoc;
use super::tokenize::tokenize;

const ELLIPSIS: &str = "…";

/// Runs of whitespace (including the blank-line padding generators leave behind).
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Converts ranked documents into hits, in rank order.
pub(crate) fn assemble(
    index: &IndexSnapshot,
    ranked: Vec<ScoredDoc<'_>>,
    snippet_chars: usize,
) -> Vec<SearchHit> {
    ranked
        .into_iter()
        .filter_map(|scored| {
            let doc = index.document(scored.doc)?;
            Some(SearchHit {
                location: doc.location.clone(),
                page: doc.page.clone(),
                title: doc.title.clone(),
                category: doc.category,
                score: scored.score,
                snippet: make_snippet(&doc.text, &scored.matched, snippet_chars),
            })
        })
        .collect()
}

/// Extracts a window of at most `max_chars` characters from `text`, centered on the
/// first token that is one of `matched`, or starting at the beginning when the body
/// has no match. Truncated ends are marked with an ellipsis and whitespace runs are
/// collapsed.
pub fn make_snippet(text: &str, matched: &[&str], max_chars: usize) -> String {
    if max_chars == 0 || text.is_empty() {
        return String::new();
    }

    let anchor = tokenize(text)
        .into_iter()
        .find(|token| matched.contains(&token.term.as_str()))
        .map_or(0, |token| token.start);

    let total_chars = text.chars().count();
    let (start, end) = if total_chars <= max_chars {
        (0, text.len())
    } else {
        let anchor_char = text[..anchor].chars().count();
        let first = anchor_char
            .saturating_sub(max_chars / 2)
            .min(total_chars - max_chars);
        let start = byte_offset(text, first);
        let end = byte_offset(text, first + max_chars);
        (start, end)
    };

    let window = WHITESPACE.replace_all(&text[start..end], " ");
    let window = window.trim();

    let mut snippet = String::with_capacity(window.len() + 2 * ELLIPSIS.len());
    if start > 0 {
        snippet.push_str(ELLIPSIS);
    }
    snippet.push_str(window);
    if end < text.len() {
        snippet.push_str(ELLIPSIS);
    }
    snippet
}

/// Byte offset of the `n`th character, or the end of the string.
fn byte_offset(text: &str, n: usize) -> usize {
    text.char_indices().nth(n).map_or(text.len(), |(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;

    #[test]
    fn test_short_text_returned_whole() {
        check!(make_snippet("compute inverse quaternion", &["inverse"], 160) == "compute inverse quaternion");
    }

    #[test]
    fn test_whitespace_collapsed() {
        check!(make_snippet("Print q.\n\n\n\n\n", &[], 160) == "Print q.");
        check!(make_snippet("a\n    b\tc", &[], 160) == "a b c");
    }

    #[test]
    fn test_empty_text_and_zero_window() {
        check!(make_snippet("", &["x"], 160).is_empty());
        check!(make_snippet("some text", &["text"], 0).is_empty());
    }

    #[test]
    fn test_window_centered_on_match() {
        let text = format!("{} needle {}", "lead ".repeat(40), "tail ".repeat(40));
        let snippet = make_snippet(&text, &["needle"], 40);
        check!(snippet.starts_with(ELLIPSIS));
        check!(snippet.ends_with(ELLIPSIS));
        check!(snippet.contains("needle"));
        check!(snippet.chars().count() <= 40 + 2);
    }

    #[test]
    fn test_no_body_match_starts_at_beginning() {
        let text = "first words ".repeat(30);
        let snippet = make_snippet(&text, &["absent"], 20);
        check!(snippet.starts_with("first words"));
        check!(snippet.ends_with(ELLIPSIS));
    }

    #[test]
    fn test_match_near_end_keeps_full_window() {
        let text = format!("{}closing", "x ".repeat(50));
        let snippet = make_snippet(&text, &["closing"], 30);
        check!(snippet.starts_with(ELLIPSIS));
        check!(snippet.ends_with("closing"));
    }

    #[test]
    fn test_multibyte_boundaries() {
        let text = format!("{}rotação final", "é ".repeat(100));
        let snippet = make_snippet(&text, &["rotacao"], 20);
        check!(snippet.starts_with(ELLIPSIS));
        check!(snippet.contains("é rotação"));
    }
}
