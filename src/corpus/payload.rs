//! Parsing of the generator's search payload.
//!
//! The generator writes a script such as
//! `var documenterSearchIndex = {"docs": [ {...}, {...}, ]}`, which is JSON apart from
//! the assignment prefix, trailing commas and JavaScript-only string escapes.

use super::RawRecord;
use crate::error::SearchError;
use serde_json::Value;

/// Parses a payload into raw records.
///
/// Accepts the script form above, a bare `{"docs": [...]}` object, or a bare array.
/// Fails only when no array of records can be extracted; malformed elements are
/// passed through as records with missing fields and rejected during loading.
pub fn parse_payload(text: &str) -> Result<Vec<RawRecord>, SearchError> {
    let body = strip_assignment(text)?;
    let cleaned = normalize_script(body);

    let value: Value = serde_json::from_str(&cleaned)
        .map_err(|e| SearchError::InvalidCorpus(format!("payload is not valid JSON: {}", e)))?;

    let elements = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("docs") {
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(SearchError::InvalidCorpus(
                    "`docs` is not an array".to_string(),
                ));
            }
            None => {
                return Err(SearchError::InvalidCorpus(
                    "payload object has no `docs` array".to_string(),
                ));
            }
        },
        _ => {
            return Err(SearchError::InvalidCorpus(
                "payload is neither an array nor an object".to_string(),
            ));
        }
    };

    Ok(elements.iter().map(RawRecord::from_value).collect())
}

/// Drops a leading `var name =` (or any `... =`) and a trailing `;`.
fn strip_assignment(text: &str) -> Result<&str, SearchError> {
    let text = text.trim();
    let Some(start) = text.find(['{', '[']) else {
        return Err(SearchError::InvalidCorpus(
            "payload contains no JSON object or array".to_string(),
        ));
    };

    let prefix = text[..start].trim();
    if !prefix.is_empty() && !prefix.ends_with('=') {
        return Err(SearchError::InvalidCorpus(format!(
            "unexpected content before payload: '{}'",
            prefix
        )));
    }

    Ok(text[start..].trim_end().trim_end_matches(';').trim_end())
}

/// Rewrites the script body into strict JSON.
///
/// Commas that directly precede a closing `]` or `}` outside string literals are
/// removed. Inside strings, escapes JSON does not know are rewritten: `\v` becomes
/// `\u000b` and any other unknown escape (`\'`, `\(`, `\-`) becomes the bare character.
fn normalize_script(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut chars = text.char_indices();

    while let Some((i, c)) = chars.next() {
        if in_string {
            match c {
                '\\' => match chars.next() {
                    Some((_, escape @ ('"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' | 'u'))) => {
                        out.push('\\');
                        out.push(escape);
                    }
                    Some((_, 'v')) => out.push_str("\\u000b"),
                    Some((_, other)) => out.push(other),
                    None => out.push('\\'),
                },
                '"' => {
                    in_string = false;
                    out.push(c);
                }
                _ => out.push(c),
            }
            continue;
        }

        if c == '"' {
            in_string = true;
        } else if c == ',' && text[i + 1..].trim_start().starts_with([']', '}']) {
            continue;
        }
        out.push(c);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};
    use rstest::rstest;

    const SCRIPT: &str = r##"var documenterSearchIndex = {"docs": [

{
    "location": "#",
    "page": "Home",
    "title": "Home",
    "category": "page",
    "text": ""
},

{
    "location": "man/#Intro-1",
    "page": "Manual",
    "title": "Intro, ]",
    "category": "section",
    "text": "Quoted \"text\", }"
},

]}
"##;

    #[test]
    fn test_parses_generator_script() {
        let_assert!(Ok(records) = parse_payload(SCRIPT));
        check!(records.len() == 2);
        check!(records[0].location.as_deref() == Some("#"));
        check!(records[1].title.as_deref() == Some("Intro, ]"));
        check!(records[1].text.as_deref() == Some("Quoted \"text\", }"));
    }

    #[rstest]
    #[case(r##"[{"location": "#a"}]"##, 1)]
    #[case(r##"{"docs": [{"location": "#a"}, 7,]};"##, 2)]
    #[case("[]", 0)]
    fn test_accepted_shapes(#[case] input: &str, #[case] expected_len: usize) {
        let_assert!(Ok(records) = parse_payload(input));
        check!(records.len() == expected_len);
    }

    #[rstest]
    #[case::quote(r"julia> Dn*Dn\'", "julia> Dn*Dn'")]
    #[case::parens(r"f\(x\) \- g", "f(x) - g")]
    #[case::unknown_letter(r"\q", "q")]
    #[case::vertical_tab(r"a\vb", "a\u{b}b")]
    #[case::json_escapes(r#"\"q\" \\ \/ \n\u00e9"#, "\"q\" \\ / \n\u{e9}")]
    #[case::escaped_backslash(r"a\\", "a\\")]
    fn test_string_escapes(#[case] text: &str, #[case] expected: &str) {
        let payload = format!(r#"[{{"location": "x", "text": "{}"}}]"#, text);
        let_assert!(Ok(records) = parse_payload(&payload));
        check!(records[0].text.as_deref() == Some(expected));
    }

    #[test]
    fn test_escapes_do_not_end_strings() {
        let payload = r##"{"docs": [{"location": "#a", "text": "it\'s, ]"},]}"##;
        let_assert!(Ok(records) = parse_payload(payload));
        check!(records.len() == 1);
        check!(records[0].text.as_deref() == Some("it's, ]"));
    }

    #[rstest]
    #[case("")]
    #[case("not a payload")]
    #[case(r#"{"docs": 5}"#)]
    #[case(r#"{"pages": []}"#)]
    #[case(r#"console.log({"docs": []})"#)]
    #[case(r##"{"docs": [ {"location": "#a" ]}"##)]
    fn test_invalid_corpus(#[case] input: &str) {
        let_assert!(Err(SearchError::InvalidCorpus(_)) = parse_payload(input));
    }
}
