//! Extraction of a JSON value from noisy generated text.
//!
//! Candidate priority:
//! 1. the span from the first `{` to the last `}`
//! 2. the span from the first `[` to the last `]`
//! 3. a bare `true` / `false` / `null` token (any capitalisation, `None` included) outside
//!    quotes
//! 4. a bare number outside quotes
//! 5. a double-quoted string
//!
//! Before locating, markdown code fences (with or without a language tag) and control
//! characters other than tab, newline and carriage return are removed. Object and array
//! candidates are then repaired outside string literals: capitalised literals (`True`, `NULL`,
//! `None`) are lower-cased to JSON literals and trailing commas before `}` or `]` are dropped.
//!
//! The first candidate found is authoritative: if it still fails to parse, extraction fails
//! rather than falling back to a weaker candidate.

use crate::error::ExtractionError;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)```[a-z0-9_+\-]*").expect("fence regex"));

static BARE_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(true|false|null|none)\b").expect("literal regex"));

static BARE_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?").expect("number regex")
});

static QUOTED_STRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(?:[^"\\]|\\.)*""#).expect("string regex"));

/// Locate, repair and parse the JSON value embedded in `raw`.
///
/// # Errors
///
/// - [`ExtractionError::Empty`] for empty or whitespace-only input
/// - [`ExtractionError::NotFound`] when no candidate exists
/// - [`ExtractionError::Malformed`] when the located candidate does not parse after repair
pub fn extract_json_value(raw: &str) -> Result<Value, ExtractionError> {
    if raw.trim().is_empty() {
        return Err(ExtractionError::Empty);
    }

    let cleaned = strip_control_chars(raw);
    let cleaned = FENCE.replace_all(&cleaned, "");

    if let Some(span) = span_between(&cleaned, '{', '}') {
        return parse_structured(span, "object");
    }
    if let Some(span) = span_between(&cleaned, '[', ']') {
        return parse_structured(span, "array");
    }

    if let Some(found) = find_unquoted(&BARE_LITERAL, &cleaned) {
        return Ok(match found.as_str().to_ascii_lowercase().as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::Null,
        });
    }

    if let Some(found) = find_unquoted(&BARE_NUMBER, &cleaned) {
        return serde_json::from_str(found.as_str()).map_err(|e| ExtractionError::Malformed {
            kind: "number",
            message: e.to_string(),
        });
    }

    if let Some(found) = QUOTED_STRING.find(&cleaned) {
        return serde_json::from_str(found.as_str()).map_err(|e| ExtractionError::Malformed {
            kind: "string",
            message: e.to_string(),
        });
    }

    Err(ExtractionError::NotFound)
}

/// First match of `pattern` that does not overlap a double-quoted span.
fn find_unquoted<'t>(pattern: &Regex, text: &'t str) -> Option<regex::Match<'t>> {
    let quoted: Vec<_> = QUOTED_STRING.find_iter(text).map(|m| m.range()).collect();
    pattern
        .find_iter(text)
        .find(|m| !quoted.iter().any(|q| m.start() < q.end && q.start < m.end()))
}

fn strip_control_chars(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(*c as u32, 0x00..=0x08 | 0x0B..=0x0C | 0x0E..=0x1F))
        .collect()
}

/// Text from the first `open` to the last `close`, inclusive.
fn span_between(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

fn parse_structured(span: &str, kind: &'static str) -> Result<Value, ExtractionError> {
    let repaired = repair(span);
    serde_json::from_str(&repaired).map_err(|e| ExtractionError::Malformed {
        kind,
        message: e.to_string(),
    })
}

/// Rewrite non-JSON literals and drop trailing commas, leaving string literals untouched.
fn repair(candidate: &str) -> String {
    let chars: Vec<char> = candidate.chars().collect();
    let mut out = String::with_capacity(candidate.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
                i += 1;
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                match word.to_ascii_lowercase().as_str() {
                    "true" => out.push_str("true"),
                    "false" => out.push_str("false"),
                    "null" | "none" => out.push_str("null"),
                    _ => out.push_str(&word),
                }
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(c);
                }
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_fenced_object() {
        let raw = "Here is the extraction:\n```JSON\n{\"patient\": {\"first_name\": \"Jane\"}}\n```\nLet me know.";
        assert_eq!(
            extract_json_value(raw).unwrap(),
            json!({"patient": {"first_name": "Jane"}})
        );
    }

    #[test]
    fn extracts_unfenced_object_surrounded_by_prose() {
        let raw = "Sure! {\"a\": 1, \"b\": [1, 2]} Hope this helps.";
        assert_eq!(extract_json_value(raw).unwrap(), json!({"a": 1, "b": [1, 2]}));
    }

    #[test]
    fn rewrites_capitalised_literals_outside_strings() {
        let raw = r#"{"present": True, "deceased": FALSE, "unit": None, "note": "True story, None taken", "x": NULL}"#;
        assert_eq!(
            extract_json_value(raw).unwrap(),
            json!({"present": true, "deceased": false, "unit": null, "note": "True story, None taken", "x": null})
        );
    }

    #[test]
    fn drops_trailing_commas() {
        let raw = "{\"a\": [1, 2,\n], \"b\": {\"c\": \"x,]\",},\n}";
        assert_eq!(extract_json_value(raw).unwrap(), json!({"a": [1, 2], "b": {"c": "x,]"}}));
    }

    #[test]
    fn strips_control_characters() {
        let raw = "{\"a\":\u{0001} \"b\u{001F}\"}\u{0007}";
        assert_eq!(extract_json_value(raw).unwrap(), json!({"a": "b"}));
    }

    #[test]
    fn falls_back_to_array_then_scalars() {
        assert_eq!(extract_json_value("items: [1, 2, 3]").unwrap(), json!([1, 2, 3]));
        assert_eq!(extract_json_value("Answer: TRUE").unwrap(), json!(true));
        assert_eq!(extract_json_value("value is none").unwrap(), Value::Null);
        assert_eq!(extract_json_value("about -42.5 units").unwrap(), json!(-42.5));
        assert_eq!(extract_json_value("he said \"hi\"").unwrap(), json!("hi"));
    }

    #[test]
    fn scalar_tokens_inside_quotes_stay_strings() {
        assert_eq!(extract_json_value("he said \"None\"").unwrap(), json!("None"));
        assert_eq!(extract_json_value("code \"42\"").unwrap(), json!("42"));
        assert_eq!(extract_json_value("\"maybe\" then False").unwrap(), json!(false));
    }

    #[test]
    fn empty_input_is_an_error() {
        assert_eq!(extract_json_value(""), Err(ExtractionError::Empty));
        assert_eq!(extract_json_value("  \n\t"), Err(ExtractionError::Empty));
        assert_eq!(extract_json_value("nothing here"), Err(ExtractionError::NotFound));
    }

    #[test]
    fn first_candidate_is_authoritative() {
        let err = extract_json_value("{\"a\": } and later [1, 2]").expect_err("malformed object");
        assert!(matches!(err, ExtractionError::Malformed { kind: "object", .. }));
    }
}
