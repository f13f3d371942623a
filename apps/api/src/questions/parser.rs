//! Lenient JSON-array extraction for model output.
//!
//! Models asked for "only a JSON array" still wrap it in prose or code fences,
//! use typographic quotes, leave raw newlines inside strings, emit stray
//! backslashes and trailing commas. `extract_json_array` finds the array and,
//! if a direct parse fails, runs one string-aware repair pass before giving up.

use std::iter::Peekable;
use std::str::Chars;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

const NO_TEXT: &str = "No text provided";
const NO_ARRAY: &str = "No JSON array found";
const FAILED_AFTER_CLEANUP: &str = "JSON parse failed after cleanup";

/// A single generated interview question with its suggested answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub question: String,
    pub answer: String,
}

/// Why the model output could not be turned into an array.
/// Serialized as the `details` of the error response.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("{reason}")]
pub struct ParseFailure {
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleaned: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

impl ParseFailure {
    fn new(reason: &str, cleaned: Option<String>, parse_error: Option<String>) -> Self {
        Self {
            reason: reason.to_string(),
            cleaned,
            parse_error,
        }
    }
}

/// Extracts the outermost JSON array from free-form model text.
pub fn extract_json_array(text: &str) -> Result<Vec<Value>, ParseFailure> {
    if text.trim().is_empty() {
        return Err(ParseFailure::new(NO_TEXT, None, None));
    }

    let cleaned = strip_code_fences(text);

    let candidate = match (cleaned.find('['), cleaned.rfind(']')) {
        (Some(start), Some(end)) if start < end => &cleaned[start..=end],
        _ => return Err(ParseFailure::new(NO_ARRAY, Some(cleaned), None)),
    };

    if let Ok(values) = serde_json::from_str::<Vec<Value>>(candidate) {
        return Ok(values);
    }

    let repaired = repair_json(candidate);
    serde_json::from_str::<Vec<Value>>(&repaired)
        .map_err(|e| ParseFailure::new(FAILED_AFTER_CLEANUP, Some(repaired), Some(e.to_string())))
}

/// Keeps objects that carry a non-empty string `question`.
/// A missing or non-string `answer` becomes empty; anything else is dropped.
pub fn into_question_answers(values: Vec<Value>) -> Vec<QuestionAnswer> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| {
            let question = value
                .get("question")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|q| !q.is_empty());

            let Some(question) = question else {
                warn!("Skipping model item {index}: no question field");
                return None;
            };

            let answer = value
                .get("answer")
                .and_then(Value::as_str)
                .map(str::trim)
                .unwrap_or_default();

            Some(QuestionAnswer {
                question: question.to_string(),
                answer: answer.to_string(),
            })
        })
        .collect()
}

fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// True when the characters after a backslash form a valid JSON escape.
/// `\u` only counts when four hex digits follow it.
fn starts_valid_escape(rest: &Peekable<Chars<'_>>) -> bool {
    let mut ahead = rest.clone();
    match ahead.next() {
        Some('u') => (0..4).all(|_| ahead.next().is_some_and(|c| c.is_ascii_hexdigit())),
        Some(c) => matches!(c, '"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't'),
        None => false,
    }
}

fn is_smart_double_quote(c: char) -> bool {
    matches!(c, '\u{201C}' | '\u{201D}')
}

fn is_smart_single_quote(c: char) -> bool {
    matches!(c, '\u{2018}' | '\u{2019}')
}

/// Single pass over `candidate` tracking whether we are inside a string.
///
/// Inside strings: invalid escapes get their backslash doubled, raw line
/// breaks and tabs are escaped, quotes of the other style are escaped.
/// Outside strings: smart double quotes delimit strings and a comma directly
/// before `]` or `}` is dropped. Smart single quotes become `'` everywhere.
fn repair_json(candidate: &str) -> String {
    let mut out = String::with_capacity(candidate.len() + 32);
    let mut chars = candidate.chars().peekable();
    let mut in_string = false;
    let mut opened_smart = false;

    while let Some(c) = chars.next() {
        if in_string {
            match c {
                '\\' => match chars.peek().copied() {
                    Some(next) if starts_valid_escape(&chars) => {
                        out.push('\\');
                        out.push(next);
                        chars.next();
                    }
                    _ => out.push_str("\\\\"),
                },
                '"' if !opened_smart => {
                    in_string = false;
                    out.push('"');
                }
                c if is_smart_double_quote(c) && opened_smart => {
                    in_string = false;
                    out.push('"');
                }
                '"' => out.push_str("\\\""),
                c if is_smart_double_quote(c) => out.push_str("\\\""),
                c if is_smart_single_quote(c) => out.push('\''),
                '\r' => {
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    out.push_str("\\n");
                }
                '\n' => out.push_str("\\n"),
                '\t' => out.push_str("\\t"),
                c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
                c => out.push(c),
            }
        } else {
            match c {
                '"' => {
                    in_string = true;
                    opened_smart = false;
                    out.push('"');
                }
                c if is_smart_double_quote(c) => {
                    in_string = true;
                    opened_smart = true;
                    out.push('"');
                }
                c if is_smart_single_quote(c) => out.push('\''),
                ',' => {
                    let mut ahead = chars.clone();
                    while ahead.peek().is_some_and(|n| n.is_whitespace()) {
                        ahead.next();
                    }
                    if !matches!(ahead.peek(), Some(']') | Some('}')) {
                        out.push(',');
                    }
                }
                c => out.push(c),
            }
        }
    }

    out
}
