//! Locating JSON inside free-text model answers.
//!
//! Grammar: a candidate is a balanced `{...}` (object) or `[...]` (array)
//! substring, where brackets inside JSON string literals do not count.
//! Candidates are tried left to right; the first one that deserializes into
//! the requested type wins. No candidate → [`ParseFailure`].

use crate::error::ParseFailure;
use serde::de::DeserializeOwned;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    Object,
    Array,
}

impl JsonShape {
    fn delimiters(self) -> (u8, u8) {
        match self {
            JsonShape::Object => (b'{', b'}'),
            JsonShape::Array => (b'[', b']'),
        }
    }

    fn name(self) -> &'static str {
        match self {
            JsonShape::Object => "object",
            JsonShape::Array => "array",
        }
    }
}

/// End index (exclusive) of the balanced value opening at `start`.
fn balanced_end(bytes: &[u8], start: usize, open: u8, close: u8) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            _ if b == open => depth += 1,
            _ if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Every balanced substring of the given shape, in order of its opening bracket.
pub fn candidates(text: &str, shape: JsonShape) -> Vec<&str> {
    let (open, close) = shape.delimiters();
    let bytes = text.as_bytes();
    bytes
        .iter()
        .enumerate()
        .filter(|&(_, &b)| b == open)
        .filter_map(|(start, _)| balanced_end(bytes, start, open, close).map(|end| &text[start..end]))
        .collect()
}

/// Deserialize the first candidate of `shape` that parses as `T`.
pub fn extract_json<T: DeserializeOwned>(text: &str, shape: JsonShape) -> Result<T, ParseFailure> {
    let found = candidates(text, shape);
    if found.is_empty() {
        return Err(ParseFailure {
            expected: shape.name(),
            reason: "no balanced substring found".to_string(),
        });
    }
    let mut last_error = String::new();
    for candidate in found {
        match serde_json::from_str::<T>(candidate) {
            Ok(value) => return Ok(value),
            Err(e) => last_error = e.to_string(),
        }
    }
    Err(ParseFailure {
        expected: shape.name(),
        reason: last_error,
    })
}
