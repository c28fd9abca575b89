//! Locating a JSON object inside free-form model output

use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("No JSON object found in model output")]
    NoObject,

    #[error("Malformed JSON in model output: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Pull the first JSON object out of `text`.
///
/// The object starting at the first `{` is delimited by its balanced closing
/// brace, ignoring braces inside string literals. When that slice does not
/// parse, the widest slice from the first `{` to the last `}` is tried.
pub fn extract_json_object(text: &str) -> Result<Value, ExtractError> {
    let start = text.find('{').ok_or(ExtractError::NoObject)?;
    let last = text.rfind('}').ok_or(ExtractError::NoObject)?;
    if last < start {
        return Err(ExtractError::NoObject);
    }

    if let Some(end) = balanced_end(&text[start..]) {
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&text[start..start + end]) {
            return Ok(value);
        }
    }

    match serde_json::from_str::<Value>(&text[start..=last])? {
        value @ Value::Object(_) => Ok(value),
        _ => Err(ExtractError::NoObject),
    }
}

/// Byte length of the balanced `{...}` at the start of `s`
fn balanced_end(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }

    None
}
