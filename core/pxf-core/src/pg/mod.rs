//! Postgres text-format helpers: array literals, booleans and bytea.
//!
//! Array literals follow the engine's output rules: elements are separated by
//! `,`, and quoted when they are empty, contain braces, delimiters, quotes,
//! backslashes or whitespace, or spell `NULL`.

mod array_builder;

pub use array_builder::PgArrayBuilder;

use crate::error::{PxfError, PxfResult};

const ARRAY_DELIMITER: char = ',';

/// Split the outer-most array of `value` into its unescaped elements.
///
/// Nested arrays are returned as raw text (`{1,2}`); `NULL` elements become `None`.
pub fn split_array(value: &str) -> PxfResult<Vec<Option<String>>> {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() < 2 || chars[0] != '{' || chars[chars.len() - 1] != '}' {
        return Err(PxfError::runtime(format!(
            "array dimension mismatch, rawData: {}",
            value
        )));
    }
    if chars[1] == '}' {
        return Ok(Vec::new());
    }

    let mut positions = vec![0usize];
    let mut depth = 0usize;
    let mut in_quoted = false;
    for (i, c) in chars.iter().enumerate() {
        match *c {
            ARRAY_DELIMITER => {
                if depth == 1 && !in_quoted {
                    positions.push(i);
                }
            }
            '{' if !in_quoted => depth += 1,
            '}' if !in_quoted => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    positions.push(i);
                }
            }
            '"' if is_quote(&chars, i) => in_quoted = !in_quoted,
            _ => {}
        }
    }

    Ok(positions
        .windows(2)
        .map(|w| {
            let element: String = chars[w[0] + 1..w[1]].iter().collect();
            unescape_array_element(&element)
        })
        .collect())
}

/// Strip element quoting and backslash escapes; `NULL` is the null sentinel.
pub fn unescape_array_element(value: &str) -> Option<String> {
    if value == "NULL" {
        return None;
    }

    let inner = if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(escaped) => out.push(escaped),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    Some(out)
}

/// Escape a value as an array element, quoting it when required.
pub fn escape_array_element(value: Option<&str>) -> String {
    let value = match value {
        None => return "NULL".to_string(),
        // force quotes for literal NULL
        Some(v) if v.eq_ignore_ascii_case("NULL") => return format!("\"{}\"", v),
        Some("") => return "\"\"".to_string(),
        Some(v) => v,
    };

    let mut needs_quote = false;
    let mut escaped = String::with_capacity(value.len() * 2);
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                needs_quote = true;
                escaped.push('\\');
                escaped.push(c);
            }
            '{' | '}' | ARRAY_DELIMITER => {
                needs_quote = true;
                escaped.push(c);
            }
            _ => {
                if is_array_space(c) {
                    needs_quote = true;
                }
                escaped.push(c);
            }
        }
    }

    if needs_quote {
        format!("\"{}\"", escaped)
    } else {
        escaped
    }
}

/// Render bytes in bytea hex format, escaped for use inside an array.
pub fn encode_and_escape_bytea_hex(data: &[u8]) -> String {
    escape_array_element(Some(&format!("\\x{}", hex::encode(data))))
}

/// Parse a boolean in text format (`t` / `f`).
pub fn parse_bool_literal(value: &str) -> PxfResult<bool> {
    match value {
        "t" => Ok(true),
        "f" => Ok(false),
        _ => Err(PxfError::runtime(format!(
            "malformed boolean literal \"{}\"",
            value
        ))),
    }
}

/// Parse a bytea in either hex (`\x...`) or escape output format.
pub fn parse_bytea_literal(value: &str) -> PxfResult<Vec<u8>> {
    match value.strip_prefix("\\x") {
        Some(digits) => hex::decode(digits).map_err(|_| malformed_bytea(value)),
        None => parse_escape_format(value),
    }
}

fn parse_escape_format(value: &str) -> PxfResult<Vec<u8>> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] != b'\\' {
            out.push(bytes[index]);
            index += 1;
            continue;
        }
        match bytes.get(index + 1) {
            Some(b'\\') => {
                out.push(0x5C);
                index += 2;
            }
            // non-printable octet as three octal digits
            _ => {
                let octal = bytes
                    .get(index + 1..index + 4)
                    .and_then(|digits| std::str::from_utf8(digits).ok())
                    .and_then(|digits| u8::from_str_radix(digits, 8).ok())
                    .ok_or_else(|| malformed_bytea(value))?;
                out.push(octal);
                index += 4;
            }
        }
    }
    Ok(out)
}

fn malformed_bytea(value: &str) -> PxfError {
    PxfError::runtime(format!("malformed bytea literal \"{}\"", value))
}

fn is_array_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\u{0b}' | '\u{0c}')
}

/// A quote is live when preceded by an even number of backslashes.
fn is_quote(chars: &[char], index: usize) -> bool {
    let backslashes = chars[..index]
        .iter()
        .rev()
        .take_while(|c| **c == '\\')
        .count();
    backslashes % 2 == 0
}
