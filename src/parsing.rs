//! Decoding of completion-service responses.
//!
//! The service answers `{"response": "..."}`. After the JSON layer is
//! decoded, the answer text may still carry literal `\uXXXX` sequences,
//! which [`decode_unicode_escapes`] turns into real characters.

use crate::error::{Failure, Outcome};
use serde_json::Value;

/// Top-level field holding the answer.
pub const RESPONSE_FIELD: &str = "response";

/// Extract and unescape the answer from a raw response body.
///
/// # Example
///
/// ```
/// use message_relay::parsing::decode_response;
///
/// let answer = decode_response(r#"{"response": "Zap\\u0142acono"}"#).unwrap();
/// assert_eq!(answer, "Zapłacono");
/// ```
pub fn decode_response(raw: &str) -> Outcome<String> {
    let value: Value = serde_json::from_str(raw).map_err(|e| {
        Failure::io(format!("Failed to parse completion service response: {e}"))
    })?;

    let answer = match value.get(RESPONSE_FIELD) {
        None | Some(Value::Null) => {
            return Err(Failure::io(
                "Completion service response missing 'response' field",
            ))
        }
        Some(Value::String(s)) => s.clone(),
        // Numbers, booleans and nested values are passed on as JSON text.
        Some(other) => other.to_string(),
    };

    Ok(decode_unicode_escapes(&answer))
}

/// Replace literal `\uXXXX` sequences with the characters they name.
///
/// Exactly four hex digits are required; anything else leaves the
/// backslash in place and scanning resumes at the next character. A
/// surrogate pair written as two escapes becomes one character; a lone
/// surrogate becomes U+FFFD.
///
/// # Example
///
/// ```
/// use message_relay::parsing::decode_unicode_escapes;
///
/// assert_eq!(decode_unicode_escapes(r"\u0105"), "ą");
/// assert_eq!(decode_unicode_escapes(r"\u12"), r"\u12");
/// ```
pub fn decode_unicode_escapes(input: &str) -> String {
    if !input.contains("\\u") {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        let Some(unit) = escape_at(tail) else {
            out.push('\\');
            rest = &tail[1..];
            continue;
        };

        if is_high_surrogate(unit) {
            if let Some(low) = escape_at(&tail[6..]).filter(|u| is_low_surrogate(*u)) {
                out.push(combine_surrogates(unit, low));
                rest = &tail[12..];
                continue;
            }
        }

        out.push(char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER));
        rest = &tail[6..];
    }

    out.push_str(rest);
    out
}

/// The UTF-16 code unit of a `\uXXXX` escape at the start of `s`.
fn escape_at(s: &str) -> Option<u16> {
    let hex = s.strip_prefix("\\u")?.get(..4)?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u16::from_str_radix(hex, 16).ok()
}

fn is_high_surrogate(unit: u16) -> bool {
    (0xD800..=0xDBFF).contains(&unit)
}

fn is_low_surrogate(unit: u16) -> bool {
    (0xDC00..=0xDFFF).contains(&unit)
}

fn combine_surrogates(high: u16, low: u16) -> char {
    let code = 0x10000 + ((u32::from(high) - 0xD800) << 10) + (u32::from(low) - 0xDC00);
    char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
}
