//! Caller-supplied header documents.
//!
//! Users type CONNECT and SEND headers as a small JSON object such as
//! `{"login":"guest","passcode":"guest"}`. The document is validated here,
//! once, at the API boundary; the rest of the crate only sees [`Headers`].

use serde_json::Value;

use super::frame::{Headers, header_violation};
use crate::utils::error::HeaderError;

/// Parse a header document. Blank input means "no headers".
///
/// Strings are taken verbatim, numbers and booleans are stringified.
/// `null`, arrays and nested objects are rejected, as are names and values
/// that could not be written on a STOMP header line.
pub fn parse_header_document(text: &str) -> Result<Headers, HeaderError> {
    if text.trim().is_empty() {
        return Ok(Headers::new());
    }

    let Value::Object(map) = serde_json::from_str::<Value>(text)? else {
        return Err(HeaderError::NotAnObject);
    };

    let mut headers = Headers::new();
    for (key, value) in map {
        let value = match value {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null | Value::Array(_) | Value::Object(_) => {
                return Err(HeaderError::UnsupportedValue { key });
            }
        };
        if let Some(reason) = header_violation(&key, &value) {
            return Err(HeaderError::Invalid { key, reason });
        }
        headers.insert(key, value);
    }
    Ok(headers)
}
