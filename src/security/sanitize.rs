//! Markup stripping for inbound payloads.
//!
//! Best effort only: removes tags and the contents of script-like elements
//! from textual fields. It does not make arbitrary payloads safe to render.

use bytes::Bytes;
use serde_json::Value;

/// Elements whose contents are dropped along with the tags.
const RAW_TEXT_ELEMENTS: [&str; 4] = ["script", "style", "iframe", "noscript"];

/// Strip markup from a payload according to its content type.
///
/// JSON bodies have every string value stripped and are re-serialized;
/// `text/*` bodies are stripped as a whole. Anything else, including
/// JSON that fails to parse, is returned unchanged.
pub fn sanitize_body(content_type: Option<&str>, body: Bytes) -> Bytes {
    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|m| m.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if mime == "application/json" || mime.ends_with("+json") {
        let Ok(mut value) = serde_json::from_slice::<Value>(&body) else {
            return body;
        };
        if !strip_value(&mut value) {
            return body;
        }
        match serde_json::to_vec(&value) {
            Ok(encoded) => Bytes::from(encoded),
            Err(_) => body,
        }
    } else if mime.starts_with("text/") {
        match std::str::from_utf8(&body) {
            Ok(text) if text.contains('<') => Bytes::from(strip_markup(text)),
            _ => body,
        }
    } else {
        body
    }
}

/// Strip every string in a JSON value in place. Returns whether anything changed.
fn strip_value(value: &mut Value) -> bool {
    match value {
        Value::String(s) => {
            if !s.contains('<') {
                return false;
            }
            let stripped = strip_markup(s);
            let changed = stripped != *s;
            *s = stripped;
            changed
        }
        Value::Array(items) => items.iter_mut().fold(false, |acc, v| strip_value(v) | acc),
        Value::Object(map) => map.values_mut().fold(false, |acc, v| strip_value(v) | acc),
        _ => false,
    }
}

/// Remove tags from `input`, dropping the contents of script-like elements.
///
/// A `<` only opens a tag when followed by a letter, `/` or `!`, so text
/// such as `a < b` survives. An unterminated tag is kept as text.
pub fn strip_markup(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut copied_from = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'<' || !opens_tag(bytes.get(i + 1).copied()) {
            i += 1;
            continue;
        }
        let Some(close) = input[i..].find('>') else {
            break;
        };
        let tag_end = i + close + 1;
        out.push_str(&input[copied_from..i]);

        let name = tag_name(&input[i + 1..i + close]);
        let is_opening = !input[i + 1..].starts_with('/');
        let next = match RAW_TEXT_ELEMENTS
            .iter()
            .find(|el| is_opening && name.eq_ignore_ascii_case(el))
        {
            Some(el) => find_closing(input, tag_end, el).unwrap_or(bytes.len()),
            None => tag_end,
        };

        i = next;
        copied_from = next;
    }

    out.push_str(&input[copied_from..]);
    out
}

fn opens_tag(next: Option<u8>) -> bool {
    matches!(next, Some(b) if b.is_ascii_alphabetic() || b == b'/' || b == b'!')
}

fn tag_name(inner: &str) -> &str {
    let inner = inner.trim_start_matches('/');
    let end = inner
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(inner.len());
    &inner[..end]
}

/// Byte offset just past `</element ...>` at or after `from`.
fn find_closing(input: &str, from: usize, element: &str) -> Option<usize> {
    let haystack = input[from..].to_ascii_lowercase();
    let needle = format!("</{}", element);
    let start = haystack.find(&needle)?;
    let close = haystack[start..].find('>')?;
    Some(from + start + close + 1)
}
