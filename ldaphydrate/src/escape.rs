//! Escaping for distinguished name components (RFC 4514) and search filter values (RFC 4515).

use std::fmt::Write;

use crate::value::Value;

/// Characters hex-escaped anywhere in an RDN value.
const DN_SPECIAL: &[char] = &['\\', ',', '+', '"', '<', '>', ';', '=', '#', '\'', '\0', '\r'];

/// Escape a value for use as the value half of a relative distinguished name.
///
/// Special characters are written as `\xx` hex pairs, leading and trailing spaces become `\20`.
/// A value that already consists solely of hex pairs (`\0a\1b`) is returned untouched so that
/// pre-escaped binary RDNs are not double escaped.
pub fn escape_dn_value(value: &str) -> String {
    if value.is_empty() || is_hex_escaped(value) {
        return value.to_string();
    }

    let chars: Vec<char> = value.chars().collect();
    let last = chars.len() - 1;
    let mut result = String::with_capacity(value.len() * 2);

    for (i, ch) in chars.iter().copied().enumerate() {
        match ch {
            ' ' if i == 0 || i == last => result.push_str("\\20"),
            c if DN_SPECIAL.contains(&c) => push_hex(&mut result, c),
            c => result.push(c),
        }
    }

    result
}

/// Escape special characters in a filter assertion value (RFC 4515).
pub fn escape_filter_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' | '*' | '(' | ')' | '\0' => push_hex(&mut result, ch),
            c => result.push(c),
        }
    }
    result
}

/// Escape a typed value for a filter. Binary values are escaped byte by byte.
pub fn escape_filter(value: &Value) -> String {
    match value {
        Value::Binary(bytes) => hex_escape_bytes(bytes),
        other => escape_filter_value(&other.to_protocol_text()),
    }
}

/// Write every byte as a `\xx` hex pair.
pub fn hex_escape_bytes(bytes: &[u8]) -> String {
    let mut result = String::with_capacity(bytes.len() * 3);
    for byte in bytes {
        let _ = write!(result, "\\{byte:02x}");
    }
    result
}

fn push_hex(out: &mut String, ch: char) {
    let mut buf = [0u8; 4];
    for byte in ch.encode_utf8(&mut buf).bytes() {
        let _ = write!(out, "\\{byte:02x}");
    }
}

fn is_hex_escaped(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() % 3 == 0
        && bytes
            .chunks(3)
            .all(|chunk| chunk[0] == b'\\' && chunk[1].is_ascii_hexdigit() && chunk[2].is_ascii_hexdigit())
}
