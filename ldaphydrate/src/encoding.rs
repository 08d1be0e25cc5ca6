//! Re-encoding of string values into the character set a connection declares.

use std::fmt;
use std::str::FromStr;

use crate::errors::{HydrateError, HydrateResult};
use crate::value::{AttributeValue, Value};

/// Wire character encodings understood by [`WireEncoding::encode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireEncoding {
    Utf8,
    Latin1,
    Ascii,
    Utf16Le,
}

impl WireEncoding {
    /// Text values pass through for UTF-8 and become bytes otherwise. Non-text values are untouched.
    pub fn encode_value(self, value: Value) -> Value {
        let Value::Text(text) = value else {
            return value;
        };
        match self {
            WireEncoding::Utf8 => Value::Text(text),
            WireEncoding::Latin1 => Value::Binary(narrow(&text, 0xff)),
            WireEncoding::Ascii => Value::Binary(narrow(&text, 0x7f)),
            WireEncoding::Utf16Le => Value::Binary(text.encode_utf16().flat_map(u16::to_le_bytes).collect()),
        }
    }

    pub fn encode_values(self, values: Vec<Value>) -> Vec<Value> {
        values.into_iter().map(|value| self.encode_value(value)).collect()
    }

    /// Text form of a value previously produced by [`WireEncoding::encode_value`].
    pub fn decode_text(self, value: &Value) -> Option<String> {
        match value {
            Value::Text(text) => Some(text.clone()),
            Value::Binary(bytes) => match self {
                WireEncoding::Utf8 => String::from_utf8(bytes.clone()).ok(),
                WireEncoding::Latin1 | WireEncoding::Ascii => Some(bytes.iter().map(|b| char::from(*b)).collect()),
                WireEncoding::Utf16Le => {
                    let units: Vec<u16> = bytes
                        .chunks_exact(2)
                        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                        .collect();
                    String::from_utf16(&units).ok()
                }
            },
            Value::Null => None,
            other => Some(other.to_protocol_text().into_owned()),
        }
    }

    /// Encode keeping the scalar/list shape of `value`.
    pub fn encode(self, value: AttributeValue) -> AttributeValue {
        match value {
            AttributeValue::Single(v) => AttributeValue::Single(self.encode_value(v)),
            AttributeValue::Multi(values) => AttributeValue::Multi(self.encode_values(values)),
        }
    }
}

/// Single-byte encodings: code points above `max` become `?`.
fn narrow(text: &str, max: u32) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).ok().filter(|b| u32::from(*b) <= max).unwrap_or(b'?'))
        .collect()
}

impl FromStr for WireEncoding {
    type Err = HydrateError;

    fn from_str(name: &str) -> HydrateResult<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .map(|c| c.to_ascii_uppercase())
            .collect();
        match normalized.as_str() {
            "UTF8" => Ok(WireEncoding::Utf8),
            "ISO88591" | "LATIN1" => Ok(WireEncoding::Latin1),
            "ASCII" | "USASCII" => Ok(WireEncoding::Ascii),
            "UTF16LE" => Ok(WireEncoding::Utf16Le),
            _ => Err(HydrateError::configuration(format!("unsupported wire encoding '{name}'"))),
        }
    }
}

impl fmt::Display for WireEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WireEncoding::Utf8 => "UTF-8",
            WireEncoding::Latin1 => "ISO-8859-1",
            WireEncoding::Ascii => "US-ASCII",
            WireEncoding::Utf16Le => "UTF-16LE",
        })
    }
}
